//! Generator configuration.
//!
//! Every well-known name the pipeline matches against lives here so a host can
//! point the generator at a differently-namespaced runtime library.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{GeneratorError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    /// Full name of the base type marking a custom element.
    pub custom_element_base: String,
    /// Full name of the base type marking a web component (shadow DOM + slots).
    pub web_component_base: String,
    /// Full name of the class-level capability annotation.
    pub custom_element_attribute: String,
    /// Full name of the property-level slot annotation.
    pub slot_attribute: String,
    /// Interface the common fragment attaches to every matched declaration.
    pub custom_element_interface: String,
    /// Full name of the non-generic renderable fragment type.
    pub render_fragment_type: String,
    /// Full name of the parameter annotation put on generated template members.
    pub parameter_attribute: String,
    /// Full name of the render tree builder passed to the slot routine.
    pub render_tree_builder_type: String,
    /// Extension (without dot) of the templating front end's source files.
    pub front_end_extension: String,
    /// File-name suffix of units generated from front-end files.
    pub generated_intermediate_suffix: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            custom_element_base: "Ostomachion.Blazor.WebComponents.CustomElementBase".to_string(),
            web_component_base: "Ostomachion.Blazor.WebComponents.WebComponentBase".to_string(),
            custom_element_attribute: "Ostomachion.Blazor.WebComponents.CustomElementAttribute"
                .to_string(),
            slot_attribute: "Ostomachion.Blazor.WebComponents.SlotAttribute".to_string(),
            custom_element_interface: "Ostomachion.Blazor.WebComponents.ICustomElement"
                .to_string(),
            render_fragment_type: "Microsoft.AspNetCore.Components.RenderFragment".to_string(),
            parameter_attribute: "Microsoft.AspNetCore.Components.ParameterAttribute".to_string(),
            render_tree_builder_type: "Microsoft.AspNetCore.Components.Rendering.RenderTreeBuilder"
                .to_string(),
            front_end_extension: "razor".to_string(),
            generated_intermediate_suffix: ".razor.g.cs".to_string(),
        }
    }
}

impl GeneratorOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: GeneratorOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("customElementBase", &self.custom_element_base),
            ("webComponentBase", &self.web_component_base),
            ("customElementAttribute", &self.custom_element_attribute),
            ("slotAttribute", &self.slot_attribute),
            ("customElementInterface", &self.custom_element_interface),
            ("renderFragmentType", &self.render_fragment_type),
            ("parameterAttribute", &self.parameter_attribute),
            ("renderTreeBuilderType", &self.render_tree_builder_type),
            ("frontEndExtension", &self.front_end_extension),
            ("generatedIntermediateSuffix", &self.generated_intermediate_suffix),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(GeneratorError::InvalidOptions {
                    message: format!("`{}` must not be empty", key),
                });
            }
        }
        if self.front_end_extension.starts_with('.') {
            return Err(GeneratorError::InvalidOptions {
                message: "`frontEndExtension` must not start with a dot".to_string(),
            });
        }
        Ok(())
    }

    /// `.razor.css`: stylesheet next to a front-end file.
    pub fn front_end_stylesheet_suffix(&self) -> String {
        format!(".{}.css", self.front_end_extension)
    }

    /// `.razor.cs`: code-behind of a front-end file.
    pub fn code_behind_suffix(&self) -> String {
        format!(".{}.cs", self.front_end_extension)
    }

    /// Full names that resolve without being declared in the compilation.
    pub fn well_known_types(&self) -> [&str; 7] {
        [
            &self.custom_element_base,
            &self.web_component_base,
            &self.custom_element_attribute,
            &self.slot_attribute,
            &self.custom_element_interface,
            &self.render_fragment_type,
            &self.parameter_attribute,
        ]
    }
}
