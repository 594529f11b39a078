//! Records flowing between pipeline stages.
//!
//! All of them are plain values built fresh for one generation pass.

use serde::{Deserialize, Serialize};

use crate::syntax::qualify;

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE INPUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One compiled source unit supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxUnit {
    pub path: String,
    pub text: String,
}

impl SyntaxUnit {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A non-source file made available to the build (stylesheets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalText {
    pub path: String,
    pub text: String,
}

impl AdditionalText {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    None,
    CustomElement,
    WebComponent,
}

/// Identity of a logical declaration. `name` is dotted for nested types
/// (`Outer.Inner`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub namespace: String,
    pub name: String,
}

impl Identity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// Innermost type name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// `<namespace>.<name>.<suffix>`, namespace omitted when global.
    pub fn hint_name(&self, suffix: &str) -> String {
        format!("{}.{}", self.full_name(), suffix)
    }
}

/// Declaration keyword a type is reopened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKeyword {
    #[default]
    Class,
    Record,
}

impl TypeKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKeyword::Class => "class",
            TypeKeyword::Record => "record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainingType {
    pub keyword: TypeKeyword,
    pub name: String,
    pub type_parameters: Vec<String>,
}

/// Everything needed to reopen a declaration as partial: its own keyword and
/// type parameters, and each enclosing type outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationShape {
    pub keyword: TypeKeyword,
    pub type_parameters: Vec<String>,
    pub containing_types: Vec<ContainingType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFragment {
    pub property_name: String,
    /// Always usable: falls back to the property name.
    pub slot_name: String,
    pub root_element: Option<String>,
    pub is_templated: bool,
    pub default_text: Option<String>,
    /// Property type as it must be written in generated source.
    pub value_type: String,
    /// The property type is the non-generic renderable fragment.
    pub is_render_fragment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationFragment {
    pub identity: Identity,
    pub capability: Capability,
    pub shape: DeclarationShape,
    pub local_name: Option<String>,
    /// Path of the compiled unit the fragment was found in.
    pub source_path: String,
    /// Best-known authored path (recovered for generated intermediates).
    pub original_path: String,
    /// Empty unless `capability` is `WebComponent`.
    pub slots: Vec<SlotFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedDeclaration {
    pub identity: Identity,
    pub capability: Capability,
    pub shape: DeclarationShape,
    pub local_name: Option<String>,
    pub slots: Vec<SlotFragment>,
    /// Distinct original paths of all fragments, in discovery order.
    pub original_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAssociation {
    pub stylesheet_path: Option<String>,
    pub stylesheet: Option<String>,
    /// Some fragment was authored in a templating front-end file.
    pub has_front_end_fragment: bool,
}

/// Two fragments of one declaration named different local-name overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNameConflict {
    pub identity: Identity,
    pub kept: String,
    pub ignored: String,
    pub ignored_path: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmitterKind {
    Common,
    Slots,
    Stylesheet,
}

impl EmitterKind {
    pub fn suffix(self) -> &'static str {
        match self {
            EmitterKind::Common => "CustomElement.g.cs",
            EmitterKind::Slots => "Slots.g.cs",
            EmitterKind::Stylesheet => "Stylesheet.g.cs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSource {
    pub hint_name: String,
    pub kind: EmitterKind,
    pub identity: Identity,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_names() {
        let nested = Identity::new("App.Widgets", "Outer.Toast");
        assert_eq!(nested.full_name(), "App.Widgets.Outer.Toast");
        assert_eq!(nested.simple_name(), "Toast");
        assert_eq!(
            nested.hint_name(EmitterKind::Slots.suffix()),
            "App.Widgets.Outer.Toast.Slots.g.cs"
        );

        let global = Identity::new("", "Toast");
        assert_eq!(global.hint_name(EmitterKind::Common.suffix()), "Toast.CustomElement.g.cs");
    }
}
