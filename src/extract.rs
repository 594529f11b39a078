//! Declaration Scanner and Metadata Extractor
//!
//! Turns one parsed unit into the declaration fragments it contributes:
//! every class whose base chain reaches a marker, with its local-name
//! override and, for web components, its slot properties.

use tracing::debug;

use crate::constant::{evaluate, Constant};
use crate::model::{Capability, DeclarationFragment, Identity, SlotFragment};
use crate::semantic::{Compilation, ParsedUnit};
use crate::syntax::{AttributeSyntax, ClassSyntax, PropertySyntax};

const EXTENDS_ARGUMENT: &str = "Extends";
const SLOT_NAME_PARAMETER: &str = "slotName";
const ROOT_ELEMENT_ARGUMENT: &str = "RootElement";
const IS_TEMPLATED_ARGUMENT: &str = "IsTemplated";
const DEFAULT_TEXT_ARGUMENT: &str = "DefaultText";

/// Fragments declared in `unit`, in declaration order. Classes matching
/// neither marker are skipped.
pub fn scan_unit(unit: &ParsedUnit, compilation: &Compilation<'_>) -> Vec<DeclarationFragment> {
    unit.syntax
        .classes
        .iter()
        .filter_map(|class| scan_class(unit, class, compilation))
        .collect()
}

fn scan_class(
    unit: &ParsedUnit,
    class: &ClassSyntax,
    compilation: &Compilation<'_>,
) -> Option<DeclarationFragment> {
    let capability = compilation.classify(class);
    if capability == Capability::None {
        return None;
    }

    let identity = Identity::new(class.namespace.clone(), class.type_path());
    let local_name = extract_local_name(class, compilation);
    let slots = if capability == Capability::WebComponent {
        class
            .properties
            .iter()
            .filter_map(|property| extract_slot(class, property, compilation))
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        declaration = %identity.full_name(),
        ?capability,
        local_name = ?local_name,
        slots = slots.len(),
        path = %unit.path,
        "matched declaration"
    );

    Some(DeclarationFragment {
        identity,
        capability,
        shape: class.shape(),
        local_name,
        source_path: unit.path.clone(),
        original_path: unit.original_path.clone(),
        slots,
    })
}

fn find_attribute<'s>(
    attributes: &'s [AttributeSyntax],
    full_name: &str,
    class: &ClassSyntax,
    compilation: &Compilation<'_>,
) -> Option<&'s AttributeSyntax> {
    attributes
        .iter()
        .find(|attribute| compilation.resolve_attribute(&attribute.name, class).as_deref() == Some(full_name))
}

fn named_argument(attribute: &AttributeSyntax, class: &ClassSyntax, compilation: &Compilation<'_>, name: &str) -> Constant {
    attribute
        .arguments
        .iter()
        .find(|argument| argument.name_equals.as_deref() == Some(name))
        .map_or(Constant::Unspecified, |argument| {
            evaluate(&argument.expression, &compilation.constants_in(class))
        })
}

/// `Extends` on the capability annotation, when it folds to a string.
fn extract_local_name(class: &ClassSyntax, compilation: &Compilation<'_>) -> Option<String> {
    let attribute = find_attribute(
        &class.attributes,
        &compilation.options().custom_element_attribute,
        class,
        compilation,
    )?;
    named_argument(attribute, class, compilation, EXTENDS_ARGUMENT).into_string()
}

fn extract_slot(class: &ClassSyntax, property: &PropertySyntax, compilation: &Compilation<'_>) -> Option<SlotFragment> {
    let options = compilation.options();
    let attribute = find_attribute(&property.attributes, &options.slot_attribute, class, compilation)?;

    // First argument that is not a property assignment; a `name:` label
    // only counts when it names the slot parameter.
    let slot_name = attribute
        .arguments
        .iter()
        .find(|argument| argument.name_equals.is_none())
        .filter(|argument| argument.name_colon.as_deref().map_or(true, |label| label == SLOT_NAME_PARAMETER))
        .and_then(|argument| evaluate(&argument.expression, &compilation.constants_in(class)).into_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| property.name.clone());

    let root_element = named_argument(attribute, class, compilation, ROOT_ELEMENT_ARGUMENT)
        .into_string()
        .filter(|tag| !tag.is_empty());
    let is_templated = named_argument(attribute, class, compilation, IS_TEMPLATED_ARGUMENT)
        .as_bool()
        .unwrap_or(false);
    let default_text = named_argument(attribute, class, compilation, DEFAULT_TEXT_ARGUMENT).into_string();

    Some(SlotFragment {
        property_name: property.name.clone(),
        slot_name,
        root_element,
        is_templated,
        default_text,
        value_type: compilation.display_type(&property.type_text, class),
        is_render_fragment: compilation.is_type(&property.type_text, class, &options.render_fragment_type),
    })
}
