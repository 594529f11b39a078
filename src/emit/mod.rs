//! Emitters
//!
//! Three pure transforms from a grouped declaration to generated source.
//! Each emitter first reduces its input to an [`EmitRecord`] holding exactly
//! the data its output depends on; the record doubles as the cache key.

pub mod common;
pub mod slots;
pub mod stylesheet;
mod writer;

use serde::Serialize;

use crate::model::{
    Capability, DeclarationShape, EmitterKind, GeneratedSource, GroupedDeclaration, Identity, ResourceAssociation,
    SlotFragment, TypeKeyword,
};
use crate::options::GeneratorOptions;

pub use writer::{identifier, optional_string_literal, string_literal, SourceWriter};

pub const ALL_EMITTERS: [EmitterKind; 3] = [EmitterKind::Common, EmitterKind::Slots, EmitterKind::Stylesheet];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitRecord<'a> {
    pub kind: EmitterKind,
    pub identity: &'a Identity,
    pub shape: &'a DeclarationShape,
    pub local_name: Option<&'a str>,
    pub slots: &'a [SlotFragment],
    pub stylesheet: Option<&'a str>,
}

impl EmitRecord<'_> {
    pub fn hint_name(&self) -> String {
        self.identity.hint_name(self.kind.suffix())
    }
}

/// Input of emitter `kind` for `declaration`, or `None` when that emitter
/// produces nothing for it.
pub fn record<'a>(
    kind: EmitterKind,
    declaration: &'a GroupedDeclaration,
    association: Option<&'a ResourceAssociation>,
) -> Option<EmitRecord<'a>> {
    let base = EmitRecord {
        kind,
        identity: &declaration.identity,
        shape: &declaration.shape,
        local_name: None,
        slots: &[],
        stylesheet: None,
    };
    let is_web_component = declaration.capability == Capability::WebComponent;

    match kind {
        EmitterKind::Common => Some(EmitRecord {
            local_name: declaration.local_name.as_deref(),
            ..base
        }),
        EmitterKind::Slots if is_web_component && !declaration.slots.is_empty() => Some(EmitRecord {
            slots: &declaration.slots,
            ..base
        }),
        EmitterKind::Stylesheet if is_web_component => {
            let stylesheet = association.and_then(|a| a.stylesheet.as_deref())?;
            Some(EmitRecord {
                stylesheet: Some(stylesheet),
                ..base
            })
        }
        _ => None,
    }
}

pub fn render(record: &EmitRecord<'_>, options: &GeneratorOptions) -> GeneratedSource {
    let text = match record.kind {
        EmitterKind::Common => common::emit(record, options),
        EmitterKind::Slots => slots::emit(record, options),
        EmitterKind::Stylesheet => stylesheet::emit(record),
    };
    GeneratedSource {
        hint_name: record.hint_name(),
        kind: record.kind,
        identity: record.identity.clone(),
        text,
    }
}

/// Every output of one declaration, in emitter order.
pub fn emit_declaration(
    declaration: &GroupedDeclaration,
    association: Option<&ResourceAssociation>,
    options: &GeneratorOptions,
) -> Vec<GeneratedSource> {
    ALL_EMITTERS
        .iter()
        .filter_map(|kind| record(*kind, declaration, association))
        .map(|record| render(&record, options))
        .collect()
}

/// Writes the shared prologue and reopens the declaration (and any
/// containing types) as partial. The caller fills the class body.
pub(crate) fn open_declaration(writer: &mut SourceWriter, record: &EmitRecord<'_>, base: Option<&str>) {
    writer.line("// <auto-generated/>");
    writer.line("#nullable enable");
    writer.blank();

    if !record.identity.namespace.is_empty() {
        writer.line(&format!("namespace {};", record.identity.namespace));
        writer.blank();
    }

    for outer in &record.shape.containing_types {
        writer.open(&partial_header(outer.keyword, &outer.name, &outer.type_parameters));
    }

    let shape = record.shape;
    let mut header = partial_header(shape.keyword, record.identity.simple_name(), &shape.type_parameters);
    if let Some(base) = base {
        header.push_str(" : ");
        header.push_str(base);
    }
    writer.open(&header);
}

/// `partial record Name<T>`
fn partial_header(keyword: TypeKeyword, name: &str, type_parameters: &[String]) -> String {
    let mut header = format!("partial {} {}", keyword.as_str(), identifier(name));
    if !type_parameters.is_empty() {
        let parameters: Vec<String> = type_parameters.iter().map(|p| identifier(p)).collect();
        header.push_str(&format!("<{}>", parameters.join(", ")));
    }
    header
}

/// `global::`-qualified form of a configured full name.
pub(crate) fn global(full_name: &str) -> String {
    format!("global::{}", full_name)
}
