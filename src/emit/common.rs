//! Common capability members, emitted for every grouped declaration.

use super::{global, open_declaration, optional_string_literal, EmitRecord, SourceWriter};
use crate::options::GeneratorOptions;

pub fn emit(record: &EmitRecord<'_>, options: &GeneratorOptions) -> String {
    let mut writer = SourceWriter::new();
    let interface = global(&options.custom_element_interface);
    open_declaration(&mut writer, record, Some(&interface));

    // Assigned by the runtime when the element is registered.
    writer.line("public static string? Identifier { get; set; }");
    writer.blank();
    writer.line(&format!(
        "public static string? LocalName => {};",
        optional_string_literal(record.local_name)
    ));

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclarationShape, EmitterKind, Identity};

    #[test]
    fn test_common_fragment() {
        let identity = Identity::new("App", "Toast");
        let record = EmitRecord {
            kind: EmitterKind::Common,
            identity: &identity,
            shape: &DeclarationShape::default(),
            local_name: Some("button"),
            slots: &[],
            stylesheet: None,
        };
        let expected = "\
// <auto-generated/>
#nullable enable

namespace App;

partial class Toast : global::Ostomachion.Blazor.WebComponents.ICustomElement
{
    public static string? Identifier { get; set; }

    public static string? LocalName => \"button\";
}
";
        assert_eq!(emit(&record, &GeneratorOptions::default()), expected);
    }

    #[test]
    fn test_missing_local_name_is_null() {
        let identity = Identity::new("App", "Toast");
        let record = EmitRecord {
            kind: EmitterKind::Common,
            identity: &identity,
            shape: &DeclarationShape::default(),
            local_name: None,
            slots: &[],
            stylesheet: None,
        };
        assert!(emit(&record, &GeneratorOptions::default()).contains("LocalName => null;"));
    }
}
