//! Stylesheet override for web components with a companion stylesheet.

use super::{open_declaration, string_literal, EmitRecord, SourceWriter};

pub fn emit(record: &EmitRecord<'_>) -> String {
    let mut writer = SourceWriter::new();
    open_declaration(&mut writer, record, None);
    writer.line(&format!(
        "protected override string? Stylesheet => {};",
        string_literal(record.stylesheet.unwrap_or_default())
    ));
    writer.finish()
}
