//! Indented C# text builder and literal helpers shared by the emitters.

use lazy_static::lazy_static;
use std::collections::HashSet;
use std::fmt::Write;

const INDENT: &str = "    ";

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
        "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
        "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
        "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
        "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
        "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed",
        "short", "sizeof", "stackalloc", "static", "string", "struct", "switch", "this",
        "throw", "true", "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort",
        "using", "virtual", "void", "volatile", "while",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Default)]
pub struct SourceWriter {
    out: String,
    depth: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// `header` followed by an opening brace; indents what follows.
    pub fn open(&mut self, header: &str) {
        self.line(header);
        self.line("{");
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    pub fn finish(mut self) -> String {
        while self.depth > 0 {
            self.close();
        }
        self.out
    }
}

/// Quoted C# regular string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            // Line separators end a regular literal in C#.
            '\u{85}' | '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn optional_string_literal(value: Option<&str>) -> String {
    value.map_or_else(|| "null".to_string(), string_literal)
}

/// Identifier usable in source; keywords get the verbatim `@` prefix.
pub fn identifier(name: &str) -> String {
    if KEYWORDS.contains(name) {
        format!("@{}", name)
    } else {
        name.to_string()
    }
}
