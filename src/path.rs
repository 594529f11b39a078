//! Path Normalizer
//!
//! Recovers the authored path of a compiled unit and derives companion
//! resource paths from it. Paths are handled as text so Windows paths keep
//! working when the generator runs elsewhere.

use lazy_static::lazy_static;
use regex::Regex;

use crate::options::GeneratorOptions;

lazy_static! {
    /// First line of a front-end generated unit: `#pragma checksum "<path>" ...`
    static ref CHECKSUM_DIRECTIVE: Regex = Regex::new(r#"^#pragma checksum "([^"]*)""#).unwrap();
}

/// Last path segment, splitting on both separators.
pub fn file_name(path: &str) -> &str {
    path.rsplit(&['/', '\\'][..]).next().unwrap_or(path)
}

pub fn is_generated_intermediate(path: &str, options: &GeneratorOptions) -> bool {
    file_name(path).ends_with(&options.generated_intermediate_suffix)
}

/// Path named by the checksum directive on the first line, if present.
pub fn checksum_path(text: &str) -> Option<&str> {
    let first_line = text.trim_start_matches('\u{feff}').lines().next()?;
    CHECKSUM_DIRECTIVE
        .captures(first_line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Best-known authored path of a unit. Generated intermediates name their
/// source in a checksum directive; anything unexpected keeps the unit path.
pub fn original_path(path: &str, text: &str, options: &GeneratorOptions) -> String {
    if !is_generated_intermediate(path, options) {
        return path.to_string();
    }
    checksum_path(text).unwrap_or(path).to_string()
}

pub fn has_front_end_extension(path: &str, options: &GeneratorOptions) -> bool {
    file_name(path)
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == options.front_end_extension)
}

/// Companion stylesheet path: `X.razor.cs` → `X.razor.css`, else `<path>.css`.
pub fn stylesheet_path(path: &str, options: &GeneratorOptions) -> String {
    match path.strip_suffix(&options.code_behind_suffix()) {
        Some(stem) => format!("{}.{}.css", stem, options.front_end_extension),
        None => format!("{}.css", path),
    }
}
