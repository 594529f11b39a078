//! Host bridge
//!
//! JSON entry points for hosts that drive the generator out of process. The
//! `napi` feature exposes them to Node.

#[cfg(feature = "napi")]
use napi_derive::napi;
use std::path::Path;

use crate::discovery::discover_project;
use crate::error::Result;
use crate::model::{AdditionalText, SyntaxUnit};
use crate::options::GeneratorOptions;
use crate::pipeline::generate;

/// Empty or missing options text means defaults.
pub fn parse_options(options_json: Option<&str>) -> Result<GeneratorOptions> {
    match options_json.map(str::trim) {
        Some(json) if !json.is_empty() => GeneratorOptions::from_json(json),
        _ => Ok(GeneratorOptions::default()),
    }
}

/// Runs one pass over JSON arrays of `{ path, text }` and returns the
/// generation output as JSON.
pub fn generate_from_json(units_json: &str, texts_json: &str, options_json: Option<&str>) -> Result<String> {
    let options = parse_options(options_json)?;
    let units: Vec<SyntaxUnit> = serde_json::from_str(units_json)?;
    let texts: Vec<AdditionalText> = serde_json::from_str(texts_json)?;
    let output = generate(&units, &texts, options)?;
    Ok(serde_json::to_string(&output)?)
}

pub fn discover_and_generate(dir: &Path, options_json: Option<&str>) -> Result<String> {
    let options = parse_options(options_json)?;
    let inputs = discover_project(dir, &options)?;
    let output = generate(&inputs.units, &inputs.additional_texts, options)?;
    Ok(serde_json::to_string(&output)?)
}

#[cfg(feature = "napi")]
fn to_napi_error(error: crate::error::GeneratorError) -> napi::Error {
    napi::Error::from_reason(error.to_string())
}

#[cfg(feature = "napi")]
#[napi]
pub fn generate_web_components_native(
    units_json: String,
    texts_json: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    generate_from_json(&units_json, &texts_json, options_json.as_deref()).map_err(to_napi_error)
}

#[cfg(feature = "napi")]
#[napi]
pub fn discover_and_generate_native(dir: String, options_json: Option<String>) -> napi::Result<String> {
    discover_and_generate(Path::new(&dir), options_json.as_deref()).map_err(to_napi_error)
}
