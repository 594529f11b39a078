//! Discovery Module
//!
//! Walks a project directory and collects the generator's inputs: C# syntax
//! units (generated intermediates under `obj/` included) and companion
//! stylesheets. Build output under `bin/` is skipped.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::model::{AdditionalText, SyntaxUnit};
use crate::options::GeneratorOptions;
use crate::resources::is_stylesheet;

const SKIPPED_DIRECTORIES: [&str; 3] = ["bin", ".git", "node_modules"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInputs {
    pub units: Vec<SyntaxUnit>,
    pub additional_texts: Vec<AdditionalText>,
}

/// Collect inputs under `dir` in sorted path order. Unreadable files are
/// logged and skipped; a missing root directory is an error.
pub fn discover_project(dir: &Path, options: &GeneratorOptions) -> Result<ProjectInputs> {
    let mut inputs = ProjectInputs::default();

    for path in find_input_files(dir, options)? {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let path_str = path.to_string_lossy().to_string();
        if is_stylesheet(&path_str, options) {
            inputs.additional_texts.push(AdditionalText::new(path_str, text));
        } else {
            inputs.units.push(SyntaxUnit::new(path_str, text));
        }
    }

    debug!(
        dir = %dir.display(),
        units = inputs.units.len(),
        texts = inputs.additional_texts.len(),
        "discovered project inputs"
    );
    Ok(inputs)
}

fn find_input_files(dir: &Path, options: &GeneratorOptions) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_directory(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // The root itself must be walkable.
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.to_string_lossy();
        if name.ends_with(".cs") || is_stylesheet(&name, options) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_skipped_directory(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, text: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn relative(root: &Path, path: &str) -> String {
        Path::new(path)
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/")
    }

    #[test]
    fn test_discovers_units_and_stylesheets() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "Components/Toast.razor.cs", "class Toast {}");
        write(root, "Components/Toast.razor.css", ":host{}");
        write(root, "Components/Toast.razor", "<p>hi</p>");
        write(root, "Widget.cs", "class Widget {}");
        write(root, "Widget.cs.css", "p{}");
        write(root, "site.css", "body{}");
        write(root, "obj/Debug/Components/Toast.razor.g.cs", "#pragma checksum \"x\"");
        write(root, "bin/Debug/Generated.cs", "class Ignored {}");

        let inputs = discover_project(root, &GeneratorOptions::default()).unwrap();
        let units: Vec<String> = inputs.units.iter().map(|u| relative(root, &u.path)).collect();
        let texts: Vec<String> = inputs.additional_texts.iter().map(|t| relative(root, &t.path)).collect();

        assert_eq!(
            units,
            vec!["Components/Toast.razor.cs", "Widget.cs", "obj/Debug/Components/Toast.razor.g.cs"]
        );
        assert_eq!(texts, vec!["Components/Toast.razor.css", "Widget.cs.css"]);
        assert_eq!(inputs.units[1].text, "class Widget {}");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = discover_project(&missing, &GeneratorOptions::default()).unwrap_err();
        assert!(matches!(err, GeneratorError::Walk(_)));
    }
}
