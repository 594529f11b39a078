//! Resource Correlator
//!
//! Pairs grouped web components with their companion stylesheet from an
//! immutable snapshot of the build's additional texts.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::model::{AdditionalText, Capability, GroupedDeclaration, ResourceAssociation};
use crate::options::GeneratorOptions;
use crate::path::{has_front_end_extension, stylesheet_path};

const SOURCE_STYLESHEET_SUFFIX: &str = ".cs.css";

/// Path-keyed stylesheet texts for one pass. Reading the same path twice
/// yields the same shared text.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    texts: BTreeMap<String, Arc<str>>,
}

impl ResourceSnapshot {
    /// Keeps texts with an accepted stylesheet suffix; the first text
    /// supplied for a path wins.
    pub fn new(texts: &[AdditionalText], options: &GeneratorOptions) -> Self {
        let mut snapshot = BTreeMap::new();
        for text in texts {
            if is_stylesheet(&text.path, options) {
                snapshot
                    .entry(text.path.clone())
                    .or_insert_with(|| Arc::from(text.text.as_str()));
            }
        }
        Self { texts: snapshot }
    }

    pub fn get(&self, path: &str) -> Option<&Arc<str>> {
        self.texts.get(path)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }
}

pub fn is_stylesheet(path: &str, options: &GeneratorOptions) -> bool {
    path.ends_with(&options.front_end_stylesheet_suffix()) || path.ends_with(SOURCE_STYLESHEET_SUFFIX)
}

/// Association for a web component; `None` for other capabilities.
///
/// Every fragment path proposes one stylesheet. Among the proposals present
/// in the snapshot, front-end stylesheets beat `.cs.css` ones, then the
/// earliest fragment wins.
pub fn correlate(
    declaration: &GroupedDeclaration,
    snapshot: &ResourceSnapshot,
    options: &GeneratorOptions,
) -> Option<ResourceAssociation> {
    if declaration.capability != Capability::WebComponent {
        return None;
    }

    let front_end_suffix = options.front_end_stylesheet_suffix();
    let mut candidates: Vec<String> = Vec::new();
    for path in &declaration.original_paths {
        let candidate = stylesheet_path(path, options);
        if snapshot.get(&candidate).is_some() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates.sort_by_key(|candidate| !candidate.ends_with(&front_end_suffix));

    if candidates.len() > 1 {
        debug!(
            declaration = %declaration.identity.full_name(),
            chosen = %candidates[0],
            candidates = candidates.len(),
            "several companion stylesheets found"
        );
    }

    let chosen = candidates.into_iter().next();
    let stylesheet = chosen
        .as_deref()
        .and_then(|path| snapshot.get(path))
        .map(|text| text.to_string());

    Some(ResourceAssociation {
        stylesheet_path: chosen,
        stylesheet,
        has_front_end_fragment: declaration
            .original_paths
            .iter()
            .any(|path| has_front_end_extension(path, options)),
    })
}
