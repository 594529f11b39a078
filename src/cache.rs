//! Incremental cache
//!
//! In-memory memo tables keyed by sha256 content hashes. A generator instance
//! keeps one cache for its lifetime; nothing is persisted between builds.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::model::{DeclarationFragment, GeneratedSource};
use crate::syntax::CompilationUnitSyntax;

/// Hash of a syntax unit's `(path, text)`.
pub fn unit_hash(path: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash of the JSON form of a record.
pub fn record_hash<T: Serialize>(record: &T) -> Result<String> {
    let data = serde_json::to_vec(record)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

/// One memo table. Entries not marked live during a pass are dropped by
/// [`Memo::prune`].
#[derive(Debug)]
pub struct Memo<V> {
    entries: HashMap<String, V>,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> Memo<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.entries.insert(key, value);
    }

    pub fn prune(&mut self, live: &HashSet<String>) {
        self.entries.retain(|key, _| live.contains(key));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Default)]
pub struct IncrementalCache {
    options_hash: Option<String>,
    /// unit hash → parsed syntax
    pub parsed: Memo<Arc<CompilationUnitSyntax>>,
    /// unit hash + compilation shape → fragments found in the unit
    pub fragments: Memo<Vec<DeclarationFragment>>,
    /// emit record hash → generated source
    pub outputs: Memo<GeneratedSource>,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pass under `options_hash`. Everything cached under other
    /// options is discarded.
    pub fn begin_pass(&mut self, options_hash: &str) {
        if self.options_hash.as_deref() != Some(options_hash) {
            self.clear();
            self.options_hash = Some(options_hash.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.options_hash = None;
        self.parsed.clear();
        self.fragments.clear();
        self.outputs.clear();
    }

    pub fn fragment_key(unit_hash: &str, shape_hash: &str) -> String {
        format!("{}:{}", unit_hash, shape_hash)
    }
}
