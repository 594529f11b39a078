//! Generation pipeline
//!
//! parse → compilation → scan/extract → group (barrier) → correlate → emit.
//! Per-item stages run data-parallel on rayon and check the cancellation
//! token between items. Cache updates are applied only once a pass has
//! completed, so a cancelled pass leaves no trace.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tracing::{debug, info, info_span};

use crate::cache::{record_hash, IncrementalCache};
use crate::emit::{self, ALL_EMITTERS};
use crate::error::{GeneratorError, Result};
use crate::extract::scan_unit;
use crate::group::group;
use crate::model::{
    AdditionalText, DeclarationFragment, GeneratedSource, GroupedDeclaration, LocalNameConflict, ResourceAssociation,
    SyntaxUnit,
};
use crate::options::GeneratorOptions;
use crate::resources::{correlate, ResourceSnapshot};
use crate::semantic::{Compilation, ParsedUnit};

/// Cooperative cancellation shared between a host and a running pass.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    /// Checks that pass before the token cancels itself.
    #[cfg(test)]
    remaining_checks: Option<Arc<AtomicUsize>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn cancel_after(checks: usize) -> Self {
        Self {
            remaining_checks: Some(Arc::new(AtomicUsize::new(checks))),
            ..Self::default()
        }
    }

    #[cfg(test)]
    fn count_check(&self) {
        if let Some(remaining) = &self.remaining_checks {
            if remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_err()
            {
                self.cancel();
            }
        }
    }

    #[cfg(not(test))]
    fn count_check(&self) {}

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        self.count_check();
        if self.is_cancelled() {
            Err(GeneratorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationReport {
    pub declaration: GroupedDeclaration,
    pub association: Option<ResourceAssociation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub declarations: Vec<DeclarationReport>,
    pub conflicts: Vec<LocalNameConflict>,
    /// Hint names rendered in this pass.
    pub regenerated: Vec<String>,
    /// Hint names served from the cache.
    pub reused: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    /// Sorted by hint name.
    pub sources: Vec<GeneratedSource>,
    pub report: GenerationReport,
}

/// A generator instance for one host session. Reusing it across passes lets
/// unchanged inputs skip parsing, extraction and emission.
#[derive(Debug)]
pub struct Generator {
    options: GeneratorOptions,
    cache: IncrementalCache,
}

struct Emitted {
    key: String,
    source: GeneratedSource,
    reused: bool,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            cache: IncrementalCache::new(),
        })
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn run(
        &mut self,
        units: &[SyntaxUnit],
        texts: &[AdditionalText],
        cancel: &CancellationToken,
    ) -> Result<GenerationOutput> {
        let span = info_span!("generate", units = units.len(), texts = texts.len());
        let _enter = span.enter();

        let Generator { options, cache } = self;
        let options: &GeneratorOptions = options;
        cache.begin_pass(&record_hash(options)?);
        cancel.check()?;

        let parsed = parse_units(units, options, cache, cancel)?;

        let compilation = Compilation::new(&parsed, options);
        let shape = compilation.shape_hash();
        let extracted = extract_units(&parsed, &compilation, &shape, cache, cancel)?;

        // Barrier: grouping needs every fragment of the pass.
        let fragments: Vec<DeclarationFragment> = extracted
            .iter()
            .flat_map(|(_, fragments, _)| fragments.iter().cloned())
            .collect();
        cancel.check()?;
        let grouping = group(&fragments);
        debug!(
            fragments = fragments.len(),
            declarations = grouping.declarations.len(),
            "grouped declarations"
        );

        let snapshot = ResourceSnapshot::new(texts, options);
        debug!(resources = snapshot.len(), "collected resource snapshot");
        let associations: Vec<Option<ResourceAssociation>> = grouping
            .declarations
            .par_iter()
            .map(|declaration| -> Result<Option<ResourceAssociation>> {
                cancel.check()?;
                Ok(correlate(declaration, &snapshot, options))
            })
            .collect::<Result<_>>()?;

        let cached: &IncrementalCache = cache;
        let emitted: Vec<Emitted> = grouping
            .declarations
            .par_iter()
            .zip(&associations)
            .map(|(declaration, association)| -> Result<Vec<Emitted>> {
                cancel.check()?;
                emit_declaration(declaration, association.as_ref(), options, cached)
            })
            .collect::<Result<Vec<Vec<Emitted>>>>()?
            .into_iter()
            .flatten()
            .collect();
        cancel.check()?;

        // The pass is complete; commit cache entries and drop stale ones.
        let live_units: HashSet<String> = parsed.iter().map(|unit| unit.hash.clone()).collect();
        for unit in &parsed {
            cache.parsed.insert(unit.hash.clone(), unit.syntax.clone());
        }
        cache.parsed.prune(&live_units);

        let live_fragments: HashSet<String> = extracted.iter().map(|(key, _, _)| key.clone()).collect();
        for (key, fragments, reused) in extracted {
            if !reused {
                cache.fragments.insert(key, fragments);
            }
        }
        cache.fragments.prune(&live_fragments);

        let live_outputs: HashSet<String> = emitted.iter().map(|e| e.key.clone()).collect();
        let mut report = GenerationReport {
            conflicts: grouping.conflicts,
            ..GenerationReport::default()
        };
        let mut sources = Vec::with_capacity(emitted.len());
        for Emitted { key, source, reused } in emitted {
            if reused {
                report.reused.push(source.hint_name.clone());
            } else {
                report.regenerated.push(source.hint_name.clone());
                cache.outputs.insert(key, source.clone());
            }
            sources.push(source);
        }
        cache.outputs.prune(&live_outputs);

        sources.sort_by(|a, b| a.hint_name.cmp(&b.hint_name));
        report.regenerated.sort();
        report.reused.sort();
        report.declarations = grouping
            .declarations
            .into_iter()
            .zip(associations)
            .map(|(declaration, association)| DeclarationReport {
                declaration,
                association,
            })
            .collect();

        info!(
            declarations = report.declarations.len(),
            sources = sources.len(),
            regenerated = report.regenerated.len(),
            reused = report.reused.len(),
            conflicts = report.conflicts.len(),
            cached_outputs = cache.outputs.len(),
            "generation pass complete"
        );

        Ok(GenerationOutput { sources, report })
    }
}

/// One-shot generation without a long-lived cache.
pub fn generate(
    units: &[SyntaxUnit],
    texts: &[AdditionalText],
    options: GeneratorOptions,
) -> Result<GenerationOutput> {
    Generator::new(options)?.run(units, texts, &CancellationToken::new())
}

fn parse_units(
    units: &[SyntaxUnit],
    options: &GeneratorOptions,
    cache: &IncrementalCache,
    cancel: &CancellationToken,
) -> Result<Vec<ParsedUnit>> {
    units
        .par_iter()
        .map(|unit| -> Result<ParsedUnit> {
            cancel.check()?;
            Ok(ParsedUnit::parse(unit, options, &cache.parsed))
        })
        .collect()
}

/// `(cache key, fragments, reused)` per unit, in unit order.
fn extract_units(
    parsed: &[ParsedUnit],
    compilation: &Compilation<'_>,
    shape: &str,
    cache: &IncrementalCache,
    cancel: &CancellationToken,
) -> Result<Vec<(String, Vec<DeclarationFragment>, bool)>> {
    parsed
        .par_iter()
        .map(|unit| -> Result<(String, Vec<DeclarationFragment>, bool)> {
            cancel.check()?;
            let key = IncrementalCache::fragment_key(&unit.hash, shape);
            Ok(match cache.fragments.get(&key) {
                Some(fragments) => (key, fragments.clone(), true),
                None => (key, scan_unit(unit, compilation), false),
            })
        })
        .collect()
}

fn emit_declaration(
    declaration: &GroupedDeclaration,
    association: Option<&ResourceAssociation>,
    options: &GeneratorOptions,
    cache: &IncrementalCache,
) -> Result<Vec<Emitted>> {
    ALL_EMITTERS
        .iter()
        .filter_map(|kind| emit::record(*kind, declaration, association))
        .map(|record| -> Result<Emitted> {
            let key = record_hash(&record)?;
            Ok(match cache.outputs.get(&key) {
                Some(source) => Emitted {
                    key,
                    source: source.clone(),
                    reused: true,
                },
                None => Emitted {
                    key,
                    source: emit::render(&record, options),
                    reused: false,
                },
            })
        })
        .collect()
}
