//! # Web Component Source Generator
//!
//! Build-time generator that augments C# component declarations with
//! generated members. The pipeline:
//!
//! 1. **Scan**: parse every syntax unit and keep the classes whose base chain
//!    reaches a capability marker (`CustomElementBase` or `WebComponentBase`).
//! 2. **Extract**: read the local-name override from the capability
//!    annotation and, for web components, the slot annotations on properties.
//!    Arguments are folded by a small constant evaluator; anything that does
//!    not fold is *unspecified* and falls back to a default.
//! 3. **Normalize**: recover the authored path of generated intermediates
//!    from their `#pragma checksum` first line.
//! 4. **Group**: merge partial fragments by `(namespace, name)`. Scalars are
//!    first-wins in discovery order; slots are the union.
//! 5. **Correlate**: pair each web component with its companion stylesheet.
//! 6. **Emit**: common members, slot members with a render routine, and a
//!    stylesheet override, each under a stable hint name.
//!
//! ## Invariants
//!
//! - Output is a pure function of the input units, texts and options.
//!   Sources come back sorted by hint name.
//! - Unresolvable metadata never fails a pass. The only errors are bad host
//!   input (JSON, options, directories) and cancellation.
//! - A [`Generator`] reused across passes re-renders only outputs whose
//!   inputs changed.

mod bridge;
mod cache;
mod constant;
mod discovery;
mod emit;
mod error;
mod extract;
mod group;
mod model;
mod options;
mod path;
mod pipeline;
mod resources;
mod semantic;
mod syntax;

#[cfg(test)]
mod pipeline_tests;

#[cfg(feature = "napi")]
pub use bridge::{discover_and_generate_native, generate_web_components_native};
pub use bridge::{discover_and_generate, generate_from_json};

pub use constant::Constant;
pub use discovery::{discover_project, ProjectInputs};
pub use error::{GeneratorError, Result};
pub use model::{
    AdditionalText, Capability, ContainingType, DeclarationFragment, DeclarationShape, EmitterKind, GeneratedSource,
    GroupedDeclaration, Identity, LocalNameConflict, ResourceAssociation, SlotFragment, SyntaxUnit, TypeKeyword,
};
pub use options::GeneratorOptions;
pub use path::original_path;
pub use pipeline::{generate, CancellationToken, DeclarationReport, GenerationOutput, GenerationReport, Generator};
