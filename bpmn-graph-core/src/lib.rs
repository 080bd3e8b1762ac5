//! BPMN JSON → labeled-property-graph statement pipeline.
//!
//! Takes the loosely-typed JSON a BPMN parser front-end produces, repairs and
//! validates it, flattens it into typed collections, and emits a deterministic
//! sequence of Cypher `CREATE`/`MATCH` statements describing the process as a
//! property graph. Executing those statements against a graph store is the
//! caller's job; the pipeline itself performs no I/O apart from
//! [`transform::GraphTransformer::write_to_file`].
//!
//! Pipeline order: [`validators::schema`] → [`validators::semantic`] →
//! [`normalize`] → [`transform`]. The [`convert`] module bundles the whole run
//! behind one facade.

pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod transform;
pub mod validators;

pub use convert::{ConversionOutcome, ConvertConfig, GraphConverter};
pub use diagnostics::{Diagnostic, Severity};
pub use transform::transformer::GraphTransformer;
