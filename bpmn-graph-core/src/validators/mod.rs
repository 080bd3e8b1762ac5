//! Structural and semantic validation of raw BPMN JSON documents.

pub mod schema;
pub mod semantic;

pub use schema::{validate_schema, SchemaNode};
pub use semantic::{validate_semantics, SemanticReport};
