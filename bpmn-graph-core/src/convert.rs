use crate::diagnostics::Diagnostic;
use crate::ids::UuidIdSource;
use crate::transform::GraphTransformer;
use crate::validators::schema::SchemaNode;
use crate::validators::{validate_schema, validate_semantics};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

// ─── Conversion facade ────────────────────────────────────────

/// Options recognized by the converter. `batch_size` and `reset_db` are
/// passed through to whatever executes the statements downstream;
/// `external_model_id` tags the outcome for cross-system correlation.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub batch_size: usize,
    pub reset_db: bool,
    /// Abort on semantic errors instead of reporting them.
    pub strict: bool,
    pub process_id: Option<String>,
    pub external_model_id: Option<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            reset_db: true,
            strict: false,
            process_id: None,
            external_model_id: None,
        }
    }
}

/// Everything one conversion run produced.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub statements: Vec<String>,
    pub process_id: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub schema_diagnostics: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub external_model_id: Option<String>,
}

impl ConversionOutcome {
    /// Consecutive slices of at most `batch_size` statements.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[String]> + '_ {
        self.statements.chunks(batch_size.max(1))
    }
}

/// Runs the whole pipeline: schema validation (auto-fix on) → semantic
/// validation → graph transformation.
pub struct GraphConverter {
    config: ConvertConfig,
}

impl GraphConverter {
    pub fn new(config: ConvertConfig) -> Self {
        tracing::info!(
            batch_size = config.batch_size,
            reset_db = config.reset_db,
            strict = config.strict,
            external_model_id = config.external_model_id.as_deref().unwrap_or(""),
            "converter configured"
        );
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn convert(&self, mut doc: Value) -> Result<ConversionOutcome> {
        tracing::info!("validating structure");
        let schema = SchemaNode::bundled()?;
        let mut ids = UuidIdSource;
        let schema_diagnostics = validate_schema(&mut doc, &schema, true, &mut ids);

        tracing::info!("validating semantics");
        let report = validate_semantics(&doc, self.config.strict)?;

        tracing::info!("transforming to graph statements");
        let mut transformer = GraphTransformer::new(doc);
        if let Some(process_id) = &self.config.process_id {
            transformer = transformer.with_process_id(process_id);
        }
        transformer.transform()?;

        Ok(ConversionOutcome {
            statements: transformer.statements().to_vec(),
            process_id: transformer.process_id.clone(),
            node_count: transformer.node_count,
            edge_count: transformer.edge_count,
            schema_diagnostics,
            errors: report.errors,
            warnings: report.warnings,
            external_model_id: self.config.external_model_id.clone(),
        })
    }

    /// File-to-file variant: read a parsed-BPMN JSON document, optionally
    /// persist the statement stream one per line.
    pub fn convert_file(
        &self,
        input: impl AsRef<Path>,
        save_cypher_to: Option<&Path>,
    ) -> Result<ConversionOutcome> {
        let input = input.as_ref();
        tracing::info!(path = %input.display(), "loading document");
        let raw = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        let doc: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", input.display()))?;

        let outcome = self.convert(doc)?;

        if let Some(path) = save_cypher_to {
            tracing::info!(path = %path.display(), "saving statements");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let mut contents = String::new();
            for statement in &outcome.statements {
                contents.push_str(statement);
                contents.push('\n');
            }
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        Ok(outcome)
    }
}
