use super::{edges, nodes, pool_lanes, visualize};
use crate::error::TransformError;
use crate::ids::{IdSource, UuidIdSource};
use crate::model::NormalizedModel;
use crate::normalize::normalize;
use serde_json::Value;
use std::path::Path;

// ─── Graph transformer ────────────────────────────────────────

/// Lifecycle of one transformation run. Terminal: a transformer is
/// single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Created,
    Normalized,
    NodesEmitted,
    InvisiblesSynthesized,
    EdgesEmitted,
    Done,
}

/// Drives normalization → node emission → edge emission and owns the
/// process-scoped accumulator for the duration of one [`transform`] call.
///
/// [`transform`]: GraphTransformer::transform
pub struct GraphTransformer {
    doc: Value,
    ids: Box<dyn IdSource>,
    process_id_override: Option<String>,
    stage: Stage,
    statements: Vec<String>,
    pub process_id: String,
    pub node_count: usize,
    pub edge_count: usize,
}

impl GraphTransformer {
    pub fn new(doc: Value) -> Self {
        Self::with_id_source(doc, Box::new(UuidIdSource))
    }

    /// Inject the id supplier; tests pass a deterministic one so the
    /// statement stream is reproducible.
    pub fn with_id_source(doc: Value, ids: Box<dyn IdSource>) -> Self {
        Self {
            doc,
            ids,
            process_id_override: None,
            stage: Stage::Created,
            statements: Vec::new(),
            process_id: String::new(),
            node_count: 0,
            edge_count: 0,
        }
    }

    /// Pin the process id instead of minting a fresh one.
    pub fn with_process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id_override = Some(process_id.into());
        self
    }

    /// Produce the ordered statement sequence: pools/lanes, activities and
    /// events, then the edge pass. Populates `process_id`, `node_count` and
    /// `edge_count`.
    pub fn transform(&mut self) -> Result<&[String], TransformError> {
        if self.stage != Stage::Created {
            return Err(TransformError::AlreadyTransformed);
        }

        let model = self.resolve_model()?;
        self.stage = Stage::Normalized;
        tracing::debug!(process_id = %self.process_id, "model resolved");

        let (pool_lane_statements, pool_lane_nodes) =
            pool_lanes::generate_pools_lanes(&model, &self.process_id);
        let node_statements = nodes::generate_nodes(&model, &self.process_id);
        self.node_count = pool_lane_nodes + model.activities.len() + model.events.len();
        self.statements.extend(pool_lane_statements);
        self.statements.extend(node_statements);
        self.stage = Stage::NodesEmitted;

        let pass = edges::generate_edges(&model, &self.process_id, self.ids.as_mut());
        self.stage = Stage::InvisiblesSynthesized;
        self.node_count += pass.invisible_tasks;
        self.edge_count = pass.edge_count;
        self.statements.extend(pass.statements);
        self.stage = Stage::EdgesEmitted;

        self.stage = Stage::Done;
        tracing::info!(
            nodes = self.node_count,
            edges = self.edge_count,
            statements = self.statements.len(),
            "transformation complete"
        );
        Ok(&self.statements)
    }

    /// Detect pre-structured input (top-level `activities`/`events`/`flows`)
    /// and deserialize it directly; otherwise run the normalizer. Also
    /// settles the process id for this run.
    fn resolve_model(&mut self) -> Result<NormalizedModel, TransformError> {
        let prestructured = ["activities", "events", "flows"]
            .iter()
            .all(|key| self.doc.get(key).is_some());

        if prestructured {
            let model: NormalizedModel = serde_json::from_value(self.doc.clone())?;
            self.process_id = self
                .process_id_override
                .clone()
                .or_else(|| doc_process_id(&self.doc))
                .or_else(|| {
                    (!model.process_id.is_empty()).then(|| model.process_id.clone())
                })
                .unwrap_or_else(|| self.ids.fresh_uuid());
            return Ok(model);
        }

        self.process_id = self
            .process_id_override
            .clone()
            .or_else(|| doc_process_id(&self.doc))
            .unwrap_or_else(|| self.ids.fresh_uuid());
        Ok(normalize(&self.doc, &self.process_id))
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Consecutive slices of at most `batch_size` statements, in order.
    pub fn batch_output(&self, batch_size: usize) -> impl Iterator<Item = &[String]> + '_ {
        self.statements.chunks(batch_size.max(1))
    }

    /// One statement per line, UTF-8, `\n` separators.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), TransformError> {
        let path = path.as_ref();
        let mut contents = String::new();
        for statement in &self.statements {
            contents.push_str(statement);
            contents.push('\n');
        }
        std::fs::write(path, contents).map_err(|source| TransformError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read-side projection of graph-store query records; see
    /// [`visualize::from_records`].
    pub fn visualize_graph_from_response(&self, records: &[Value]) -> Value {
        visualize::from_records(records)
    }
}

fn doc_process_id(doc: &Value) -> Option<String> {
    doc.get("process_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
