use crate::diagnostics::Diagnostic;
use crate::error::SchemaError;
use crate::ids::IdSource;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

// ─── Schema descriptor ────────────────────────────────────────

const BUNDLED_SCHEMA: &str = include_str!("bpmn_schema.json");

/// Recursive schema descriptor, a small subset of JSON Schema: `type`,
/// `properties`, `required`, `items`, `enum`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaNode {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Ordered so auto-filled defaults land deterministically.
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaNode>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, rename = "enum")]
    pub allowed: Option<Vec<Value>>,
}

impl SchemaNode {
    /// The schema descriptor shipped with the crate.
    pub fn bundled() -> Result<Self, SchemaError> {
        Self::from_json_str(BUNDLED_SCHEMA)
    }

    /// Parse a descriptor supplied by the caller.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(raw)?)
    }
}

// ─── Shape validation + repair ────────────────────────────────

const RESULT_COLLECTIONS: [&str; 4] = ["flowElements", "messageFlows", "pools", "lanes"];

/// Validate the raw document shape and, with `auto_fix`, repair it in place.
///
/// Guarantees on return (with `auto_fix`): `result.{flowElements,
/// messageFlows, pools, lanes}` all present as arrays, every flow element
/// carries a non-empty unique id. Defects are reported as diagnostics;
/// nothing here is fatal.
pub fn validate_schema(
    doc: &mut Value,
    schema: &SchemaNode,
    auto_fix: bool,
    ids: &mut dyn IdSource,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if !doc.is_object() {
        diags.push(Diagnostic::error(
            "SCHEMA-RESULT",
            "Document is not a JSON object",
        ));
        *doc = Value::Object(Map::new());
    }

    ensure_result_envelope(doc, &mut diags);

    if auto_fix {
        fix_missing_ids(doc, ids, &mut diags);
        fix_duplicate_ids(doc, &mut diags);
    } else {
        for dup in duplicate_ids(doc) {
            diags.push(
                Diagnostic::error("SCHEMA-ID-DUPLICATE", format!("Duplicate id '{dup}'"))
                    .on(dup.clone()),
            );
        }
    }

    if has_sequence_cycle(doc) {
        diags.push(Diagnostic::warning(
            "SCHEMA-CYCLE",
            "Circular reference detected in sequence flows",
        ));
    }

    let mut mismatches = Vec::new();
    check_node(doc, schema, "root", &mut mismatches);
    if !mismatches.is_empty() {
        if auto_fix {
            tracing::debug!(count = mismatches.len(), "repairing schema mismatches");
            fill_defaults(doc, schema, "root", ids, &mut diags);
            let mut remaining = Vec::new();
            check_node(doc, schema, "root", &mut remaining);
            for m in remaining {
                diags.push(Diagnostic::warning("SCHEMA-MISMATCH", m));
            }
        } else {
            for m in mismatches {
                diags.push(Diagnostic::warning("SCHEMA-MISMATCH", m));
            }
        }
    }

    diags
}

/// Make sure `result` exists and carries all four collections. A flat
/// document (collections at the top level) gets them lifted into the
/// envelope rather than shadowed by empty arrays.
fn ensure_result_envelope(doc: &mut Value, diags: &mut Vec<Diagnostic>) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };

    let mut result = match root.remove("result") {
        Some(Value::Object(map)) => map,
        _ => {
            diags.push(Diagnostic::error(
                "SCHEMA-RESULT",
                "The 'result' property is missing",
            ));
            Map::new()
        }
    };

    for key in RESULT_COLLECTIONS {
        if result.get(key).map(Value::is_array).unwrap_or(false) {
            continue;
        }
        // Flat shape: the collection lives at the top level.
        match root.get(key).filter(|v| v.is_array()).cloned() {
            Some(arr) => {
                result.insert(key.to_string(), arr);
            }
            None => {
                diags.push(Diagnostic::warning(
                    "SCHEMA-COLLECTION",
                    format!("The result key '{key}' is missing"),
                ));
                result.insert(key.to_string(), Value::Array(Vec::new()));
            }
        }
    }

    root.insert("result".to_string(), Value::Object(result));
}

fn flow_elements_mut(doc: &mut Value) -> Option<&mut Vec<Value>> {
    doc.get_mut("result")?.get_mut("flowElements")?.as_array_mut()
}

fn flow_elements(doc: &Value) -> &[Value] {
    doc.get("result")
        .and_then(|r| r.get("flowElements"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn fix_missing_ids(doc: &mut Value, ids: &mut dyn IdSource, diags: &mut Vec<Diagnostic>) {
    let Some(elements) = flow_elements_mut(doc) else {
        return;
    };
    for el in elements.iter_mut() {
        let missing = el
            .get("id")
            .and_then(Value::as_str)
            .map(str::is_empty)
            .unwrap_or(true);
        if missing {
            let new_id = format!("element_{}", ids.fresh_hex(6));
            diags.push(
                Diagnostic::warning("SCHEMA-ID-MISSING", format!("Assigned id '{new_id}'"))
                    .on(new_id.clone()),
            );
            if let Some(obj) = el.as_object_mut() {
                obj.insert("id".to_string(), Value::String(new_id));
            }
        }
    }
}

/// First occurrence keeps its id; later ones become `X_1`, `X_2`, …
fn fix_duplicate_ids(doc: &mut Value, diags: &mut Vec<Diagnostic>) {
    let Some(elements) = flow_elements_mut(doc) else {
        return;
    };
    let mut id_count: HashMap<String, u32> = HashMap::new();
    for el in elements.iter_mut() {
        let Some(id) = el.get("id").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        match id_count.get_mut(&id) {
            Some(count) => {
                *count += 1;
                let new_id = format!("{id}_{count}");
                diags.push(
                    Diagnostic::warning(
                        "SCHEMA-ID-DUPLICATE",
                        format!("Duplicate id '{id}' renamed to '{new_id}'"),
                    )
                    .on(id.clone()),
                );
                if let Some(obj) = el.as_object_mut() {
                    obj.insert("id".to_string(), Value::String(new_id));
                }
            }
            None => {
                id_count.insert(id, 0);
            }
        }
    }
}

fn duplicate_ids(doc: &Value) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for el in flow_elements(doc) {
        if let Some(id) = el.get("id").and_then(Value::as_str) {
            if !id.is_empty() && !seen.insert(id.to_string()) {
                dups.push(id.to_string());
            }
        }
    }
    dups
}

// ─── Cycle detection (sequence flows only) ────────────────────

/// Kahn's algorithm over the sequence-flow graph. Nodes left after draining
/// the zero-indegree queue form a cycle.
fn has_sequence_cycle(doc: &Value) -> bool {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    let mut nodes: HashSet<&str> = HashSet::new();

    for el in flow_elements(doc) {
        let kind = el
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        if kind != "sequenceflow" {
            continue;
        }
        let src = el.get("source").and_then(Value::as_str);
        let tgt = el.get("target").and_then(Value::as_str);
        if let (Some(src), Some(tgt)) = (src, tgt) {
            if src.is_empty() || tgt.is_empty() {
                continue;
            }
            graph.entry(src).or_default().push(tgt);
            *indegree.entry(tgt).or_insert(0) += 1;
            indegree.entry(src).or_insert(0);
            nodes.insert(src);
            nodes.insert(tgt);
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .copied()
        .filter(|n| indegree[n] == 0)
        .collect();
    let mut visited = 0usize;

    while let Some(current) = queue.pop_front() {
        visited += 1;
        if let Some(neighbors) = graph.get(current) {
            for &next in neighbors {
                if let Some(deg) = indegree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    visited != nodes.len()
}

// ─── Descriptor conformance ───────────────────────────────────

fn check_node(value: &Value, node: &SchemaNode, path: &str, out: &mut Vec<String>) {
    if let Some(kind) = node.kind.as_deref() {
        let matches = match kind {
            "object" => value.is_object(),
            "array" => value.is_array(),
            "string" => value.is_string(),
            "number" | "integer" => value.is_number(),
            "boolean" => value.is_boolean(),
            _ => true,
        };
        if !matches {
            out.push(format!("{path}: expected {kind}"));
            return;
        }
    }

    if let Some(allowed) = &node.allowed {
        if !allowed.contains(value) {
            out.push(format!("{path}: value not in enum"));
        }
    }

    if let Some(obj) = value.as_object() {
        for key in &node.required {
            if !obj.contains_key(key) {
                out.push(format!("{path}: missing required '{key}'"));
            }
        }
        for (key, child_schema) in &node.properties {
            if let Some(child) = obj.get(key) {
                check_node(child, child_schema, &format!("{path}.{key}"), out);
            }
        }
    } else if let (Some(arr), Some(item_schema)) = (value.as_array(), node.items.as_deref()) {
        for (idx, item) in arr.iter().enumerate() {
            check_node(item, item_schema, &format!("{path}[{idx}]"), out);
        }
    }
}

/// Recursively add missing `required` properties with typed defaults.
fn fill_defaults(
    value: &mut Value,
    node: &SchemaNode,
    path: &str,
    ids: &mut dyn IdSource,
    diags: &mut Vec<Diagnostic>,
) {
    if let Some(obj) = value.as_object_mut() {
        for key in &node.required {
            if !obj.contains_key(key) {
                let prop_schema = node.properties.get(key).cloned().unwrap_or_default();
                let default = default_value(key, &prop_schema, path, ids);
                diags.push(Diagnostic::warning(
                    "SCHEMA-FIXED",
                    format!("Auto-added missing '{key}' at {path}"),
                ));
                obj.insert(key.clone(), default);
            }
        }
        for (key, child_schema) in &node.properties {
            if let Some(child) = obj.get_mut(key) {
                fill_defaults(child, child_schema, &format!("{path}.{key}"), ids, diags);
            }
        }
    } else if let (Some(arr), Some(item_schema)) = (value.as_array_mut(), node.items.as_deref()) {
        for (idx, item) in arr.iter_mut().enumerate() {
            fill_defaults(item, item_schema, &format!("{path}[{idx}]"), ids, diags);
        }
    }
}

fn default_value(key: &str, schema: &SchemaNode, path: &str, ids: &mut dyn IdSource) -> Value {
    if let Some(allowed) = schema.allowed.as_ref().and_then(|a| a.first()) {
        return allowed.clone();
    }
    match schema.kind.as_deref() {
        Some("string") if key == "id" => {
            Value::String(format!("{}_{}", path.replace('.', "_"), ids.fresh_hex(6)))
        }
        Some("string") => Value::String(format!("default_{key}")),
        Some("array") => Value::Array(Vec::new()),
        Some("object") => Value::Object(Map::new()),
        _ => Value::Null,
    }
}
