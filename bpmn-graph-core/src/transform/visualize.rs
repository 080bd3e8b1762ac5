use serde_json::{json, Map, Value};
use std::collections::HashSet;

// ─── Read-side projection ─────────────────────────────────────

/// Fold graph-store query records into a `{nodes, edges}` document for
/// rendering. Records are objects of the shape `{"a": node, "r":
/// relationship, "b": node}`; nodes are deduplicated by id.
pub fn from_records(records: &[Value]) -> Value {
    let mut seen: HashSet<String> = HashSet::new();
    let mut nodes: Vec<Value> = Vec::new();
    let mut edges: Vec<Value> = Vec::new();

    for record in records {
        let Some(obj) = record.as_object() else {
            continue;
        };

        for key in ["a", "b"] {
            if let Some(node) = obj.get(key) {
                if let Some(projected) = project_node(node) {
                    let id = projected["id"].as_str().unwrap_or("").to_string();
                    if !id.is_empty() && seen.insert(id) {
                        nodes.push(projected);
                    }
                }
            }
        }

        if let Some(rel) = obj.get("r") {
            let source = obj.get("a").and_then(node_id);
            let target = obj.get("b").and_then(node_id);
            if let (Some(source), Some(target)) = (source, target) {
                edges.push(json!({
                    "source": source,
                    "target": target,
                    "type": rel.get("type").and_then(Value::as_str).unwrap_or(""),
                    "properties": rel.get("properties").cloned()
                        .unwrap_or(Value::Object(Map::new())),
                }));
            }
        }
    }

    json!({ "nodes": nodes, "edges": edges })
}

fn node_id(node: &Value) -> Option<String> {
    node.get("id")
        .or_else(|| node.get("properties").and_then(|p| p.get("id")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn project_node(node: &Value) -> Option<Value> {
    let id = node_id(node)?;
    let label = node
        .get("labels")
        .and_then(Value::as_array)
        .and_then(|l| l.first())
        .and_then(Value::as_str)
        .unwrap_or("");
    let properties = node
        .get("properties")
        .cloned()
        .unwrap_or_else(|| node.clone());
    Some(json!({ "id": id, "label": label, "properties": properties }))
}
