//! Flatten a shaped document into the six typed collections.
//!
//! All the substring sniffing on free-form `type` strings lives here; the
//! transformer downstream only ever dispatches on the typed model.

use crate::model::{Activity, Event, Flow, Gateway, Lane, NormalizedModel, Pool};
use serde_json::Value;
use std::collections::HashMap;

/// Endpoint info recovered from the `incoming`/`outgoing` arrays of the
/// surrounding elements.
#[derive(Debug, Default, Clone)]
struct Endpoints {
    source: Option<String>,
    target: Option<String>,
    source_name: String,
    target_name: String,
}

/// Normalize a validated document. `process_id` scopes every produced entity;
/// the caller resolves it (override, document field, or a fresh UUID).
pub fn normalize(doc: &Value, process_id: &str) -> NormalizedModel {
    let root = doc.get("result").filter(|r| r.is_object()).unwrap_or(doc);

    let flow_elements = array_of(root, "flowElements");
    let message_flows = array_of(root, "messageFlows");
    let pools_raw = array_of(root, "pools");
    let lanes_raw = array_of(root, "lanes");

    // Message-flow collection entries often omit `type`; tag them so they
    // survive classification.
    let elements: Vec<(&Value, bool)> = flow_elements
        .iter()
        .map(|el| (*el, false))
        .chain(message_flows.iter().map(|el| (*el, true)))
        .collect();

    let mut pool_name_by_id: HashMap<&str, &str> = HashMap::new();
    let mut pool_name_by_ref: HashMap<&str, &str> = HashMap::new();
    for pool in &pools_raw {
        let name = str_of(pool, "name").unwrap_or("");
        if let Some(id) = str_of(pool, "id") {
            pool_name_by_id.insert(id, name);
        }
        for key in ["processRef", "process_ref", "processId", "id"] {
            if let Some(r) = str_of(pool, key) {
                pool_name_by_ref.insert(r, name);
            }
        }
    }

    let mut lane_name_by_id: HashMap<&str, &str> = HashMap::new();
    for lane in &lanes_raw {
        if let Some(id) = str_of(lane, "id") {
            lane_name_by_id.insert(id, str_of(lane, "name").unwrap_or(""));
        }
    }

    let element_by_id: HashMap<&str, &Value> = elements
        .iter()
        .filter_map(|(el, _)| str_of(el, "id").map(|id| (id, *el)))
        .collect();

    let flow_map = map_flows_to_endpoints(&elements);

    let doc_process_ref = str_of(doc, "process_id").or_else(|| str_of(root, "process_id"));

    let resolve_pool_name = |pool_id: Option<&str>, el: &Value| -> String {
        let mut name = pool_id
            .and_then(|p| {
                pool_name_by_id
                    .get(p)
                    .or_else(|| pool_name_by_ref.get(p))
                    .copied()
            })
            .unwrap_or("");
        if name.is_empty() {
            let proc = str_of(el, "process_id")
                .or(doc_process_ref)
                .unwrap_or(process_id);
            name = pool_name_by_ref
                .get(proc)
                .or_else(|| pool_id.and_then(|p| pool_name_by_ref.get(p)))
                .copied()
                .unwrap_or("");
        }
        name.to_string()
    };

    let mut model = NormalizedModel {
        process_id: process_id.to_string(),
        ..Default::default()
    };

    for (el, from_message_collection) in &elements {
        let el = *el;
        let raw_type = str_of(el, "type").unwrap_or("").to_lowercase();
        let el_type = if raw_type.is_empty() && *from_message_collection {
            "messageflow".to_string()
        } else {
            raw_type
        };
        let sub_type = infer_sub_type(el, &el_type);

        let element_id = str_of(el, "id").unwrap_or("").to_string();
        let name = str_of(el, "name").unwrap_or("").to_string();

        let pool_id = pool_ref_of(el);
        let lane_id = lane_ref_of(el);
        let pool_name = resolve_pool_name(pool_id.as_deref(), el);
        let lane_name = lane_id
            .as_deref()
            .and_then(|l| lane_name_by_id.get(l))
            .copied()
            .unwrap_or("")
            .to_string();

        if el_type.contains("flow") {
            model.flows.push(normalize_flow(
                el,
                &el_type,
                &sub_type,
                element_id,
                name,
                &flow_map,
                &element_by_id,
                &pool_name_by_id,
                &pool_name_by_ref,
                &lane_name_by_id,
                (pool_name.as_str(), lane_name.as_str()),
                process_id,
            ));
        } else if el_type.contains("task") {
            model.activities.push(Activity {
                id: element_id,
                name,
                kind: el_type,
                pool_id,
                lane_id,
                pool_name,
                lane_name,
                process_id: process_id.to_string(),
            });
        } else if el_type.contains("gateway") {
            let gateway_type = if !sub_type.is_empty() {
                sub_type.clone()
            } else {
                str_of(el, "gateway_type").unwrap_or(&el_type).to_string()
            };
            model.gateways.push(Gateway {
                id: element_id,
                name,
                kind: el_type,
                gateway_type: gateway_type.to_lowercase(),
                pool_id,
                lane_id,
                pool_name,
                lane_name,
                process_id: process_id.to_string(),
            });
        } else if el_type.contains("event") {
            let event_type = if !sub_type.is_empty() {
                sub_type.clone()
            } else {
                el_type.clone()
            };
            model.events.push(Event {
                id: element_id,
                name,
                kind: el_type,
                event_type,
                pool_id,
                lane_id,
                pool_name,
                lane_name,
                process_id: process_id.to_string(),
            });
        }
    }

    model.pools = pools_raw
        .iter()
        .map(|p| Pool {
            id: str_of(p, "id").unwrap_or("").to_string(),
            name: str_of(p, "name").unwrap_or("").to_string(),
            kind: "Pool".to_string(),
            process_ref: str_of(p, "processRef")
                .or_else(|| str_of(p, "process_ref"))
                .unwrap_or("")
                .to_string(),
        })
        .collect();

    model.lanes = lanes_raw
        .iter()
        .map(|l| Lane {
            id: str_of(l, "id").unwrap_or("").to_string(),
            name: str_of(l, "name").unwrap_or("").to_string(),
            kind: "Lane".to_string(),
            pool_id: str_of(l, "pool_id").unwrap_or("").to_string(),
        })
        .collect();

    tracing::debug!(
        activities = model.activities.len(),
        events = model.events.len(),
        gateways = model.gateways.len(),
        flows = model.flows.len(),
        "normalized document"
    );

    model
}

// ─── Flow endpoint recovery ───────────────────────────────────

/// Scan every element's `incoming`/`outgoing` arrays: a flow's source is the
/// element whose `outgoing` lists the flow id, its target the element whose
/// `incoming` does. Message flows carry their endpoint ids in their own
/// `incoming`/`outgoing` lists instead.
fn map_flows_to_endpoints(elements: &[(&Value, bool)]) -> HashMap<String, Endpoints> {
    let mut map: HashMap<String, Endpoints> = HashMap::new();

    for (el, from_message_collection) in elements {
        let el_id = str_of(el, "id").unwrap_or("");
        let el_name = str_of(el, "name").unwrap_or("");
        let el_type = str_of(el, "type").unwrap_or("").to_lowercase();

        if el_type.contains("messageflow") || (el_type.is_empty() && *from_message_collection) {
            for src in ids_in(el, "incoming") {
                let entry = map.entry(el_id.to_string()).or_default();
                entry.source = Some(src.to_string());
                entry.source_name.clear();
            }
            for tgt in ids_in(el, "outgoing") {
                let entry = map.entry(el_id.to_string()).or_default();
                entry.target = Some(tgt.to_string());
                entry.target_name.clear();
            }
            continue;
        }

        for out_flow in ids_in(el, "outgoing") {
            let entry = map.entry(out_flow.to_string()).or_default();
            entry.source = Some(el_id.to_string());
            entry.source_name = el_name.to_string();
        }
        for in_flow in ids_in(el, "incoming") {
            let entry = map.entry(in_flow.to_string()).or_default();
            entry.target = Some(el_id.to_string());
            entry.target_name = el_name.to_string();
        }
    }

    map
}

#[allow(clippy::too_many_arguments)]
fn normalize_flow(
    el: &Value,
    el_type: &str,
    sub_type: &str,
    flow_id: String,
    name: String,
    flow_map: &HashMap<String, Endpoints>,
    element_by_id: &HashMap<&str, &Value>,
    pool_name_by_id: &HashMap<&str, &str>,
    pool_name_by_ref: &HashMap<&str, &str>,
    lane_name_by_id: &HashMap<&str, &str>,
    own_pool_lane: (&str, &str),
    process_id: &str,
) -> Flow {
    let recovered = flow_map.get(&flow_id).cloned().unwrap_or_default();

    // Explicit endpoints win; the recovered map fills the gaps.
    let source = str_of(el, "source").map(str::to_string).or(recovered.source);
    let target = str_of(el, "target").map(str::to_string).or(recovered.target);

    let source_el = source.as_deref().and_then(|s| element_by_id.get(s)).copied();
    let target_el = target.as_deref().and_then(|t| element_by_id.get(t)).copied();

    let source_name = if !recovered.source_name.is_empty() {
        recovered.source_name
    } else {
        source_el.and_then(|e| str_of(e, "name")).unwrap_or("").to_string()
    };
    let target_name = if !recovered.target_name.is_empty() {
        recovered.target_name
    } else {
        target_el.and_then(|e| str_of(e, "name")).unwrap_or("").to_string()
    };

    let source_pool = source_el.and_then(pool_ref_of);
    let target_pool = target_el.and_then(pool_ref_of);
    let source_lane = source_el.and_then(lane_ref_of);
    let target_lane = target_el.and_then(lane_ref_of);

    let endpoint_pool_name = |pool: Option<&str>, el: Option<&Value>| -> String {
        pool.and_then(|p| {
            pool_name_by_id
                .get(p)
                .or_else(|| pool_name_by_ref.get(p))
                .copied()
        })
        .or_else(|| {
            el.and_then(|e| str_of(e, "process_id"))
                .and_then(|p| pool_name_by_ref.get(p).copied())
        })
        .unwrap_or("")
        .to_string()
    };

    let source_pool_name = endpoint_pool_name(source_pool.as_deref(), source_el);
    let target_pool_name = endpoint_pool_name(target_pool.as_deref(), target_el);
    let source_lane_name = source_lane
        .as_deref()
        .and_then(|l| lane_name_by_id.get(l))
        .copied()
        .unwrap_or("")
        .to_string();
    let target_lane_name = target_lane
        .as_deref()
        .and_then(|l| lane_name_by_id.get(l))
        .copied()
        .unwrap_or("")
        .to_string();

    let flow_type = if el_type.contains("message") {
        "messageflow"
    } else {
        "sequenceflow"
    };

    let first_non_empty = |a: &str, b: &str, c: &str| -> String {
        if !a.is_empty() {
            a.to_string()
        } else if !b.is_empty() {
            b.to_string()
        } else {
            c.to_string()
        }
    };

    Flow {
        id: flow_id,
        name,
        kind: if sub_type.is_empty() {
            el_type.to_string()
        } else {
            sub_type.to_string()
        },
        flow_type: flow_type.to_string(),
        source,
        target,
        source_name,
        target_name,
        pool_name: first_non_empty(&source_pool_name, &target_pool_name, own_pool_lane.0),
        lane_name: first_non_empty(&source_lane_name, &target_lane_name, own_pool_lane.1),
        source_pool,
        source_lane,
        target_pool,
        target_lane,
        source_pool_name,
        source_lane_name,
        target_pool_name,
        target_lane_name,
        process_id: process_id.to_string(),
    }
}

// ─── Field helpers ────────────────────────────────────────────

fn array_of<'a>(root: &'a Value, key: &str) -> Vec<&'a Value> {
    root.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

fn str_of<'a>(el: &'a Value, key: &str) -> Option<&'a str> {
    el.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn ids_in<'a>(el: &'a Value, key: &str) -> Vec<&'a str> {
    el.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Empty strings and the literals `"none"`/`"null"` count as absent.
fn normalize_ref(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    let lowered = trimmed.to_lowercase();
    if trimmed.is_empty() || lowered == "none" || lowered == "null" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Probe order: `properties.pool_id`, `pool_id`, `process_id`, `processRef`.
fn pool_ref_of(el: &Value) -> Option<String> {
    let props = el.get("properties");
    normalize_ref(props.and_then(|p| p.get("pool_id")).and_then(Value::as_str))
        .or_else(|| normalize_ref(el.get("pool_id").and_then(Value::as_str)))
        .or_else(|| normalize_ref(el.get("process_id").and_then(Value::as_str)))
        .or_else(|| normalize_ref(el.get("processRef").and_then(Value::as_str)))
}

fn lane_ref_of(el: &Value) -> Option<String> {
    let props = el.get("properties");
    normalize_ref(props.and_then(|p| p.get("lane_id")).and_then(Value::as_str))
        .or_else(|| normalize_ref(el.get("lane_id").and_then(Value::as_str)))
}

/// Infer the sub-type when `subType` is absent. Explicit values are
/// lowercased as-is; inferred values use the canonical BPMN casing.
fn infer_sub_type(el: &Value, el_type: &str) -> String {
    let explicit = str_of(el, "subType").unwrap_or("").to_lowercase();
    if !explicit.is_empty() {
        return explicit;
    }
    if el_type.contains("startevent") {
        "startEvent"
    } else if el_type.contains("endevent") {
        "endEvent"
    } else if el_type.contains("intermediate") {
        "intermediateEvent"
    } else if el_type.contains("exclusivegateway") {
        "exclusiveGateway"
    } else if el_type.contains("parallelgateway") {
        "parallelGateway"
    } else if el_type.contains("inclusivegateway") {
        "inclusiveGateway"
    } else if el_type.contains("complexgateway") {
        "complexGateway"
    } else if el_type.contains("eventbasedgateway") || el.get("eventGatewayType").is_some() {
        "eventBasedGateway"
    } else {
        ""
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PID: &str = "proc-1";

    #[test]
    fn classifies_tasks_events_gateways_and_flows() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "s", "type": "startEvent"},
                    {"id": "t1", "type": "userTask", "name": "Review"},
                    {"id": "g", "type": "exclusiveGateway"},
                    {"id": "e", "type": "endEvent"},
                    {"id": "f1", "type": "sequenceFlow", "source": "s", "target": "t1"}
                ],
                "messageFlows": [], "pools": [], "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        assert_eq!(model.activities.len(), 1);
        assert_eq!(model.events.len(), 2);
        assert_eq!(model.gateways.len(), 1);
        assert_eq!(model.flows.len(), 1);
        assert_eq!(model.events[0].event_type, "startEvent");
        assert_eq!(model.gateways[0].gateway_type, "exclusivegateway");
        assert_eq!(model.flows[0].flow_type, "sequenceflow");
        assert_eq!(model.process_id, PID);
    }

    #[test]
    fn flow_endpoints_recovered_from_incoming_outgoing_lists() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "t1", "type": "userTask", "name": "A", "outgoing": ["f1"]},
                    {"id": "t2", "type": "userTask", "name": "B", "incoming": ["f1"]},
                    {"id": "f1", "type": "sequenceFlow"}
                ],
                "messageFlows": [], "pools": [], "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        let flow = &model.flows[0];
        assert_eq!(flow.source.as_deref(), Some("t1"));
        assert_eq!(flow.target.as_deref(), Some("t2"));
        assert_eq!(flow.source_name, "A");
        assert_eq!(flow.target_name, "B");
    }

    #[test]
    fn explicit_endpoints_beat_recovered_ones() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "t1", "type": "userTask", "outgoing": ["f1"]},
                    {"id": "t2", "type": "userTask"},
                    {"id": "t3", "type": "userTask"},
                    {"id": "f1", "type": "sequenceFlow", "source": "t3", "target": "t2"}
                ],
                "messageFlows": [], "pools": [], "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        assert_eq!(model.flows[0].source.as_deref(), Some("t3"));
    }

    #[test]
    fn pool_and_lane_names_resolved_through_lookup_maps() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "t1", "type": "userTask", "pool_id": "p1", "lane_id": "l1"},
                    {"id": "t2", "type": "userTask", "properties": {"pool_id": "p1"}},
                    {"id": "t3", "type": "userTask", "processRef": "proc_a"}
                ],
                "messageFlows": [],
                "pools": [{"id": "p1", "name": "Sales", "processRef": "proc_a"}],
                "lanes": [{"id": "l1", "name": "Clerk", "pool_id": "p1"}]
            }
        });
        let model = normalize(&doc, PID);
        assert_eq!(model.activities[0].pool_name, "Sales");
        assert_eq!(model.activities[0].lane_name, "Clerk");
        assert_eq!(model.activities[1].pool_name, "Sales");
        // processRef resolves through the by-ref map.
        assert_eq!(model.activities[2].pool_name, "Sales");
        assert_eq!(model.lanes[0].pool_id, "p1");
    }

    #[test]
    fn unresolvable_pool_degrades_to_empty_string() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "t1", "type": "userTask", "pool_id": "ghost"}
                ],
                "messageFlows": [], "pools": [], "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        assert_eq!(model.activities[0].pool_id.as_deref(), Some("ghost"));
        assert_eq!(model.activities[0].pool_name, "");
    }

    #[test]
    fn none_and_null_pool_ids_normalize_to_absent() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "t1", "type": "userTask", "pool_id": "none"},
                    {"id": "t2", "type": "userTask", "pool_id": "NULL"},
                    {"id": "t3", "type": "userTask", "pool_id": ""}
                ],
                "messageFlows": [], "pools": [], "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        for act in &model.activities {
            assert_eq!(act.pool_id, None, "id {}", act.id);
        }
    }

    #[test]
    fn flat_document_without_envelope_normalizes() {
        let doc = json!({
            "flowElements": [
                {"id": "t1", "type": "serviceTask"}
            ]
        });
        let model = normalize(&doc, PID);
        assert_eq!(model.activities.len(), 1);
    }

    #[test]
    fn message_collection_entries_become_message_flows() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "t1", "type": "userTask", "pool_id": "p1"},
                    {"id": "t2", "type": "userTask", "pool_id": "p2"}
                ],
                "messageFlows": [
                    {"id": "m1", "incoming": ["t1"], "outgoing": ["t2"]}
                ],
                "pools": [
                    {"id": "p1", "name": "One"},
                    {"id": "p2", "name": "Two"}
                ],
                "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        let flow = model.flows.iter().find(|f| f.id == "m1").unwrap();
        assert_eq!(flow.flow_type, "messageflow");
        assert_eq!(flow.source.as_deref(), Some("t1"));
        assert_eq!(flow.target.as_deref(), Some("t2"));
        assert_eq!(flow.source_pool_name, "One");
        assert_eq!(flow.target_pool_name, "Two");
    }

    #[test]
    fn event_gateway_type_key_forces_event_based_sub_type() {
        let doc = json!({
            "result": {
                "flowElements": [
                    {"id": "g", "type": "gateway", "eventGatewayType": "Exclusive"}
                ],
                "messageFlows": [], "pools": [], "lanes": []
            }
        });
        let model = normalize(&doc, PID);
        assert_eq!(model.gateways[0].gateway_type, "eventbasedgateway");
    }
}
