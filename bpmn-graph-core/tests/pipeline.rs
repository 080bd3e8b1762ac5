//! Integration tests: exercise the full pipeline the way callers do —
//! schema validation → semantic validation → transformation — and pin the
//! end-to-end scenarios plus the universal output invariants.

use bpmn_graph_core::ids::CountingIdSource;
use bpmn_graph_core::validators::schema::SchemaNode;
use bpmn_graph_core::validators::{validate_schema, validate_semantics};
use bpmn_graph_core::{ConvertConfig, GraphConverter, GraphTransformer};
use serde_json::{json, Value};

const PID: &str = "test-process";

fn transform(doc: Value) -> GraphTransformer {
    let mut t = GraphTransformer::with_id_source(doc, Box::new(CountingIdSource::new()))
        .with_process_id(PID);
    t.transform().unwrap();
    t
}

fn wrap(flow_elements: Value) -> Value {
    json!({
        "result": {
            "flowElements": flow_elements,
            "messageFlows": [],
            "pools": [],
            "lanes": []
        }
    })
}

/// (source, target, relationship) triples parsed from the emitted edges.
fn edges_of(t: &GraphTransformer) -> Vec<(String, String, String)> {
    t.statements()
        .iter()
        .filter(|s| s.starts_with("MATCH (a"))
        .map(|s| {
            let src = s.split("MATCH (a {id: '").nth(1).unwrap();
            let src = src.split('\'').next().unwrap();
            let tgt = s.split("MATCH (b {id: '").nth(1).unwrap();
            let tgt = tgt.split('\'').next().unwrap();
            let rel = s.split("CREATE (a)-[:").nth(1).unwrap();
            let rel = rel.split(' ').next().unwrap();
            (src.to_string(), tgt.to_string(), rel.to_string())
        })
        .collect()
}

/// Ids of every node `CREATE` in the output.
fn node_ids_of(t: &GraphTransformer) -> Vec<String> {
    t.statements()
        .iter()
        .filter(|s| s.starts_with("CREATE ("))
        .map(|s| {
            let id = s.split("id: '").nth(1).unwrap();
            id.split('\'').next().unwrap().to_string()
        })
        .collect()
}

// ─── End-to-end scenarios ─────────────────────────────────────

#[test]
fn s1_two_tasks_linked() {
    let t = transform(wrap(json!([
        {"id": "t1", "type": "userTask"},
        {"id": "t2", "type": "serviceTask"},
        {"id": "f1", "type": "sequenceFlow", "source": "t1", "target": "t2"}
    ])));

    let activities: Vec<_> = t
        .statements()
        .iter()
        .filter(|s| s.starts_with("CREATE (a:Activity"))
        .collect();
    assert_eq!(activities.len(), 2);

    let edges = edges_of(&t);
    assert_eq!(edges, vec![("t1".into(), "t2".into(), "SEQUENCE_FLOW".into())]);
    assert_eq!(t.node_count, 2);
    assert_eq!(t.edge_count, 1);
}

#[test]
fn s2_xor_split_labels_both_branches() {
    let t = transform(wrap(json!([
        {"id": "start", "type": "startEvent", "name": "go"},
        {"id": "gw", "type": "exclusiveGateway"},
        {"id": "a", "type": "userTask", "name": "Task A"},
        {"id": "b", "type": "userTask", "name": "Task B"},
        {"id": "f1", "type": "sequenceFlow", "source": "start", "target": "gw"},
        {"id": "f2", "type": "sequenceFlow", "source": "gw", "target": "a"},
        {"id": "f3", "type": "sequenceFlow", "source": "gw", "target": "b"}
    ])));

    let edges = edges_of(&t);
    assert_eq!(edges.len(), 2);
    for (src, _, rel) in &edges {
        assert_eq!(src, "start");
        assert_eq!(rel, "XOR_SPLIT");
    }
    let targets: Vec<&str> = edges.iter().map(|(_, tgt, _)| tgt.as_str()).collect();
    assert!(targets.contains(&"a") && targets.contains(&"b"));
}

#[test]
fn s3_gateway_chain_is_broken_by_one_invisible_task() {
    let t = transform(wrap(json!([
        {"id": "start", "type": "startEvent", "name": "go"},
        {"id": "xor", "type": "exclusiveGateway"},
        {"id": "and", "type": "parallelGateway"},
        {"id": "task", "type": "userTask", "name": "Work"},
        {"id": "end", "type": "endEvent", "name": "done"},
        {"id": "f1", "type": "sequenceFlow", "source": "start", "target": "xor"},
        {"id": "f2", "type": "sequenceFlow", "source": "xor", "target": "and"},
        {"id": "f3", "type": "sequenceFlow", "source": "and", "target": "task"},
        {"id": "f4", "type": "sequenceFlow", "source": "task", "target": "end"}
    ])));

    let invisible: Vec<String> = node_ids_of(&t)
        .into_iter()
        .filter(|id| id.starts_with("invisible_"))
        .collect();
    assert_eq!(invisible.len(), 1, "exactly one invisible task synthesized");
    let inv = &invisible[0];

    let edges = edges_of(&t);
    let pairs: Vec<(&str, &str)> = edges
        .iter()
        .map(|(a, b, _)| (a.as_str(), b.as_str()))
        .collect();
    assert!(pairs.contains(&("start", inv.as_str())));
    assert!(pairs.contains(&(inv.as_str(), "task")));
    assert!(pairs.contains(&("task", "end")));
    // No direct gateway→gateway edge, and no gateway id as an endpoint.
    for (a, b) in &pairs {
        assert!(*a != "xor" && *a != "and", "gateway endpoint emitted: {a}");
        assert!(*b != "xor" && *b != "and", "gateway endpoint emitted: {b}");
    }
    assert_eq!(edges.len(), 3);
}

#[test]
fn s4_message_flow_across_pools() {
    let doc = json!({
        "result": {
            "flowElements": [
                {"id": "send", "type": "userTask", "name": "Send", "pool_id": "p1"},
                {"id": "recv", "type": "userTask", "name": "Receive", "pool_id": "p2"}
            ],
            "messageFlows": [
                {"id": "m1", "source": "send", "target": "recv"}
            ],
            "pools": [
                {"id": "p1", "name": "Customer", "processRef": "proc_a"},
                {"id": "p2", "name": "Supplier", "processRef": "proc_b"}
            ],
            "lanes": []
        }
    });

    // No BPMN 0301 in the semantic pass.
    let report = validate_semantics(&doc, false).unwrap();
    assert!(
        !report.errors.iter().any(|d| d.code == "BPMN 0301"),
        "{:?}",
        report.errors
    );

    let t = transform(doc);
    let edges = edges_of(&t);
    assert_eq!(
        edges,
        vec![("send".into(), "recv".into(), "MESSAGE_FLOW".into())]
    );
}

#[test]
fn s5_duplicate_ids_repaired_and_flows_bind_to_the_first() {
    let mut doc = wrap(json!([
        {"id": "t", "type": "userTask", "name": "First"},
        {"id": "t", "type": "serviceTask", "name": "Second"},
        {"id": "u", "type": "userTask", "name": "Next"},
        {"id": "f1", "type": "sequenceFlow", "source": "t", "target": "u"}
    ]));
    let schema = SchemaNode::bundled().unwrap();
    let mut ids = CountingIdSource::new();
    let diags = validate_schema(&mut doc, &schema, true, &mut ids);
    assert!(diags.iter().any(|d| d.code == "SCHEMA-ID-DUPLICATE"));

    let t = transform(doc);
    let node_ids = node_ids_of(&t);
    assert!(node_ids.contains(&"t".to_string()));
    assert!(node_ids.contains(&"t_1".to_string()));

    let edges = edges_of(&t);
    assert!(edges.iter().any(|(a, b, _)| a == "t" && b == "u"));
    assert!(!edges.iter().any(|(a, _, _)| a == "t_1"));
}

#[test]
fn s6_orphan_node_warned_but_still_emitted() {
    let doc = wrap(json!([
        {"id": "lonely", "type": "userTask", "name": "Orphan"}
    ]));
    let report = validate_semantics(&doc, false).unwrap();
    assert!(report.warnings.iter().any(|d| d.code == "Style 01107"));

    let t = transform(doc);
    assert!(node_ids_of(&t).contains(&"lonely".to_string()));
    assert_eq!(t.node_count, 1);
    assert_eq!(t.edge_count, 0);
}

// ─── Universal invariants ─────────────────────────────────────

#[test]
fn emitted_edges_connect_real_nodes_and_never_repeat() {
    let t = transform(wrap(json!([
        {"id": "start", "type": "startEvent", "name": "go"},
        {"id": "xor", "type": "exclusiveGateway"},
        {"id": "and", "type": "parallelGateway"},
        {"id": "a", "type": "userTask", "name": "A"},
        {"id": "b", "type": "userTask", "name": "B"},
        {"id": "end", "type": "endEvent", "name": "done"},
        {"id": "f1", "type": "sequenceFlow", "source": "start", "target": "xor"},
        {"id": "f2", "type": "sequenceFlow", "source": "xor", "target": "and"},
        {"id": "f3", "type": "sequenceFlow", "source": "and", "target": "a"},
        {"id": "f4", "type": "sequenceFlow", "source": "and", "target": "b"},
        {"id": "f5", "type": "sequenceFlow", "source": "a", "target": "end"},
        {"id": "f6", "type": "sequenceFlow", "source": "b", "target": "end"}
    ])));

    let real: Vec<String> = node_ids_of(&t);
    let edges = edges_of(&t);
    let mut seen = std::collections::HashSet::new();
    for (src, tgt, _) in &edges {
        assert!(real.contains(src), "non-real source {src}");
        assert!(real.contains(tgt), "non-real target {tgt}");
        assert!(
            seen.insert((src.clone(), tgt.clone())),
            "duplicate edge {src}->{tgt}"
        );
    }
}

#[test]
fn node_count_matches_node_create_statements() {
    let t = transform(json!({
        "result": {
            "flowElements": [
                {"id": "start", "type": "startEvent", "name": "go"},
                {"id": "g1", "type": "exclusiveGateway"},
                {"id": "g2", "type": "parallelGateway"},
                {"id": "task", "type": "userTask", "name": "Work"},
                {"id": "f1", "type": "sequenceFlow", "source": "start", "target": "g1"},
                {"id": "f2", "type": "sequenceFlow", "source": "g1", "target": "g2"},
                {"id": "f3", "type": "sequenceFlow", "source": "g2", "target": "task"}
            ],
            "messageFlows": [],
            "pools": [{"id": "p1", "name": "Main", "processRef": "proc_a"}],
            "lanes": [{"id": "l1", "name": "Lane", "pool_id": "p1"}]
        }
    }));

    let node_creates = t
        .statements()
        .iter()
        .filter(|s| {
            s.starts_with("CREATE (:Pool")
                || s.starts_with("CREATE (:Lane")
                || s.starts_with("CREATE (a:Activity")
                || s.starts_with("CREATE (e:Event")
        })
        .count();
    assert_eq!(t.node_count, node_creates);
}

#[test]
fn transformation_is_deterministic_under_a_fixed_id_source() {
    let doc = wrap(json!([
        {"id": "start", "type": "startEvent", "name": "go"},
        {"id": "xor", "type": "exclusiveGateway"},
        {"id": "and", "type": "parallelGateway"},
        {"id": "task", "type": "userTask", "name": "Work"},
        {"id": "f1", "type": "sequenceFlow", "source": "start", "target": "xor"},
        {"id": "f2", "type": "sequenceFlow", "source": "xor", "target": "and"},
        {"id": "f3", "type": "sequenceFlow", "source": "and", "target": "task"}
    ]));

    let t1 = transform(doc.clone());
    let t2 = transform(doc);
    assert_eq!(t1.statements(), t2.statements());
    assert_eq!(t1.node_count, t2.node_count);
    assert_eq!(t1.edge_count, t2.edge_count);
}

#[test]
fn batch_output_concatenation_equals_transform_output() {
    let t = transform(wrap(json!([
        {"id": "t1", "type": "userTask", "name": "A"},
        {"id": "t2", "type": "serviceTask", "name": "B"},
        {"id": "t3", "type": "manualTask", "name": "C"},
        {"id": "f1", "type": "sequenceFlow", "source": "t1", "target": "t2"},
        {"id": "f2", "type": "sequenceFlow", "source": "t2", "target": "t3"}
    ])));

    let rejoined: Vec<String> = t.batch_output(3).flatten().cloned().collect();
    assert_eq!(rejoined.as_slice(), t.statements());
}

// ─── Boundary cases ───────────────────────────────────────────

#[test]
fn empty_document_produces_nothing() {
    let t = transform(json!({}));
    assert!(t.statements().is_empty());
    assert_eq!(t.node_count, 0);
    assert_eq!(t.edge_count, 0);
}

#[test]
fn pools_and_lanes_only_skip_the_edge_pass() {
    let t = transform(json!({
        "result": {
            "flowElements": [],
            "messageFlows": [],
            "pools": [{"id": "p1", "name": "Main", "processRef": "proc_a"}],
            "lanes": [{"id": "l1", "name": "Lane", "pool_id": "p1"}]
        }
    }));
    assert_eq!(t.statements().len(), 3); // pool, lane, BELONGS_TO
    assert_eq!(t.node_count, 2);
    assert_eq!(t.edge_count, 0);
}

#[test]
fn sequence_flow_cycle_warns_but_transformation_completes() {
    let mut doc = wrap(json!([
        {"id": "a", "type": "userTask", "name": "A"},
        {"id": "b", "type": "userTask", "name": "B"},
        {"id": "c", "type": "userTask", "name": "C"},
        {"id": "f1", "type": "sequenceFlow", "source": "a", "target": "b"},
        {"id": "f2", "type": "sequenceFlow", "source": "b", "target": "c"},
        {"id": "f3", "type": "sequenceFlow", "source": "c", "target": "a"}
    ]));
    let schema = SchemaNode::bundled().unwrap();
    let mut ids = CountingIdSource::new();
    let diags = validate_schema(&mut doc, &schema, true, &mut ids);
    assert!(diags.iter().any(|d| d.code == "SCHEMA-CYCLE"));

    let t = transform(doc);
    assert_eq!(t.edge_count, 3);
}

#[test]
fn two_start_events_in_one_scope_raise_style_01106() {
    let doc = wrap(json!([
        {"id": "s1", "type": "startEvent", "name": "a", "pool_id": "p1"},
        {"id": "s2", "type": "startEvent", "name": "b", "pool_id": "p1"},
        {"id": "t", "type": "userTask", "name": "Work"},
        {"id": "e", "type": "endEvent", "name": "done"},
        {"id": "f1", "type": "sequenceFlow", "source": "s1", "target": "t"},
        {"id": "f2", "type": "sequenceFlow", "source": "s2", "target": "t"},
        {"id": "f3", "type": "sequenceFlow", "source": "t", "target": "e"}
    ]));
    let report = validate_semantics(&doc, false).unwrap();
    assert!(report.warnings.iter().any(|d| d.code == "Style 01106"));
}

// ─── Round-trip ───────────────────────────────────────────────

#[test]
fn prestructured_input_round_trips_through_the_model() {
    let doc = json!({
        "activities": [
            {"id": "t1", "name": "A", "type": "usertask", "process_id": "pre-1"},
            {"id": "t2", "name": "B", "type": "servicetask", "process_id": "pre-1"}
        ],
        "events": [],
        "gateways": [],
        "flows": [
            {"id": "f1", "type": "sequenceflow", "flow_type": "sequenceflow",
             "source": "t1", "target": "t2", "process_id": "pre-1"}
        ],
        "pools": [],
        "lanes": [],
        "process_id": "pre-1"
    });

    let model: bpmn_graph_core::model::NormalizedModel =
        serde_json::from_value(doc.clone()).unwrap();
    let round_tripped: bpmn_graph_core::model::NormalizedModel =
        serde_json::from_value(serde_json::to_value(&model).unwrap()).unwrap();
    assert_eq!(model, round_tripped);

    let mut t = GraphTransformer::with_id_source(doc, Box::new(CountingIdSource::new()));
    t.transform().unwrap();
    assert_eq!(t.process_id, "pre-1");
    assert_eq!(t.node_count, 2);
    assert_eq!(t.edge_count, 1);
}

// ─── Facade ───────────────────────────────────────────────────

#[test]
fn converter_facade_reports_diagnostics_and_counts() {
    let converter = GraphConverter::new(ConvertConfig::default());
    let outcome = converter
        .convert(json!({
            "flowElements": [
                {"id": "t1", "type": "userTask"},
                {"id": "t2", "type": "serviceTask"},
                {"id": "f1", "type": "sequenceFlow", "source": "t1", "target": "t2"}
            ]
        }))
        .unwrap();

    // Flat shape: the envelope was missing, collections were lifted/repaired.
    assert!(outcome
        .schema_diagnostics
        .iter()
        .any(|d| d.code == "SCHEMA-RESULT"));
    assert_eq!(outcome.node_count, 2);
    assert_eq!(outcome.edge_count, 1);
    // Unnamed tasks show up as style warnings.
    assert!(outcome.warnings.iter().any(|d| d.code == "Style 0103"));
}
