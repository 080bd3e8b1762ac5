use super::cypher::{json_or_null, json_string, quoted, sanitize_relationship};
use super::gateway::{build_gateway_map, classify_direction, label, Direction};
use crate::ids::IdSource;
use crate::model::{Flow, NormalizedModel};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction::{Incoming, Outgoing};
use std::collections::{HashMap, HashSet};

// ─── Edge pass ────────────────────────────────────────────────
//
// Every emitted edge must connect two real nodes (activities, events and the
// invisible tasks synthesized here). Flows that touch gateways are resolved
// to their nearest real ancestors/descendants; a direct gateway→gateway flow
// is first split through a fresh invisible task.

/// Result of the edge pass.
pub struct EdgePass {
    pub statements: Vec<String>,
    /// Invisible-task `CREATE`s included in `statements`.
    pub invisible_tasks: usize,
    /// Emitted relationship statements after deduplication.
    pub edge_count: usize,
}

struct FlowGraph {
    graph: DiGraph<String, usize>,
    index: HashMap<String, NodeIndex>,
}

impl FlowGraph {
    fn build(flows: &[Flow]) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        for (slot, flow) in flows.iter().enumerate() {
            let (Some(src), Some(tgt)) = (&flow.source, &flow.target) else {
                continue;
            };
            let si = *index
                .entry(src.clone())
                .or_insert_with(|| graph.add_node(src.clone()));
            let ti = *index
                .entry(tgt.clone())
                .or_insert_with(|| graph.add_node(tgt.clone()));
            graph.add_edge(si, ti, slot);
        }
        Self { graph, index }
    }

    fn fan(&self, id: &str, direction: petgraph::Direction) -> usize {
        self.index
            .get(id)
            .map(|&n| self.graph.edges_directed(n, direction).count())
            .unwrap_or(0)
    }

    /// Walk `direction` from `id` through non-real nodes, yielding the first
    /// real node reached on every branch. Cycle-safe via the visited set.
    fn real_neighbors(
        &self,
        id: &str,
        direction: petgraph::Direction,
        real_nodes: &HashSet<String>,
    ) -> Vec<String> {
        let mut found = Vec::new();
        let Some(&start) = self.index.get(id) else {
            return found;
        };
        let mut visited = HashSet::new();
        self.walk(start, direction, real_nodes, &mut visited, &mut found);
        found
    }

    fn walk(
        &self,
        node: NodeIndex,
        direction: petgraph::Direction,
        real_nodes: &HashSet<String>,
        visited: &mut HashSet<NodeIndex>,
        found: &mut Vec<String>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for next in self.graph.neighbors_directed(node, direction) {
            let id = &self.graph[next];
            if real_nodes.contains(id) {
                found.push(id.clone());
            } else {
                self.walk(next, direction, real_nodes, visited, found);
            }
        }
    }
}

/// Run the edge pass over the normalized model.
pub fn generate_edges(model: &NormalizedModel, process_id: &str, ids: &mut dyn IdSource) -> EdgePass {
    let gateway_map = build_gateway_map(&model.gateways);
    let original_flows = &model.flows;

    // Phase A: gateways that sit on a direct gateway→gateway flow.
    let mut gateway_chains: HashSet<String> = HashSet::new();
    for flow in original_flows {
        if let (Some(src), Some(tgt)) = (&flow.source, &flow.target) {
            if gateway_map.contains_key(src) && gateway_map.contains_key(tgt) {
                gateway_chains.insert(src.clone());
                gateway_chains.insert(tgt.clone());
            }
        }
    }

    let mut real_nodes: HashSet<String> = model
        .activities
        .iter()
        .map(|a| a.id.clone())
        .chain(model.events.iter().map(|e| e.id.clone()))
        .collect();

    let mut statements = Vec::new();
    let mut invisible_tasks = 0usize;

    // Phase B: split every gateway→gateway flow through an invisible task.
    let mut all_flows: Vec<Flow> = Vec::with_capacity(original_flows.len());
    for flow in original_flows {
        let chained = match (&flow.source, &flow.target) {
            (Some(src), Some(tgt)) => {
                gateway_map.contains_key(src) && gateway_map.contains_key(tgt)
            }
            _ => false,
        };
        if !chained {
            all_flows.push(flow.clone());
            continue;
        }

        let invisible_id = format!("invisible_{}", ids.fresh_hex(8));
        let upstream = original_flows
            .iter()
            .find(|candidate| candidate.source == flow.source);
        statements.push(invisible_task_statement(&invisible_id, upstream, process_id));
        real_nodes.insert(invisible_id.clone());
        invisible_tasks += 1;

        let mut inbound = flow.clone();
        inbound.id = format!("{}_inv_in", flow.id);
        inbound.target = Some(invisible_id.clone());
        let mut outbound = flow.clone();
        outbound.id = format!("{}_inv_out", flow.id);
        outbound.source = Some(invisible_id.clone());
        all_flows.push(inbound);
        all_flows.push(outbound);
    }

    // Phases C/D: adjacency over the rewritten flow set, then directions.
    let flow_graph = FlowGraph::build(&all_flows);
    let directions: HashMap<&str, Direction> = gateway_map
        .iter()
        .map(|(gid, gtype)| {
            let fan_in = flow_graph.fan(gid, Incoming);
            let fan_out = flow_graph.fan(gid, Outgoing);
            (gid.as_str(), classify_direction(gtype, fan_in, fan_out))
        })
        .collect();

    // Phase E: emission.
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut edge_count = 0usize;

    for flow in &all_flows {
        let (Some(src), Some(tgt)) = (&flow.source, &flow.target) else {
            tracing::warn!(flow = %flow.id, "flow without resolvable endpoints skipped");
            continue;
        };

        let mut rel_name = if flow.is_message() {
            "MESSAGE_FLOW".to_string()
        } else {
            "SEQUENCE_FLOW".to_string()
        };
        let mut gtype = "";
        let mut direction = "";
        let mut gateway_id = "";

        if let Some(t) = gateway_map.get(src) {
            gtype = t;
            let dir = directions.get(src.as_str()).copied().unwrap_or(Direction::Single);
            direction = dir.as_str();
            rel_name = label(gtype, dir);
            gateway_id = src;
        } else if let Some(t) = gateway_map.get(tgt) {
            gtype = t;
            let dir = directions.get(tgt.as_str()).copied().unwrap_or(Direction::Single);
            direction = dir.as_str();
            rel_name = label(gtype, dir);
            gateway_id = tgt;
        } else if flow.source_name.to_lowercase().contains("gateway") {
            gtype = "gateway";
            direction = Direction::Single.as_str();
            rel_name = label(gtype, Direction::Single);
            gateway_id = src;
        }

        let rel_name = sanitize_relationship(&rel_name);
        let props = edge_props(flow, &rel_name, gtype, direction, gateway_id, process_id);

        let mut emit = |a: &str, b: &str, statements: &mut Vec<String>| {
            if seen.insert((a.to_string(), b.to_string())) {
                debug_assert!(
                    real_nodes.contains(a) && real_nodes.contains(b),
                    "edge endpoint is not a real node: {a} -> {b}"
                );
                statements.push(format!(
                    "MATCH (a {{id: {}}}) WITH a MATCH (b {{id: {}}}) CREATE (a)-[:{} {{{}}}]->(b);",
                    quoted(a),
                    quoted(b),
                    rel_name,
                    props,
                ));
                edge_count += 1;
            }
        };

        let src_real = real_nodes.contains(src.as_str());
        let tgt_real = real_nodes.contains(tgt.as_str());

        // Event-based gateways bypass to real endpoints on both sides and
        // ignore the gateway-chain suppression.
        if gtype == "eventbasedgateway" {
            let sources = if src_real {
                vec![src.clone()]
            } else {
                flow_graph.real_neighbors(src, Incoming, &real_nodes)
            };
            let targets = if tgt_real {
                vec![tgt.clone()]
            } else {
                flow_graph.real_neighbors(tgt, Outgoing, &real_nodes)
            };
            for a in &sources {
                for b in &targets {
                    emit(a, b, &mut statements);
                }
            }
            continue;
        }

        match (src_real, tgt_real) {
            (true, true) => emit(src, tgt, &mut statements),
            (true, false) => {
                if gateway_chains.contains(tgt.as_str()) {
                    // The invisible task carries this hop unless the source
                    // has nowhere else to go. Count taken from the rewritten
                    // map, which already includes the invisible split.
                    if flow_graph.fan(src, Outgoing) == 1 {
                        for b in flow_graph.real_neighbors(tgt, Outgoing, &real_nodes) {
                            emit(src, &b, &mut statements);
                        }
                    }
                    continue;
                }
                for b in flow_graph.real_neighbors(tgt, Outgoing, &real_nodes) {
                    emit(src, &b, &mut statements);
                }
            }
            (false, true) => {
                if gateway_chains.contains(src.as_str()) {
                    if flow_graph.fan(tgt, Incoming) == 1 {
                        for a in flow_graph.real_neighbors(src, Incoming, &real_nodes) {
                            emit(&a, tgt, &mut statements);
                        }
                    }
                    continue;
                }
                for a in flow_graph.real_neighbors(src, Incoming, &real_nodes) {
                    emit(&a, tgt, &mut statements);
                }
            }
            (false, false) => {
                let sources = flow_graph.real_neighbors(src, Incoming, &real_nodes);
                let targets = flow_graph.real_neighbors(tgt, Outgoing, &real_nodes);
                for a in &sources {
                    for b in &targets {
                        emit(a, b, &mut statements);
                    }
                }
            }
        }
    }

    EdgePass {
        statements,
        invisible_tasks,
        edge_count,
    }
}

/// Invisible-task node, inheriting pool/lane from the source gateway's first
/// outgoing flow.
fn invisible_task_statement(
    invisible_id: &str,
    upstream: Option<&Flow>,
    process_id: &str,
) -> String {
    let mut pool_lane_props = String::new();
    if let Some(flow) = upstream {
        if let Some(pool_id) = &flow.source_pool {
            pool_lane_props.push_str(&format!("pool_id: {}, ", json_string(pool_id)));
        }
        if let Some(lane_id) = &flow.source_lane {
            pool_lane_props.push_str(&format!("lane_id: {}, ", json_string(lane_id)));
        }
        pool_lane_props.push_str(&format!(
            "pool_name: {}, lane_name: {}, ",
            json_string(&flow.source_pool_name),
            json_string(&flow.source_lane_name),
        ));
    }
    format!(
        "CREATE (a:Activity {{id: {}, name: {}, type: {}, {}process_id: {}}});",
        quoted(invisible_id),
        json_string("Invisible Task"),
        quoted("InvisibleTask"),
        pool_lane_props,
        quoted(process_id),
    )
}

fn edge_props(
    flow: &Flow,
    rel_name: &str,
    gtype: &str,
    direction: &str,
    gateway_id: &str,
    process_id: &str,
) -> String {
    format!(
        "id: {}, name: {}, type: {}, flow_type: {}, gateway_type: {}, gateway_direction: {}, \
         gateway_id: {}, source_name: {}, target_name: {}, \
         source_pool: {}, source_lane: {}, target_pool: {}, target_lane: {}, \
         source_pool_name: {}, source_lane_name: {}, target_pool_name: {}, target_lane_name: {}, \
         process_id: {}",
        quoted(&flow.id),
        quoted(&flow.name),
        quoted(rel_name),
        quoted(&flow.flow_type),
        quoted(gtype),
        quoted(direction),
        quoted(gateway_id),
        quoted(&flow.source_name),
        quoted(&flow.target_name),
        json_or_null(flow.source_pool.as_deref()),
        json_or_null(flow.source_lane.as_deref()),
        json_or_null(flow.target_pool.as_deref()),
        json_or_null(flow.target_lane.as_deref()),
        json_string(&flow.source_pool_name),
        json_string(&flow.source_lane_name),
        json_string(&flow.target_pool_name),
        json_string(&flow.target_lane_name),
        quoted(process_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CountingIdSource;
    use crate::model::{Activity, Event, Gateway};

    fn activity(id: &str) -> Activity {
        Activity {
            id: id.to_string(),
            kind: "usertask".to_string(),
            ..Default::default()
        }
    }

    fn event(id: &str, event_type: &str) -> Event {
        Event {
            id: id.to_string(),
            kind: event_type.to_lowercase(),
            event_type: event_type.to_string(),
            ..Default::default()
        }
    }

    fn gateway(id: &str, gateway_type: &str) -> Gateway {
        Gateway {
            id: id.to_string(),
            kind: gateway_type.to_lowercase(),
            gateway_type: gateway_type.to_string(),
            ..Default::default()
        }
    }

    fn flow(id: &str, src: &str, tgt: &str) -> Flow {
        Flow {
            id: id.to_string(),
            kind: "sequenceflow".to_string(),
            flow_type: "sequenceflow".to_string(),
            source: Some(src.to_string()),
            target: Some(tgt.to_string()),
            ..Default::default()
        }
    }

    fn run(model: &NormalizedModel) -> EdgePass {
        let mut ids = CountingIdSource::new();
        generate_edges(model, "pid", &mut ids)
    }

    fn edge_pairs(pass: &EdgePass) -> Vec<(String, String)> {
        pass.statements
            .iter()
            .filter(|s| s.starts_with("MATCH"))
            .map(|s| {
                let src = s.split("MATCH (a {id: '").nth(1).unwrap();
                let src = src.split('\'').next().unwrap();
                let tgt = s.split("MATCH (b {id: '").nth(1).unwrap();
                let tgt = tgt.split('\'').next().unwrap();
                (src.to_string(), tgt.to_string())
            })
            .collect()
    }

    #[test]
    fn two_real_nodes_get_a_direct_sequence_flow() {
        let model = NormalizedModel {
            activities: vec![activity("t1"), activity("t2")],
            flows: vec![flow("f1", "t1", "t2")],
            ..Default::default()
        };
        let pass = run(&model);
        assert_eq!(pass.edge_count, 1);
        assert!(pass.statements[0].contains("CREATE (a)-[:SEQUENCE_FLOW"));
        assert!(pass.statements[0].starts_with("MATCH (a {id: 't1'})"));
    }

    #[test]
    fn xor_split_labels_both_branches() {
        let model = NormalizedModel {
            events: vec![event("s", "startEvent")],
            activities: vec![activity("a"), activity("b")],
            gateways: vec![gateway("g", "exclusivegateway")],
            flows: vec![flow("f1", "s", "g"), flow("f2", "g", "a"), flow("f3", "g", "b")],
            ..Default::default()
        };
        let pass = run(&model);
        assert_eq!(pass.edge_count, 2);
        for statement in pass.statements.iter().filter(|s| s.starts_with("MATCH")) {
            assert!(statement.contains("[:XOR_SPLIT"), "{statement}");
            assert!(statement.contains("gateway_direction: 'SPLIT'"), "{statement}");
        }
        let pairs = edge_pairs(&pass);
        assert!(pairs.contains(&("s".to_string(), "a".to_string())));
        assert!(pairs.contains(&("s".to_string(), "b".to_string())));
    }

    #[test]
    fn gateway_chain_synthesizes_exactly_one_invisible_task() {
        let model = NormalizedModel {
            events: vec![event("s", "startEvent"), event("e", "endEvent")],
            activities: vec![activity("t")],
            gateways: vec![
                gateway("g1", "exclusivegateway"),
                gateway("g2", "parallelgateway"),
            ],
            flows: vec![
                flow("f1", "s", "g1"),
                flow("f2", "g1", "g2"),
                flow("f3", "g2", "t"),
                flow("f4", "t", "e"),
            ],
            ..Default::default()
        };
        let pass = run(&model);
        assert_eq!(pass.invisible_tasks, 1);

        let invisible: Vec<_> = pass
            .statements
            .iter()
            .filter(|s| s.contains("type: 'InvisibleTask'"))
            .collect();
        assert_eq!(invisible.len(), 1);

        let pairs = edge_pairs(&pass);
        let inv_id = pairs
            .iter()
            .find(|(a, _)| a == "s")
            .map(|(_, b)| b.clone())
            .expect("start connects to the invisible task");
        assert!(inv_id.starts_with("invisible_"));
        assert!(pairs.contains(&(inv_id.clone(), "t".to_string())));
        assert!(pairs.contains(&("t".to_string(), "e".to_string())));
        // No edge may touch a gateway id.
        for (a, b) in &pairs {
            assert_ne!(a, "g1");
            assert_ne!(b, "g1");
            assert_ne!(a, "g2");
            assert_ne!(b, "g2");
        }
        assert_eq!(pass.edge_count, 3);
    }

    #[test]
    fn duplicate_endpoint_pairs_are_dropped() {
        let model = NormalizedModel {
            activities: vec![activity("t1"), activity("t2")],
            flows: vec![flow("f1", "t1", "t2"), flow("f2", "t1", "t2")],
            ..Default::default()
        };
        let pass = run(&model);
        assert_eq!(pass.edge_count, 1);
    }

    #[test]
    fn message_flow_gets_message_flow_label() {
        let mut message = flow("m1", "t1", "t2");
        message.kind = "messageflow".to_string();
        message.flow_type = "messageflow".to_string();
        let model = NormalizedModel {
            activities: vec![activity("t1"), activity("t2")],
            flows: vec![message],
            ..Default::default()
        };
        let pass = run(&model);
        assert!(pass.statements[0].contains("[:MESSAGE_FLOW"));
    }

    #[test]
    fn event_based_gateway_connects_source_to_catch_events() {
        let model = NormalizedModel {
            activities: vec![activity("t")],
            events: vec![
                event("c1", "intermediateCatchEvent"),
                event("c2", "intermediateCatchEvent"),
            ],
            gateways: vec![gateway("g", "eventbasedgateway")],
            flows: vec![flow("f1", "t", "g"), flow("f2", "g", "c1"), flow("f3", "g", "c2")],
            ..Default::default()
        };
        let pass = run(&model);
        let pairs = edge_pairs(&pass);
        assert!(pairs.contains(&("t".to_string(), "c1".to_string())));
        assert!(pairs.contains(&("t".to_string(), "c2".to_string())));
        assert_eq!(pass.edge_count, 2);
        for statement in pass.statements.iter().filter(|s| s.starts_with("MATCH")) {
            assert!(statement.contains("[:EVENT_BASED_SPLIT"), "{statement}");
        }
    }

    #[test]
    fn split_source_feeding_a_chained_gateway_is_suppressed() {
        // t fans out to a chained gateway and a real task; the invisible task
        // carries the gateway hop, so no direct t→(beyond g1) edges appear.
        let model = NormalizedModel {
            activities: vec![activity("t"), activity("x"), activity("y")],
            gateways: vec![
                gateway("g1", "exclusivegateway"),
                gateway("g2", "parallelgateway"),
            ],
            flows: vec![
                flow("f1", "t", "g1"),
                flow("f2", "t", "x"),
                flow("f3", "g1", "g2"),
                flow("f4", "g2", "y"),
            ],
            ..Default::default()
        };
        let pass = run(&model);
        let pairs = edge_pairs(&pass);
        // t has two outgoing flows, so the bypass through g1 is suppressed.
        assert!(!pairs.iter().any(|(a, b)| a == "t" && b == "y"));
        assert!(pairs.contains(&("t".to_string(), "x".to_string())));
        // The invisible task still routes g1→g2 traffic to y.
        let inv = pairs
            .iter()
            .find(|(a, _)| a.starts_with("invisible_"))
            .expect("invisible task edge");
        assert_eq!(inv.1, "y");
    }

    #[test]
    fn cycle_through_gateways_terminates() {
        let model = NormalizedModel {
            activities: vec![activity("t")],
            gateways: vec![
                gateway("g1", "exclusivegateway"),
                gateway("g2", "exclusivegateway"),
            ],
            flows: vec![
                flow("f1", "t", "g1"),
                flow("f2", "g1", "g2"),
                flow("f3", "g2", "g1"),
            ],
            ..Default::default()
        };
        // Two gateway→gateway flows → two invisible tasks; traversal must not
        // loop forever.
        let pass = run(&model);
        assert_eq!(pass.invisible_tasks, 2);
    }
}
