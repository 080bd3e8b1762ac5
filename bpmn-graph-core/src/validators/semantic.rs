use crate::diagnostics::Diagnostic;
use crate::error::SemanticError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

// ─── Semantic validation ──────────────────────────────────────

/// Outcome of a semantic validation pass.
#[derive(Debug, Default)]
pub struct SemanticReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl SemanticReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Check the shaped document against the BPMN well-formedness rules.
///
/// Every rule carries a stable code (`BPMN 0101`, `Style 0103`, …). Hard
/// rules produce errors, style rules produce warnings. Non-strict mode
/// always returns the report; strict mode fails when any error fired.
pub fn validate_semantics(doc: &Value, strict: bool) -> Result<SemanticReport, SemanticError> {
    let root = doc.get("result").filter(|r| r.is_object()).unwrap_or(doc);
    let flow_elements = array_of(root, "flowElements");
    let message_flows = array_of(root, "messageFlows");

    let activities: Vec<&Value> = filter_type(&flow_elements, |t| t.contains("task"));
    let events: Vec<&Value> =
        filter_type(&flow_elements, |t| t.contains("event") && !t.contains("gateway"));
    let gateways: Vec<&Value> = filter_type(&flow_elements, |t| t.contains("gateway"));
    let flows: Vec<&Value> = filter_type(&flow_elements, |t| t.contains("flow"));

    let mut report = SemanticReport::default();

    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for flow in &flows {
        let (src, tgt) = resolve_endpoints(flow);
        if let (Some(src), Some(tgt)) = (src, tgt) {
            outgoing.entry(src).or_default().push(tgt);
            incoming.entry(tgt).or_default().push(src);
        }
    }

    let valid_ids: HashSet<&str> = activities
        .iter()
        .chain(&events)
        .chain(&gateways)
        .filter_map(|el| str_of(el, "id"))
        .collect();

    let elements_by_id: HashMap<&str, &Value> = flow_elements
        .iter()
        .filter_map(|el| str_of(el, "id").map(|id| (id, *el)))
        .collect();

    check_flows(&flows, &valid_ids, &elements_by_id, &mut report);
    check_events(&events, &incoming, &outgoing, &mut report);
    check_activities(&activities, &incoming, &outgoing, &mut report);
    check_gateways(&gateways, &incoming, &outgoing, &elements_by_id, &mut report);
    check_orphans(&activities, &events, &gateways, &incoming, &outgoing, &mut report);
    check_message_flows(&message_flows, &flows, &valid_ids, &elements_by_id, &mut report);
    check_start_event_scopes(&events, &mut report);
    check_gateway_labels(&gateways, &flows, &mut report);

    let connected: HashSet<&str> = incoming.keys().chain(outgoing.keys()).copied().collect();
    let total = activities.len() + events.len() + gateways.len();
    if total > 0 {
        let pct = connected.len() as f64 / total as f64 * 100.0;
        tracing::info!(connectivity = format!("{pct:.2}%"), "graph connectivity");
    }

    if strict && !report.errors.is_empty() {
        return Err(SemanticError::Violations {
            count: report.errors.len(),
            diagnostics: report.errors,
        });
    }
    Ok(report)
}

// ─── Raw-document helpers ─────────────────────────────────────

fn array_of<'a>(root: &'a Value, key: &str) -> Vec<&'a Value> {
    root.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

fn filter_type<'a>(elements: &[&'a Value], pred: impl Fn(&str) -> bool) -> Vec<&'a Value> {
    elements
        .iter()
        .filter(|el| pred(&lower_type(el)))
        .copied()
        .collect()
}

fn str_of<'a>(el: &'a Value, key: &str) -> Option<&'a str> {
    el.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn lower_type(el: &Value) -> String {
    el.get("type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase()
}

fn id_of(el: &Value) -> &str {
    el.get("id").and_then(Value::as_str).unwrap_or("")
}

fn name_of(el: &Value) -> &str {
    el.get("name").and_then(Value::as_str).unwrap_or("")
}

/// Prefer explicit `source`/`target`; fall back to the first entry of the
/// `incoming`/`outgoing` lists (some parser front-ends encode endpoints
/// there).
fn resolve_endpoints(el: &Value) -> (Option<&str>, Option<&str>) {
    let first = |key: &str| {
        el.get(key)
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(Value::as_str)
    };
    let src = str_of(el, "source").or_else(|| first("incoming"));
    let tgt = str_of(el, "target").or_else(|| first("outgoing"));
    (src, tgt)
}

/// Pool reference of an element: `properties.pool_id`, `pool_id`,
/// `process_id`, `processRef`, first hit wins. Empty / `"none"` / `"null"`
/// count as absent.
fn pool_of(el: &Value) -> Option<String> {
    let candidates = [
        el.get("properties").and_then(|p| p.get("pool_id")),
        el.get("pool_id"),
        el.get("process_id"),
        el.get("processRef"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(s) = candidate.as_str() {
            let trimmed = s.trim();
            let lowered = trimmed.to_lowercase();
            if !trimmed.is_empty() && lowered != "none" && lowered != "null" {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

#[derive(Debug, PartialEq)]
enum EventKind {
    Start,
    End,
    IntermediateCatch,
    IntermediateThrow,
    Other,
}

fn event_kind(el: &Value) -> EventKind {
    let sub = el
        .get("subType")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    let tagged = if sub.is_empty() { lower_type(el) } else { sub };
    if tagged.contains("start") {
        EventKind::Start
    } else if tagged.contains("end") {
        EventKind::End
    } else if tagged.contains("intermediatecatch") {
        EventKind::IntermediateCatch
    } else if tagged.contains("intermediatethrow") {
        EventKind::IntermediateThrow
    } else {
        EventKind::Other
    }
}

// ─── Rule groups ──────────────────────────────────────────────

/// BPMN 0101/0102 (flow endpoint resolution), BPMN 0202 (pool crossing).
fn check_flows(
    flows: &[&Value],
    valid_ids: &HashSet<&str>,
    elements_by_id: &HashMap<&str, &Value>,
    report: &mut SemanticReport,
) {
    for flow in flows {
        let fid = id_of(flow);
        let (src, tgt) = resolve_endpoints(flow);

        if src.map(|s| !valid_ids.contains(s)).unwrap_or(true) {
            report.errors.push(
                Diagnostic::error(
                    "BPMN 0101",
                    format!(
                        "Flow '{fid}' has invalid source: '{}' not found",
                        src.unwrap_or("")
                    ),
                )
                .on(fid),
            );
        }
        if tgt.map(|t| !valid_ids.contains(t)).unwrap_or(true) {
            report.errors.push(
                Diagnostic::error(
                    "BPMN 0102",
                    format!(
                        "Flow '{fid}' has invalid target: '{}' not found",
                        tgt.unwrap_or("")
                    ),
                )
                .on(fid),
            );
        }

        if lower_type(flow) == "sequenceflow" {
            let src_pool = src.and_then(|s| elements_by_id.get(s)).and_then(|e| pool_of(e));
            let tgt_pool = tgt.and_then(|t| elements_by_id.get(t)).and_then(|e| pool_of(e));
            if let (Some(sp), Some(tp)) = (src_pool, tgt_pool) {
                if sp != tp {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0202",
                            format!("Sequence flow '{fid}' crosses pool boundary"),
                        )
                        .on(fid),
                    );
                }
            }
        }
    }
}

/// BPMN 0105/0124/0113/0114 plus Style 01105/0129 label checks.
fn check_events(
    events: &[&Value],
    incoming: &HashMap<&str, Vec<&str>>,
    outgoing: &HashMap<&str, Vec<&str>>,
    report: &mut SemanticReport,
) {
    for event in events {
        let id = id_of(event);
        let has_in = incoming.contains_key(id);
        let has_out = outgoing.contains_key(id);

        match event_kind(event) {
            EventKind::Start => {
                if has_in {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0105",
                            format!("Start event '{id}' must not have incoming flow"),
                        )
                        .on(id),
                    );
                }
                if name_of(event).trim().is_empty() {
                    report.warnings.push(
                        Diagnostic::warning(
                            "Style 01105",
                            format!("Start event '{id}' should be labeled"),
                        )
                        .on(id),
                    );
                }
            }
            EventKind::End => {
                if has_out {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0124",
                            format!("End event '{id}' must not have outgoing flow"),
                        )
                        .on(id),
                    );
                }
                if name_of(event).trim().is_empty() {
                    report.warnings.push(
                        Diagnostic::warning(
                            "Style 0129",
                            format!("End event '{id}' should be labeled"),
                        )
                        .on(id),
                    );
                }
            }
            EventKind::IntermediateCatch => {
                if !has_in || !has_out {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0113",
                            format!(
                                "Intermediate catch event '{id}' requires incoming and outgoing flow"
                            ),
                        )
                        .on(id),
                    );
                }
            }
            EventKind::IntermediateThrow => {
                if !has_in || !has_out {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0114",
                            format!(
                                "Intermediate throw event '{id}' requires incoming and outgoing flow"
                            ),
                        )
                        .on(id),
                    );
                }
            }
            EventKind::Other => {}
        }
    }
}

/// BPMN 0101/0102 for tasks, Style 0103/0104 naming.
fn check_activities(
    activities: &[&Value],
    incoming: &HashMap<&str, Vec<&str>>,
    outgoing: &HashMap<&str, Vec<&str>>,
    report: &mut SemanticReport,
) {
    let mut names_seen: HashMap<String, &str> = HashMap::new();

    for task in activities {
        let id = id_of(task);
        if !incoming.contains_key(id) {
            report.errors.push(
                Diagnostic::error("BPMN 0101", format!("Task '{id}' has no incoming flow")).on(id),
            );
        }
        if !outgoing.contains_key(id) {
            report.errors.push(
                Diagnostic::error("BPMN 0102", format!("Task '{id}' has no outgoing flow")).on(id),
            );
        }

        let name = name_of(task).trim().to_string();
        if name.is_empty() {
            report.warnings.push(
                Diagnostic::warning("Style 0103", format!("Task '{id}' should have a name")).on(id),
            );
        } else if let Some(&other) = names_seen.get(&name) {
            report.warnings.push(
                Diagnostic::warning(
                    "Style 0104",
                    format!("Task '{id}' duplicates the name of task '{other}'"),
                )
                .on(id),
            );
        } else {
            names_seen.insert(name, id);
        }
    }
}

/// BPMN 0134 fan-in/fan-out constraints and BPMN 0138 event-based targets.
fn check_gateways(
    gateways: &[&Value],
    incoming: &HashMap<&str, Vec<&str>>,
    outgoing: &HashMap<&str, Vec<&str>>,
    elements_by_id: &HashMap<&str, &Value>,
    report: &mut SemanticReport,
) {
    for gateway in gateways {
        let id = id_of(gateway);
        let kind = gateway_type_of(gateway);
        let in_count = incoming.get(id).map(Vec::len).unwrap_or(0);
        let out_count = outgoing.get(id).map(Vec::len).unwrap_or(0);

        match kind.as_str() {
            "exclusivegateway" | "inclusivegateway" => {
                // The 2-outgoing rule only binds when the gateway diverges.
                if in_count <= 1 && out_count < 2 {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0134",
                            format!(
                                "Gateway '{id}' should have at least two outgoing flows when diverging"
                            ),
                        )
                        .on(id),
                    );
                }
            }
            "parallelgateway" => {
                if in_count <= 1 && out_count <= 1 {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0134",
                            format!("Parallel gateway '{id}' neither splits nor joins"),
                        )
                        .on(id),
                    );
                }
            }
            "eventbasedgateway" => {
                if out_count < 2 {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0134",
                            format!(
                                "Event-based gateway '{id}' should have at least two outgoing flows"
                            ),
                        )
                        .on(id),
                    );
                }
                for target in outgoing.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                    let is_catch = elements_by_id
                        .get(target)
                        .map(|el| event_kind(el) == EventKind::IntermediateCatch)
                        .unwrap_or(false);
                    if !is_catch {
                        report.errors.push(
                            Diagnostic::error(
                                "BPMN 0138",
                                format!(
                                    "Event-based gateway '{id}' target '{target}' is not an intermediate catch event"
                                ),
                            )
                            .on(id),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

/// Style 01107: no node may lack both incoming and outgoing flow.
fn check_orphans(
    activities: &[&Value],
    events: &[&Value],
    gateways: &[&Value],
    incoming: &HashMap<&str, Vec<&str>>,
    outgoing: &HashMap<&str, Vec<&str>>,
    report: &mut SemanticReport,
) {
    for node in activities.iter().chain(events).chain(gateways) {
        let id = id_of(node);
        if !incoming.contains_key(id) && !outgoing.contains_key(id) {
            report.warnings.push(
                Diagnostic::warning(
                    "Style 01107",
                    format!("Node '{id}' has no incoming or outgoing flow"),
                )
                .on(id),
            );
        }
    }
}

/// BPMN 0301/0302/0303: message flows connect resolvable endpoints in
/// *different* pools.
fn check_message_flows(
    message_flows: &[&Value],
    flows: &[&Value],
    valid_ids: &HashSet<&str>,
    elements_by_id: &HashMap<&str, &Value>,
    report: &mut SemanticReport,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    let typed: Vec<&Value> = flows
        .iter()
        .filter(|f| lower_type(f).contains("messageflow"))
        .copied()
        .collect();

    for flow in message_flows.iter().chain(&typed) {
        let fid = id_of(flow);
        if !fid.is_empty() && !seen.insert(fid) {
            continue;
        }
        let (src, tgt) = resolve_endpoints(flow);

        let src_ok = src.map(|s| valid_ids.contains(s)).unwrap_or(false);
        let tgt_ok = tgt.map(|t| valid_ids.contains(t)).unwrap_or(false);
        if !src_ok {
            report.errors.push(
                Diagnostic::error(
                    "BPMN 0302",
                    format!("Message flow '{fid}' source cannot be resolved"),
                )
                .on(fid),
            );
        }
        if !tgt_ok {
            report.errors.push(
                Diagnostic::error(
                    "BPMN 0303",
                    format!("Message flow '{fid}' target cannot be resolved"),
                )
                .on(fid),
            );
        }
        if src_ok && tgt_ok {
            let src_pool = src.and_then(|s| elements_by_id.get(s)).and_then(|e| pool_of(e));
            let tgt_pool = tgt.and_then(|t| elements_by_id.get(t)).and_then(|e| pool_of(e));
            if let (Some(sp), Some(tp)) = (src_pool, tgt_pool) {
                if sp == tp {
                    report.errors.push(
                        Diagnostic::error(
                            "BPMN 0301",
                            format!("Message flow '{fid}' must connect different pools"),
                        )
                        .on(fid),
                    );
                }
            }
        }
    }
}

/// Style 01106: at most one start event per process scope.
fn check_start_event_scopes(events: &[&Value], report: &mut SemanticReport) {
    let mut starts_per_scope: HashMap<String, Vec<&str>> = HashMap::new();
    for event in events {
        if event_kind(event) == EventKind::Start {
            let scope = pool_of(event).unwrap_or_default();
            starts_per_scope.entry(scope).or_default().push(id_of(event));
        }
    }
    for (scope, ids) in starts_per_scope {
        if ids.len() > 1 {
            report.warnings.push(Diagnostic::warning(
                "Style 01106",
                format!(
                    "Process scope '{scope}' has {} start events: [{}]",
                    ids.len(),
                    ids.join(", ")
                ),
            ));
        }
    }
}

/// Style 0135/0136: diverging gateways with unlabeled gates.
fn check_gateway_labels(gateways: &[&Value], flows: &[&Value], report: &mut SemanticReport) {
    for gateway in gateways {
        let id = id_of(gateway);
        let gates: Vec<&&Value> = flows
            .iter()
            .filter(|f| resolve_endpoints(f).0 == Some(id))
            .collect();
        if gates.len() <= 1 {
            continue;
        }
        let labeled = gates.iter().filter(|f| !name_of(f).trim().is_empty()).count();
        if labeled == 0 {
            report.warnings.push(
                Diagnostic::warning(
                    "Style 0135",
                    format!("Gateway '{id}' has multiple unlabeled outgoing gates"),
                )
                .on(id),
            );
        } else if labeled < gates.len() {
            report.warnings.push(
                Diagnostic::warning(
                    "Style 0136",
                    format!("Gateway '{id}' mixes labeled and unlabeled outgoing gates"),
                )
                .on(id),
            );
        }
    }
}

fn gateway_type_of(gateway: &Value) -> String {
    let explicit = gateway
        .get("gateway_type")
        .or_else(|| gateway.get("subType"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_lowercase();
    if !explicit.is_empty() {
        return explicit;
    }
    let kind = lower_type(gateway);
    if kind.contains("eventbased") || gateway.get("eventGatewayType").is_some() {
        "eventbasedgateway".to_string()
    } else if kind.contains("exclusive") {
        "exclusivegateway".to_string()
    } else if kind.contains("parallel") {
        "parallelgateway".to_string()
    } else if kind.contains("inclusive") {
        "inclusivegateway".to_string()
    } else if kind.contains("complex") {
        "complexgateway".to_string()
    } else {
        kind
    }
}
