use super::cypher::{json_or_null, json_string, quoted};
use crate::model::NormalizedModel;
use std::collections::HashMap;

// ─── Activity / Event statements ──────────────────────────────

/// Emit one `CREATE` per activity and event.
///
/// Pool/lane names stored on the entity win (the normalizer already ran the
/// lookup maps with the process-ref fallback); for pre-structured models that
/// carry pools but no resolved names, the maps are consulted here.
pub fn generate_nodes(model: &NormalizedModel, process_id: &str) -> Vec<String> {
    let mut statements = Vec::new();

    let pool_by_id: HashMap<&str, &str> = model
        .pools
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();
    let pool_by_ref: HashMap<&str, &str> = model
        .pools
        .iter()
        .filter(|p| !p.process_ref.is_empty())
        .map(|p| (p.process_ref.as_str(), p.name.as_str()))
        .collect();
    let lane_by_id: HashMap<&str, &str> = model
        .lanes
        .iter()
        .map(|l| (l.id.as_str(), l.name.as_str()))
        .collect();

    let pool_name_for = |pool_id: Option<&str>, stored: &str| -> String {
        if !stored.is_empty() {
            return stored.to_string();
        }
        pool_id
            .and_then(|p| pool_by_id.get(p).or_else(|| pool_by_ref.get(p)))
            .copied()
            .unwrap_or("")
            .to_string()
    };
    let lane_name_for = |lane_id: Option<&str>, stored: &str| -> String {
        if !stored.is_empty() {
            return stored.to_string();
        }
        lane_id
            .and_then(|l| lane_by_id.get(l))
            .copied()
            .unwrap_or("")
            .to_string()
    };

    for act in &model.activities {
        let pool_name = pool_name_for(act.pool_id.as_deref(), &act.pool_name);
        let lane_name = lane_name_for(act.lane_id.as_deref(), &act.lane_name);

        // Absent pool/lane references are omitted entirely on activities.
        let mut pool_lane_props = String::new();
        if let Some(pool_id) = &act.pool_id {
            pool_lane_props.push_str(&format!(
                "pool_id: {}, pool_name: {}, ",
                json_string(pool_id),
                json_string(&pool_name),
            ));
        }
        if let Some(lane_id) = &act.lane_id {
            pool_lane_props.push_str(&format!(
                "lane_id: {}, lane_name: {}, ",
                json_string(lane_id),
                json_string(&lane_name),
            ));
        }

        statements.push(format!(
            "CREATE (a:Activity {{id: {}, name: {}, type: {}, {}process_id: {}}});",
            quoted(&act.id),
            json_string(&act.name),
            quoted(&act.kind),
            pool_lane_props,
            quoted(process_id),
        ));
    }

    for evt in &model.events {
        let event_type = if evt.event_type.is_empty() {
            evt.kind.clone()
        } else {
            evt.event_type.clone()
        };
        let mut name = evt.name.clone();
        if name.trim().is_empty() {
            let lowered = event_type.to_lowercase();
            if lowered.contains("start") {
                name = "Start".to_string();
            } else if lowered.contains("end") {
                name = "End".to_string();
            }
        }

        let pool_name = pool_name_for(evt.pool_id.as_deref(), &evt.pool_name);
        let lane_name = lane_name_for(evt.lane_id.as_deref(), &evt.lane_name);

        statements.push(format!(
            "CREATE (e:Event {{id: {}, name: {}, type: {}, event_type: {}, bpmn_type: {}, pool_id: {}, lane_id: {}, pool_name: {}, lane_name: {}, process_id: {}}});",
            quoted(&evt.id),
            json_string(&name),
            quoted(&evt.kind),
            quoted(&event_type),
            quoted(&event_type),
            json_or_null(evt.pool_id.as_deref()),
            json_or_null(evt.lane_id.as_deref()),
            json_string(&pool_name),
            json_string(&lane_name),
            quoted(process_id),
        ));
    }

    statements
}
