use super::cypher::quoted;
use crate::model::NormalizedModel;

// ─── Pool / Lane statements ───────────────────────────────────

/// Emit `Pool` and `Lane` node statements plus the `BELONGS_TO` relation for
/// every lane that knows its pool. Returns the statements and how many of
/// them create nodes.
pub fn generate_pools_lanes(model: &NormalizedModel, process_id: &str) -> (Vec<String>, usize) {
    let mut statements = Vec::new();
    let mut node_count = 0usize;

    for pool in &model.pools {
        statements.push(format!(
            "CREATE (:Pool {{id: {}, name: {}, type: {}, process_ref: {}, process_id: {}}});",
            quoted(&pool.id),
            quoted(&pool.name),
            quoted(&pool.kind),
            quoted(&pool.process_ref),
            quoted(process_id),
        ));
        node_count += 1;
    }

    for lane in &model.lanes {
        statements.push(format!(
            "CREATE (:Lane {{id: {}, name: {}, type: {}, pool_id: {}, process_id: {}}});",
            quoted(&lane.id),
            quoted(&lane.name),
            quoted(&lane.kind),
            quoted(&lane.pool_id),
            quoted(process_id),
        ));
        node_count += 1;

        if !lane.pool_id.is_empty() {
            statements.push(format!(
                "MATCH (l:Lane {{id: {}}}) WITH l MATCH (p:Pool {{id: {}}}) CREATE (l)-[:BELONGS_TO]->(p);",
                quoted(&lane.id),
                quoted(&lane.pool_id),
            ));
        }
    }

    (statements, node_count)
}
