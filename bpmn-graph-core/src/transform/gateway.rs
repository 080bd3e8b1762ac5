use crate::model::Gateway;
use std::collections::HashMap;

// ─── Gateway classification ───────────────────────────────────

/// Canonical gateway type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
    Complex,
    EventBased,
    /// Unknown type string; still routed, labeled `GATEWAY`.
    Generic,
}

impl GatewayKind {
    /// Parse the normalized lowercase type string.
    pub fn from_type(gateway_type: &str) -> Self {
        match gateway_type {
            "exclusivegateway" => GatewayKind::Exclusive,
            "parallelgateway" => GatewayKind::Parallel,
            "inclusivegateway" => GatewayKind::Inclusive,
            "complexgateway" => GatewayKind::Complex,
            "eventbasedgateway" => GatewayKind::EventBased,
            _ => GatewayKind::Generic,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            GatewayKind::Exclusive => "XOR",
            GatewayKind::Parallel => "AND",
            GatewayKind::Inclusive => "OR",
            GatewayKind::Complex => "COMPLEX",
            GatewayKind::EventBased => "EVENT_BASED",
            GatewayKind::Generic => "GATEWAY",
        }
    }
}

/// Topological role of a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Split,
    Join,
    Single,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Split => "SPLIT",
            Direction::Join => "JOIN",
            Direction::Single => "SINGLE",
        }
    }
}

/// Resolve a gateway's effective type string. A non-empty `gateway_type`
/// always wins; only then is the display name sniffed for a kind.
pub fn resolve_type(gateway: &Gateway) -> String {
    let explicit = gateway.gateway_type.trim().to_lowercase();
    if !explicit.is_empty() {
        return explicit;
    }
    let name = gateway.name.to_lowercase();
    if name.contains("event") {
        "eventbasedgateway"
    } else if name.contains("complex") {
        "complexgateway"
    } else if name.contains("exclusive") {
        "exclusivegateway"
    } else if name.contains("parallel") {
        "parallelgateway"
    } else if name.contains("inclusive") {
        "inclusivegateway"
    } else {
        "gateway"
    }
    .to_string()
}

/// Gateway id → effective type string for every gateway in the model.
pub fn build_gateway_map(gateways: &[Gateway]) -> HashMap<String, String> {
    gateways
        .iter()
        .map(|gw| (gw.id.clone(), resolve_type(gw)))
        .collect()
}

/// SPLIT when fan-out exceeds one, JOIN when fan-in does, SINGLE otherwise.
/// Event-based gateways are always SPLIT.
pub fn classify_direction(gateway_type: &str, in_count: usize, out_count: usize) -> Direction {
    if gateway_type == "eventbasedgateway" {
        return Direction::Split;
    }
    if out_count > 1 {
        Direction::Split
    } else if in_count > 1 {
        Direction::Join
    } else {
        Direction::Single
    }
}

/// Relationship label: `PREFIX_DIRECTION` for splits and joins, the bare
/// prefix otherwise.
pub fn label(gateway_type: &str, direction: Direction) -> String {
    let kind = GatewayKind::from_type(gateway_type);
    let direction = if kind == GatewayKind::EventBased {
        Direction::Split
    } else {
        direction
    };
    match direction {
        Direction::Split | Direction::Join => format!("{}_{}", kind.prefix(), direction.as_str()),
        Direction::Single => kind.prefix().to_string(),
    }
}
