use serde::{Deserialize, Serialize};

// ─── Normalized collections ───────────────────────────────────
//
// Output of the normalizer, input of the graph transformer. Every field is
// serde-defaulted so a pre-structured document (one that already carries
// `activities`/`events`/`gateways`/`flows`) deserializes directly into the
// model without a normalization pass.

/// Real business node: a task of any flavor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Raw lowercase type string (`"usertask"`, `"servicetask"`, …).
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pool_id: Option<String>,
    #[serde(default)]
    pub lane_id: Option<String>,
    #[serde(default)]
    pub pool_name: String,
    #[serde(default)]
    pub lane_name: String,
    #[serde(default)]
    pub process_id: String,
}

/// Real business node: start, end or intermediate event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Sub-type (`"startEvent"`, `"endEvent"`, `"intermediateEvent"`, …).
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub pool_id: Option<String>,
    #[serde(default)]
    pub lane_id: Option<String>,
    #[serde(default)]
    pub pool_name: String,
    #[serde(default)]
    pub lane_name: String,
    #[serde(default)]
    pub process_id: String,
}

/// Routing node. Never an endpoint of an emitted edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Normalized lowercase gateway type (`"exclusivegateway"`, …).
    #[serde(default)]
    pub gateway_type: String,
    #[serde(default)]
    pub pool_id: Option<String>,
    #[serde(default)]
    pub lane_id: Option<String>,
    #[serde(default)]
    pub pool_name: String,
    #[serde(default)]
    pub lane_name: String,
    #[serde(default)]
    pub process_id: String,
}

/// Directed edge between two elements, sequence or message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// `"sequenceflow"` or `"messageflow"`.
    #[serde(default)]
    pub flow_type: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// Endpoint names as they were at normalization time.
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub target_name: String,
    /// First non-empty of source/target/own pool name, lane likewise.
    #[serde(default)]
    pub pool_name: String,
    #[serde(default)]
    pub lane_name: String,
    #[serde(default)]
    pub source_pool: Option<String>,
    #[serde(default)]
    pub source_lane: Option<String>,
    #[serde(default)]
    pub target_pool: Option<String>,
    #[serde(default)]
    pub target_lane: Option<String>,
    #[serde(default)]
    pub source_pool_name: String,
    #[serde(default)]
    pub source_lane_name: String,
    #[serde(default)]
    pub target_pool_name: String,
    #[serde(default)]
    pub target_lane_name: String,
    #[serde(default)]
    pub process_id: String,
}

impl Flow {
    pub fn is_message(&self) -> bool {
        self.flow_type.contains("message") || self.kind.contains("message")
    }
}

/// Top-level participant container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "pool_type", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub process_ref: String,
}

fn pool_type() -> String {
    "Pool".to_string()
}

/// Child of a pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "lane_type", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pool_id: String,
}

fn lane_type() -> String {
    "Lane".to_string()
}

/// The six typed collections one transformation run operates on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedModel {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub gateways: Vec<Gateway>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default)]
    pub process_id: String,
}

impl NormalizedModel {
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
            && self.events.is_empty()
            && self.gateways.is_empty()
            && self.flows.is_empty()
            && self.pools.is_empty()
            && self.lanes.is_empty()
    }
}
