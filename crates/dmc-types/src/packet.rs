//! Per-step decision packet.
//!
//! One packet records everything a replay needs for a single step: the raw
//! input, external observations, the engine's output, the final action and
//! any mismatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decision::MismatchInfo;
use crate::error::Result;

/// Packet format version written into every packet.
pub const PACKET_SCHEMA_VERSION: &str = "2";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionPacket {
    pub schema_version: String,
    pub run_id: String,
    pub step: u64,
    pub input: Value,
    pub external: Value,
    /// Engine output for this step
    pub engine: Value,
    pub final_action: Value,
    pub latency_ms: u64,
    #[serde(default)]
    pub mismatch: Option<MismatchInfo>,
}

impl DecisionPacket {
    pub fn new(run_id: impl Into<String>, step: u64) -> Self {
        Self {
            schema_version: PACKET_SCHEMA_VERSION.to_string(),
            run_id: run_id.into(),
            step,
            input: Value::Null,
            external: Value::Null,
            engine: Value::Null,
            final_action: Value::Null,
            latency_ms: 0,
            mismatch: None,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_external(mut self, external: Value) -> Self {
        self.external = external;
        self
    }

    pub fn with_engine(mut self, engine: Value) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_final_action(mut self, final_action: Value) -> Self {
        self.final_action = final_action;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_mismatch(mut self, mismatch: MismatchInfo) -> Self {
        self.mismatch = Some(mismatch);
        self
    }

    /// Packet as a JSON object.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Packet as a single JSON line.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn packet_to_value() {
        let packet = DecisionPacket::new("run-1", 0)
            .with_input(json!({ "ts": 1000 }))
            .with_external(json!({ "mid": 0.5 }))
            .with_engine(json!({ "action": "QUOTE" }))
            .with_final_action(json!({ "action": "QUOTE" }))
            .with_latency_ms(2);

        let value = packet.to_value().unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["step"], 0);
        assert_eq!(value["latency_ms"], 2);
        assert_eq!(value["schema_version"], PACKET_SCHEMA_VERSION);
        assert!(value.get("input").is_some());
        assert!(value.get("external").is_some());
        assert!(value["mismatch"].is_null());
    }

    #[test]
    fn packet_json_line_has_no_newlines() {
        let packet = DecisionPacket::new("run-2", 7)
            .with_mismatch(MismatchInfo::single("staleness", "staleness_exceeded"));
        let line = packet.to_json().unwrap();
        assert!(!line.contains('\n'));

        let back: DecisionPacket = serde_json::from_str(&line).unwrap();
        assert_eq!(back, packet);
    }
}
