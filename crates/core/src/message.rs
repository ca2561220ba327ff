//! Control messages from the foreground application and update-check results.

use serde::{Deserialize, Serialize};

/// Inbound control message, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate the waiting worker immediately.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Store an arbitrary payload at the synthetic offline-data key.
    #[serde(rename = "CACHE_DATA")]
    CacheData {
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl ControlMessage {
    /// Parse a message, returning `None` for unknown or malformed messages.
    pub fn parse(value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!("ignoring unrecognized control message: {e}");
                None
            }
        }
    }
}

/// Outcome of a version check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateResult {
    UpToDate,
    NewVersionAvailable,
    CheckFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_skip_waiting() {
        let msg = ControlMessage::parse(json!({ "type": "SKIP_WAITING" }));
        assert_eq!(msg, Some(ControlMessage::SkipWaiting));
    }

    #[test]
    fn test_parse_cache_data() {
        let msg = ControlMessage::parse(json!({ "type": "CACHE_DATA", "payload": { "drafts": [1, 2] } }));
        assert_eq!(msg, Some(ControlMessage::CacheData { payload: json!({ "drafts": [1, 2] }) }));
    }

    #[test]
    fn test_parse_cache_data_without_payload() {
        let msg = ControlMessage::parse(json!({ "type": "CACHE_DATA" }));
        assert_eq!(msg, Some(ControlMessage::CacheData { payload: serde_json::Value::Null }));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(ControlMessage::parse(json!({ "type": "RELOAD" })), None);
        assert_eq!(ControlMessage::parse(json!({ "payload": 1 })), None);
        assert_eq!(ControlMessage::parse(json!("SKIP_WAITING")), None);
    }

    #[test]
    fn test_update_result_serialization() {
        let s = serde_json::to_string(&UpdateResult::NewVersionAvailable).unwrap();
        assert_eq!(s, "\"new_version_available\"");
    }
}
