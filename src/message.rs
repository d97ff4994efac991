//! Messages exchanged between pages and the worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control messages a page can post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting worker immediately.
    SkipWaiting,
    /// Delete every cache generation.
    ClearCache,
}

impl ControlMessage {
    /// Parses a raw message.
    ///
    /// Anything that is not an object with a known `type` is dropped with a
    /// warning; pages never get an error back for a bad message.
    #[must_use]
    pub fn parse(data: &Value) -> Option<Self> {
        match Self::deserialize(data) {
            Ok(message) => Some(message),
            Err(e) => {
                log::warn!("Ignoring malformed message {data}: {e}");
                None
            }
        }
    }
}

/// Messages the worker posts to pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    /// Replay queued offline reports now.
    SyncReports,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_messages() {
        assert_eq!(
            ControlMessage::parse(&json!({"type": "SKIP_WAITING"})),
            Some(ControlMessage::SkipWaiting)
        );
        assert_eq!(
            ControlMessage::parse(&json!({"type": "CLEAR_CACHE", "extra": 1})),
            Some(ControlMessage::ClearCache)
        );
    }

    #[test]
    fn malformed_messages_are_ignored() {
        assert_eq!(ControlMessage::parse(&Value::Null), None);
        assert_eq!(ControlMessage::parse(&json!("SKIP_WAITING")), None);
        assert_eq!(ControlMessage::parse(&json!({"kind": "SKIP_WAITING"})), None);
        assert_eq!(ControlMessage::parse(&json!({"type": "REBOOT"})), None);
    }

    #[test]
    fn sync_message_wire_format() {
        assert_eq!(
            serde_json::to_value(PageMessage::SyncReports).unwrap(),
            json!({"type": "SYNC_REPORTS"})
        );
    }
}
