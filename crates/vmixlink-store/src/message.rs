//! Messages exchanged with change subscribers over WebSocket

use serde::{Deserialize, Serialize};

use crate::profile::Items;

/// Greeting sent to every new subscriber
pub const WELCOME_MESSAGE: &str = "Connected to vMix Data Server";

/// Server to subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Welcome {
        message: String,
    },
    /// Keys whose value changed; `null` marks a removed key
    DataUpdate {
        #[serde(rename = "profileName")]
        profile_name: String,
        changes: Items,
    },
    Pong,
}

impl ServerMessage {
    pub fn welcome() -> Self {
        ServerMessage::Welcome {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}

/// Subscriber to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ping,
    /// Any other message type; ignored by the server
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Scalar;
    use serde_json::json;

    #[test]
    fn test_data_update_wire_shape() {
        let mut changes = Items::new();
        changes.insert("score", "1");
        changes.insert("old", Scalar::Null);
        let message = ServerMessage::DataUpdate {
            profile_name: "demo".to_string(),
            changes,
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "dataUpdate", "profileName": "demo", "changes": {"score": "1", "old": null}})
        );
    }

    #[test]
    fn test_welcome_and_pong() {
        assert_eq!(
            serde_json::to_value(ServerMessage::welcome()).unwrap(),
            json!({"type": "welcome", "message": "Connected to vMix Data Server"})
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
    }

    #[test]
    fn test_client_message_parsing() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        let other: ClientMessage = serde_json::from_str(r#"{"type":"hello"}"#).unwrap();
        assert_eq!(other, ClientMessage::Unknown);

        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
    }
}
