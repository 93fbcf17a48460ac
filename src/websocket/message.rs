use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { rooms: Vec<String> },
    Unsubscribe { rooms: Vec<String> },
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "event")]
    Event {
        event: String,
        data: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "subscribed")]
    Subscribed {
        #[serde(rename = "payload")]
        rooms: Vec<String>,
    },
    #[serde(rename = "unsubscribed")]
    Unsubscribed {
        #[serde(rename = "payload")]
        rooms: Vec<String>,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "error")]
    Error { code: String, message: String },
    /// Server is going away; clients should reconnect later
    #[serde(rename = "shutdown")]
    Shutdown {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reconnect_after_seconds: Option<u64>,
    },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn shutdown(reason: impl Into<String>, reconnect_after_seconds: Option<u64>) -> Self {
        Self::Shutdown {
            reason: reason.into(),
            reconnect_after_seconds,
        }
    }

    pub fn event(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Event {
            event: event.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","payload":{"rooms":["order:1"]}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { rooms } if rooms == vec!["order:1"]));

        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"ack"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let msg = ServerMessage::event("order:new", serde_json::json!({"orderNumber": "ORD-1"}));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["event"], "order:new");
        assert_eq!(value["data"]["orderNumber"], "ORD-1");
        assert!(value["timestamp"].is_string());

        let value = serde_json::to_value(ServerMessage::Subscribed { rooms: vec!["staff".into()] }).unwrap();
        assert_eq!(value["type"], "subscribed");
        assert_eq!(value["payload"][0], "staff");

        let value = serde_json::to_value(ServerMessage::error("FORBIDDEN_ROOM", "nope")).unwrap();
        assert_eq!(value["code"], "FORBIDDEN_ROOM");

        let value = serde_json::to_value(ServerMessage::shutdown("restart", Some(5))).unwrap();
        assert_eq!(value["type"], "shutdown");
        assert_eq!(value["reconnect_after_seconds"], 5);
    }
}
