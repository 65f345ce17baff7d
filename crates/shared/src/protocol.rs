use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action `type` tags as they appear in serialized envelopes.
pub mod action_types {
    pub const ON_CHANGE: &str = "ON_CHANGE";
    pub const ON_PHOTO_CHANGE: &str = "ON_PHOTO_CHANGE";
    pub const ON_FULLTIME_CHANGE: &str = "ON_FULLTIME_CHANGE";
    pub const ON_ERROR: &str = "ON_ERROR";
    pub const ON_EMPLOYEE_RECEIVED: &str = "ON_EMPLOYEE_RECEIVED";
    pub const ON_EMPLOYEE_HIRED: &str = "ON_EMPLOYEE_HIRED";
    pub const ON_EMPLOYEE_FIRED: &str = "ON_EMPLOYEE_FIRED";
    pub const ON_EMPLOYEE_UPDATED: &str = "ON_EMPLOYEE_UPDATED";
    pub const ON_EMPLOYEES_LISTED: &str = "ON_EMPLOYEES_LISTED";
}

/// Wire-shaped action: `{"type": ..., "value": ..., "name": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ActionEnvelope {
    pub fn new(kind: impl Into<String>, value: Value) -> Self {
        Self {
            kind: kind.into(),
            value,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Body the HR API returns for hire/update and for most failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusMessage {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    Connect,
    Disconnect,
    Welcome,
    PongClient,
    Fire,
    Hire,
    Update,
    Other(String),
}

impl EventName {
    pub const KNOWN: [EventName; 7] = [
        EventName::Connect,
        EventName::Disconnect,
        EventName::Welcome,
        EventName::PongClient,
        EventName::Fire,
        EventName::Hire,
        EventName::Update,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventName::Connect => "connect",
            EventName::Disconnect => "disconnect",
            EventName::Welcome => "welcome",
            EventName::PongClient => "pong_client",
            EventName::Fire => "fire",
            EventName::Hire => "hire",
            EventName::Update => "update",
            EventName::Other(name) => name,
        }
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        match name {
            "connect" => EventName::Connect,
            "disconnect" => EventName::Disconnect,
            "welcome" => EventName::Welcome,
            "pong_client" => EventName::PongClient,
            "fire" => EventName::Fire,
            "hire" => EventName::Hire,
            "update" => EventName::Update,
            other => EventName::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound event from the push channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub name: EventName,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_type_tag_and_omits_missing_name() {
        let envelope = ActionEnvelope::new(action_types::ON_ERROR, Value::from("boom"));
        assert_eq!(
            serde_json::to_value(&envelope).expect("json"),
            serde_json::json!({ "type": "ON_ERROR", "value": "boom" })
        );

        let parsed: ActionEnvelope = serde_json::from_value(serde_json::json!({
            "type": "ON_CHANGE",
            "name": "identity",
            "value": "123"
        }))
        .expect("envelope");
        assert_eq!(parsed.name.as_deref(), Some("identity"));
    }

    #[test]
    fn status_message_ok_matches_exact_api_value() {
        let ok: StatusMessage =
            serde_json::from_str(r#"{"status":"ok","message":"Employee updated"}"#).expect("json");
        assert!(ok.is_ok());
        let upper: StatusMessage = serde_json::from_str(r#"{"status":"OK"}"#).expect("json");
        assert!(!upper.is_ok());
        let fail: StatusMessage = serde_json::from_str(r#"{"status":"not_found"}"#).expect("json");
        assert!(!fail.is_ok());
    }

    #[test]
    fn event_names_map_known_and_other() {
        for name in EventName::KNOWN {
            assert_eq!(EventName::from(name.as_str()), name);
        }
        assert_eq!(
            EventName::from("something_else"),
            EventName::Other("something_else".to_string())
        );
    }
}
