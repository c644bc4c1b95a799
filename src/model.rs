use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a row in the message table. The store may hand out either
/// integers or strings (e.g. UUIDs); both are passed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// One inbound text message and its (possibly absent) derived text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub body: String,
    pub body_processed: Option<String>,
}

impl Record {
    pub fn is_processed(&self) -> bool {
        self.body_processed.is_some()
    }
}

/// Row returned by the `get_latest_sms` remote procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub body_processed: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LatestMessage {
    /// The processed text, or `(leeg)` when the row has none.
    pub fn display_body(&self) -> &str {
        self.body_processed.as_deref().unwrap_or("(leeg)")
    }

    /// Timestamp rendered in local time, `onbekend` when missing. Values the
    /// parser does not understand are shown as stored.
    pub fn display_timestamp(&self) -> String {
        match self.timestamp.as_deref() {
            None => "onbekend".to_string(),
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => ts
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                Err(_) => raw.to_string(),
            },
        }
    }
}
