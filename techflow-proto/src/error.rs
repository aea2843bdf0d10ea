//! Error payloads returned by the service.
//!
//! The service is not consistent about how it reports failures. Bodies seen
//! in practice are a bare string, an object with `message`, `error`, or
//! `detail`, or an array of validation errors. [`ServerError`] names each
//! shape and keeps an explicit fallback for anything else.

use serde_json::Value;

/// A parsed error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// The body was a plain string, or not JSON at all.
    Text(String),
    /// `{"message": "..."}`
    Message(String),
    /// `{"error": "..."}`
    Error(String),
    /// `{"detail": "..."}`
    Detail(String),
    /// An array of errors, one rendered line per item.
    List(Vec<String>),
    /// Any other JSON value.
    Other(Value),
}

impl ServerError {
    /// Parses a raw response body. Non-JSON bodies become [`ServerError::Text`].
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<Value>(body)
            .map_or_else(|_| Self::Text(body.trim().to_string()), Self::from_value)
    }

    /// Classifies a JSON error value.
    ///
    /// Object fields are probed in the order `message`, `error`, `detail`;
    /// a field only counts when it holds a string.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.iter().map(item_message).collect()),
            Value::Object(map) => {
                if let Some(Value::String(m)) = map.get("message") {
                    Self::Message(m.clone())
                } else if let Some(Value::String(e)) = map.get("error") {
                    Self::Error(e.clone())
                } else if let Some(Value::String(d)) = map.get("detail") {
                    Self::Detail(d.clone())
                } else {
                    Self::Other(Value::Object(map))
                }
            }
            other => Self::Other(other),
        }
    }

    /// Best-effort human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Text(text)
            | Self::Message(text)
            | Self::Error(text)
            | Self::Detail(text) => text.clone(),
            Self::List(lines) => lines.join("\n"),
            Self::Other(value) => value.to_string(),
        }
    }

    /// Returns `true` if there is nothing worth showing to a user.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Other(Value::Null) => true,
            Self::List(lines) => lines.is_empty(),
            _ => self.message().trim().is_empty(),
        }
    }
}

fn item_message(item: &Value) -> String {
    match item.get("message") {
        Some(Value::String(m)) => m.clone(),
        _ => item.to_string(),
    }
}
