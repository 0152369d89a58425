use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Message shown when the backend gives no usable error text.
pub const GENERIC_FAILURE: &str = "Request failed";

/// Ordered field-level validation messages (first entry is the one shown inline).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Keeps the first message per field.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field.to_string(), message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn first(&self) -> Option<(&str, &str)> {
        self.0.first().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// Converts `validator` output, ordering fields as listed in `order`.
    pub fn from_validation(errors: &validator::ValidationErrors, order: &[&str]) -> Self {
        let mut out = Self::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.push(field, message);
            }
        }
        out.ordered(order)
    }

    /// Sorts entries by their position in `order`; unknown fields go last.
    pub fn ordered(mut self, order: &[&str]) -> Self {
        self.0
            .sort_by_key(|(f, _)| order.iter().position(|o| o == f).unwrap_or(usize::MAX));
        self
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.push(&field, message);
        }
    }

    pub fn into_result(self) -> Result<(), ClientError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some((field, message)) => write!(f, "{}: {}", field, message),
            None => f.write_str("invalid input"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("another request for this item is still running")]
    Busy,
}

impl ClientError {
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Text for a notification. Backend messages pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(fields) => fields
                .first()
                .map(|(_, m)| m.to_string())
                .unwrap_or_else(|| "Please check the form".into()),
            Self::Unauthorized(m) | Self::Api { message: m, .. } => m.clone(),
            Self::Transport(_) | Self::Decode(_) => GENERIC_FAILURE.into(),
            Self::Timeout => "Request timed out".into(),
            Self::Upload(m) => format!("Upload failed: {}", m),
            Self::Busy => "Please wait for the previous action to finish".into(),
        }
    }

    /// Stable key used to coalesce repeated notifications.
    pub fn dedup_key(&self) -> String {
        match self {
            Self::Validation(fields) => format!(
                "validation:{}",
                fields.first().map(|(f, _)| f).unwrap_or_default()
            ),
            Self::Unauthorized(_) => "unauthorized".into(),
            Self::Api { status, message } => format!("api:{}:{}", status, message),
            Self::Transport(_) | Self::Decode(_) => "transport".into(),
            Self::Timeout => "timeout".into(),
            Self::Upload(_) => "upload".into(),
            Self::Busy => "busy".into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Pulls the human message out of an error body (`{"error": "..."}`).
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|k| value.get(*k))
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
