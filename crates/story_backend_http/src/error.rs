use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug)]
pub enum StoryApiError {
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Decode(serde_json::Error),
    EmptyImagePayload,
}

impl fmt::Display for StoryApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Decode(error) => write!(f, "response decode failure: {error}"),
            Self::EmptyImagePayload => write!(f, "image response carried an empty payload"),
        }
    }
}

impl std::error::Error for StoryApiError {}

impl From<reqwest::Error> for StoryApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<serde_json::Error> for StoryApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error)
    }
}

/// Extracts a human-readable message from a FastAPI-style error body.
///
/// The service reports errors as `{"detail": "..."}`; validation errors carry
/// `{"detail": [{"msg": "...", ...}, ...]}` instead. Anything unparseable
/// falls back to the raw body or the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let parsed: Value = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) => return fallback(),
    };

    match parsed.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                fallback()
            } else {
                messages.join("; ")
            }
        }
        _ => fallback(),
    }
}
