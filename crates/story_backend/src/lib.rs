//! Minimal backend-neutral contract for story and image generation calls.
//!
//! This crate intentionally defines only the three remote operations a
//! storytelling session depends on. It excludes transport details, wire
//! payloads, and session orchestration concerns.

use std::fmt;

/// Error returned by a backend operation.
///
/// Backends are opaque and potentially remote; failures are carried as a
/// plain message so callers can surface them without depending on any
/// transport crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Creates a new backend error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BackendError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Backend interface for the three remote generation operations.
///
/// Implementations may block; the session runtime invokes these from worker
/// threads, never from the serialized session section itself.
pub trait StoryBackend: Send + Sync + 'static {
    /// Generates the opening of a fresh story.
    fn start_story(&self) -> Result<String, BackendError>;

    /// Generates the next story segment from the accumulated context and the
    /// latest user input.
    fn continue_story(&self, context: &str, user_input: &str) -> Result<String, BackendError>;

    /// Generates an illustrative image for one segment's text.
    fn generate_image(&self, segment_text: &str) -> Result<Vec<u8>, BackendError>;
}
