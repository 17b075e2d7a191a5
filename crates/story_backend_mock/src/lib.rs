//! Deterministic mock implementation of the shared `story_backend` contract.
//!
//! This crate contains no transport logic and is intended for local runs and
//! contract-level integration testing. The image delay is deliberately longer
//! than the text delays, reproducing the latency skew the session's image
//! synchronizer exists to reconcile.

use std::thread;
use std::time::Duration;

use story_backend::{BackendError, StoryBackend};

const DEFAULT_OPENING: &str =
    "Once upon a time, in a valley the maps had long stopped naming, you woke to the smell of rain on cold stone.";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Deterministic mock backend used by the demo binary and integration tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockStoryBackend {
    opening: String,
    start_delay: Duration,
    continue_delay: Duration,
    image_delay: Duration,
}

impl MockStoryBackend {
    const START_DELAY_MS: u64 = 200;
    const CONTINUE_DELAY_MS: u64 = 150;
    const IMAGE_DELAY_MS: u64 = 450;

    /// Creates a mock backend with the default opening and delays.
    #[must_use]
    pub fn new() -> Self {
        Self {
            opening: DEFAULT_OPENING.to_string(),
            start_delay: Duration::from_millis(Self::START_DELAY_MS),
            continue_delay: Duration::from_millis(Self::CONTINUE_DELAY_MS),
            image_delay: Duration::from_millis(Self::IMAGE_DELAY_MS),
        }
    }

    /// Overrides the scripted opening line.
    #[must_use]
    pub fn with_opening(mut self, opening: impl Into<String>) -> Self {
        self.opening = opening.into();
        self
    }

    /// Overrides all delays; `Duration::ZERO` makes runs fully synchronous,
    /// which deterministic tests rely on.
    #[must_use]
    pub fn with_delays(mut self, start: Duration, continuation: Duration, image: Duration) -> Self {
        self.start_delay = start;
        self.continue_delay = continuation;
        self.image_delay = image;
        self
    }

    /// Deterministic continuation text derived from the user input.
    #[must_use]
    pub fn continuation_text(user_input: &str) -> String {
        format!("The story bends to your will: {user_input}.")
    }

    /// Deterministic pseudo-PNG payload derived from the segment text.
    #[must_use]
    pub fn image_bytes(segment_text: &str) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(segment_text.as_bytes());
        data
    }
}

impl Default for MockStoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryBackend for MockStoryBackend {
    fn start_story(&self) -> Result<String, BackendError> {
        thread::sleep(self.start_delay);
        Ok(self.opening.clone())
    }

    fn continue_story(&self, _context: &str, user_input: &str) -> Result<String, BackendError> {
        thread::sleep(self.continue_delay);
        Ok(Self::continuation_text(user_input))
    }

    fn generate_image(&self, segment_text: &str) -> Result<Vec<u8>, BackendError> {
        thread::sleep(self.image_delay);
        Ok(Self::image_bytes(segment_text))
    }
}
