//! HTTP transport for the shared `story_backend` contract.
//!
//! This crate owns request building and response parsing for the storytelling
//! API service only. It contains no session orchestration and no rendering
//! coupling. Wire contract:
//!
//! - `POST {base}/start-story` -> `{ "story_text": string }`
//! - `POST {base}/continue-story` with `{ "story_context", "user_input" }`
//!   -> `{ "story_text": string }`
//! - `GET {base}/generate-image-pipeline?story_at_current_timestep=<text>`
//!   -> binary image payload

pub mod client;
pub mod config;
pub mod error;
pub mod url;

use std::future::Future;

pub use client::{ContinueStoryRequest, StoryApiClient, StoryResponse, IMAGE_QUERY_PARAM};
pub use config::StoryApiConfig;
pub use error::StoryApiError;
pub use url::{normalize_base_url, DEFAULT_STORY_BASE_URL};

use story_backend::{BackendError, StoryBackend};

/// `StoryBackend` adapter over the async [`StoryApiClient`].
///
/// The contract's operations block; each call drives the async client on a
/// fresh current-thread tokio runtime, so callers need no runtime of their
/// own.
#[derive(Debug)]
pub struct HttpStoryBackend {
    client: StoryApiClient,
}

impl HttpStoryBackend {
    pub fn new(config: StoryApiConfig) -> Result<Self, BackendError> {
        let client = StoryApiClient::new(config).map_err(map_backend_error)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &StoryApiClient {
        &self.client
    }
}

impl StoryBackend for HttpStoryBackend {
    fn start_story(&self) -> Result<String, BackendError> {
        block_on_current_thread(self.client.start_story())?.map_err(map_backend_error)
    }

    fn continue_story(&self, context: &str, user_input: &str) -> Result<String, BackendError> {
        block_on_current_thread(self.client.continue_story(context, user_input))?
            .map_err(map_backend_error)
    }

    fn generate_image(&self, segment_text: &str) -> Result<Vec<u8>, BackendError> {
        block_on_current_thread(self.client.generate_image(segment_text))?
            .map_err(map_backend_error)
    }
}

fn block_on_current_thread<F: Future>(future: F) -> Result<F::Output, BackendError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            BackendError::new(format!("failed to initialize tokio runtime: {error}"))
        })?;

    Ok(runtime.block_on(future))
}

fn map_backend_error(error: StoryApiError) -> BackendError {
    BackendError::new(error.to_string())
}
