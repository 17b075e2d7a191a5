use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::StoryApiConfig;
use crate::error::{parse_error_message, StoryApiError};
use crate::url::{continue_story_url, generate_image_url, start_story_url};

/// Query parameter carrying the segment text for image generation.
pub const IMAGE_QUERY_PARAM: &str = "story_at_current_timestep";

/// Body of `POST continue-story`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinueStoryRequest {
    pub story_context: String,
    pub user_input: String,
}

/// Response of `POST start-story` and `POST continue-story`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryResponse {
    pub story_text: String,
}

/// Async transport client for the storytelling API service.
#[derive(Debug)]
pub struct StoryApiClient {
    http: Client,
    config: StoryApiConfig,
}

impl StoryApiClient {
    pub fn new(config: StoryApiConfig) -> Result<Self, StoryApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder.build().map_err(StoryApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &StoryApiConfig {
        &self.config
    }

    fn extra_headers(&self) -> Result<HeaderMap, StoryApiError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    StoryApiError::InvalidBaseUrl(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(value).map_err(|_| {
                    StoryApiError::InvalidBaseUrl(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(headers)
    }

    pub fn build_start_story_request(&self) -> Result<reqwest::RequestBuilder, StoryApiError> {
        Ok(self
            .http
            .post(start_story_url(&self.config.base_url))
            .headers(self.extra_headers()?))
    }

    pub fn build_continue_story_request(
        &self,
        request: &ContinueStoryRequest,
    ) -> Result<reqwest::RequestBuilder, StoryApiError> {
        Ok(self
            .http
            .post(continue_story_url(&self.config.base_url))
            .headers(self.extra_headers()?)
            .json(request))
    }

    pub fn build_generate_image_request(
        &self,
        segment_text: &str,
    ) -> Result<reqwest::RequestBuilder, StoryApiError> {
        Ok(self
            .http
            .get(generate_image_url(&self.config.base_url))
            .headers(self.extra_headers()?)
            .query(&[(IMAGE_QUERY_PARAM, segment_text)]))
    }

    pub async fn start_story(&self) -> Result<String, StoryApiError> {
        let response = self.build_start_story_request()?.send().await?;
        let response = check_status(response).await?;
        let payload: StoryResponse = response.json().await?;
        Ok(payload.story_text)
    }

    pub async fn continue_story(
        &self,
        story_context: &str,
        user_input: &str,
    ) -> Result<String, StoryApiError> {
        let request = ContinueStoryRequest {
            story_context: story_context.to_string(),
            user_input: user_input.to_string(),
        };
        let response = self.build_continue_story_request(&request)?.send().await?;
        let response = check_status(response).await?;
        let payload: StoryResponse = response.json().await?;
        Ok(payload.story_text)
    }

    pub async fn generate_image(&self, segment_text: &str) -> Result<Vec<u8>, StoryApiError> {
        let response = self.build_generate_image_request(segment_text)?.send().await?;
        let response = check_status(response).await?;
        let payload = response.bytes().await?;
        if payload.is_empty() {
            return Err(StoryApiError::EmptyImagePayload);
        }
        Ok(payload.to_vec())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoryApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(StoryApiError::Status(status, parse_error_message(status, &body)))
}
