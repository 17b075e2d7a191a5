use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_STORY_BASE_URL;

/// Transport configuration for storytelling API requests.
///
/// One timeout policy bounds text and image requests alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryApiConfig {
    /// Base URL for the storytelling service endpoints.
    pub base_url: String,
    /// Optional request timeout applied to every call.
    pub timeout: Option<Duration>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into every request.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for StoryApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORY_BASE_URL.to_string(),
            timeout: None,
            user_agent: None,
            extra_headers: BTreeMap::new(),
        }
    }
}

impl StoryApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
