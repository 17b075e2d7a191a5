/// Default base URL for the storytelling API service.
pub const DEFAULT_STORY_BASE_URL: &str = "http://localhost:8000";

/// Normalize a base URL: empty input falls back to the default, surrounding
/// whitespace and trailing slashes are dropped.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_STORY_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// Endpoint for `POST start-story`.
pub fn start_story_url(base_url: &str) -> String {
    format!("{}/start-story", normalize_base_url(base_url))
}

/// Endpoint for `POST continue-story`.
pub fn continue_story_url(base_url: &str) -> String {
    format!("{}/continue-story", normalize_base_url(base_url))
}

/// Endpoint for `GET generate-image-pipeline` (segment text travels in the
/// `story_at_current_timestep` query parameter, added by the client).
pub fn generate_image_url(base_url: &str) -> String {
    format!("{}/generate-image-pipeline", normalize_base_url(base_url))
}
