use story_backend_http::url::{
    continue_story_url, generate_image_url, normalize_base_url, start_story_url,
    DEFAULT_STORY_BASE_URL,
};

#[test]
fn empty_or_blank_base_url_falls_back_to_default() {
    assert_eq!(normalize_base_url(""), DEFAULT_STORY_BASE_URL);
    assert_eq!(normalize_base_url("   "), DEFAULT_STORY_BASE_URL);
}

#[test]
fn trailing_slashes_and_whitespace_are_dropped() {
    assert_eq!(normalize_base_url(" http://host:9000/ "), "http://host:9000");
    assert_eq!(normalize_base_url("http://host:9000///"), "http://host:9000");
}

#[test]
fn endpoint_joiners_build_service_paths() {
    assert_eq!(
        start_story_url("http://localhost:8000"),
        "http://localhost:8000/start-story"
    );
    assert_eq!(
        continue_story_url("http://localhost:8000/"),
        "http://localhost:8000/continue-story"
    );
    assert_eq!(
        generate_image_url("http://localhost:8000"),
        "http://localhost:8000/generate-image-pipeline"
    );
}
