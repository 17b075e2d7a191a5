use thiserror::Error;

/// Session-level failure surfaced to the renderer as state, never as a panic.
///
/// Backend failures are caught at the session boundary and converted into a
/// phase transition plus one of these values in the published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// `start_story` failed; the session cannot proceed without an external
    /// `initialize` retry.
    #[error("failed to start story: {0}")]
    Initialization(String),

    /// `continue_story` failed; the session stays usable and the input draft
    /// is preserved for resubmission.
    #[error("failed to continue story: {0}")]
    Continuation(String),

    /// `generate_image` failed; non-fatal, the narrative is unaffected and
    /// any prior image is retained.
    #[error("failed to generate image for segment {index}: {message}")]
    Image { index: usize, message: String },
}
