use std::sync::Arc;

use time::OffsetDateTime;

/// Illustration produced by the backend for one ledger position.
///
/// Published to renderers as `Arc<ImageArtifact>`; when the synchronizer
/// supersedes an artifact it drops its handle, so the blob is freed as soon
/// as the last subscriber lets go of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub for_index: usize,
    pub data: Vec<u8>,
    pub created_at: OffsetDateTime,
}

impl ImageArtifact {
    #[must_use]
    pub fn new(for_index: usize, data: Vec<u8>) -> Self {
        Self {
            for_index,
            data,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Binds at most one in-flight image request to a ledger position and
/// discards results that arrive for a position that is no longer current.
///
/// Image generation latency is independent of and typically longer than text
/// generation latency, so a result must be checked against the latest
/// requested index at resolution time, not merely "did this call resolve".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageSynchronizer {
    current_index: Option<usize>,
    pending_request_index: Option<usize>,
    active: Option<Arc<ImageArtifact>>,
}

impl ImageSynchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the ledger position of the newest image request. Any older
    /// outstanding request is superseded from this point on.
    pub fn begin_request(&mut self, index: usize) {
        self.pending_request_index = Some(index);
    }

    /// Applies an arrived artifact when it answers the latest request,
    /// releasing the previously active artifact first. Returns false and
    /// discards the artifact when a newer request has been issued since.
    pub fn apply_if_current(&mut self, index: usize, artifact: ImageArtifact) -> bool {
        if self.pending_request_index != Some(index) {
            return false;
        }

        // Release the superseded handle before storing the replacement.
        drop(self.active.take());
        self.active = Some(Arc::new(artifact));
        self.current_index = Some(index);
        self.pending_request_index = None;
        true
    }

    /// Records a failed image request. The last successfully applied artifact
    /// persists. Returns true when the failure belongs to the latest request
    /// (a stale failure is silently discarded).
    pub fn note_failure(&mut self, index: usize) -> bool {
        if self.pending_request_index != Some(index) {
            return false;
        }

        self.pending_request_index = None;
        true
    }

    /// Returns the ledger position of the active artifact, if any.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Returns the position awaiting an image result, if any.
    #[must_use]
    pub fn pending_request_index(&self) -> Option<usize> {
        self.pending_request_index
    }

    /// Returns the active artifact handle, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Arc<ImageArtifact>> {
        self.active.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageArtifact, ImageSynchronizer};

    fn artifact(index: usize, byte: u8) -> ImageArtifact {
        ImageArtifact::new(index, vec![byte; 4])
    }

    #[test]
    fn applied_artifact_matches_current_index() {
        let mut sync = ImageSynchronizer::new();
        sync.begin_request(0);

        assert!(sync.apply_if_current(0, artifact(0, 1)));
        assert_eq!(sync.current_index(), Some(0));
        assert_eq!(sync.active().unwrap().for_index, 0);
        assert_eq!(sync.pending_request_index(), None);
    }

    #[test]
    fn reversed_resolution_order_keeps_latest_request() {
        let mut sync = ImageSynchronizer::new();
        sync.begin_request(0);
        sync.begin_request(1);

        // index 1 resolves first, then the stale index-0 result arrives
        assert!(sync.apply_if_current(1, artifact(1, 2)));
        assert!(!sync.apply_if_current(0, artifact(0, 1)));

        assert_eq!(sync.current_index(), Some(1));
        assert_eq!(sync.active().unwrap().for_index, 1);
    }

    #[test]
    fn stale_result_never_regresses_current_index() {
        let mut sync = ImageSynchronizer::new();
        sync.begin_request(0);
        sync.begin_request(1);

        // index 1 has not resolved; the stale index-0 result must not apply
        assert!(!sync.apply_if_current(0, artifact(0, 1)));
        assert_eq!(sync.current_index(), None);
        assert!(sync.active().is_none());
        assert_eq!(sync.pending_request_index(), Some(1));
    }

    #[test]
    fn applying_replaces_superseded_artifact() {
        let mut sync = ImageSynchronizer::new();
        sync.begin_request(0);
        assert!(sync.apply_if_current(0, artifact(0, 1)));
        let first = sync.active().unwrap().clone();

        sync.begin_request(1);
        assert!(sync.apply_if_current(1, artifact(1, 2)));

        assert_eq!(sync.active().unwrap().for_index, 1);
        // the synchronizer no longer holds the superseded artifact
        assert_eq!(std::sync::Arc::strong_count(&first), 1);
    }

    #[test]
    fn failure_leaves_active_artifact_unchanged() {
        let mut sync = ImageSynchronizer::new();
        sync.begin_request(0);
        assert!(sync.apply_if_current(0, artifact(0, 1)));

        sync.begin_request(1);
        assert!(sync.note_failure(1));

        assert_eq!(sync.current_index(), Some(0));
        assert_eq!(sync.active().unwrap().for_index, 0);
        assert_eq!(sync.pending_request_index(), None);
    }

    #[test]
    fn stale_failure_is_discarded() {
        let mut sync = ImageSynchronizer::new();
        sync.begin_request(0);
        sync.begin_request(1);

        assert!(!sync.note_failure(0));
        assert_eq!(sync.pending_request_index(), Some(1));
    }
}
