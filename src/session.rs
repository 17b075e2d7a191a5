use std::sync::Arc;

use crate::error::SessionError;
use crate::image_sync::{ImageArtifact, ImageSynchronizer};
use crate::ledger::{Segment, StoryLedger};

pub type RequestId = u64;

/// Session phase machine. `Failed` is reached only by initialization failure;
/// a failed continuation returns the session to `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initializing { request_id: RequestId },
    Ready,
    Continuing { request_id: RequestId },
    Failed(String),
}

/// Snapshot published to the renderer after every state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub ledger_view: Vec<String>,
    pub input_draft: String,
    pub visible: bool,
    pub image: Option<Arc<ImageArtifact>>,
    pub busy: bool,
    pub last_error: Option<String>,
}

/// Operations the session delegates to its runtime host.
///
/// Starting a backend call hands work to a worker; the host returns the
/// request identifier the session uses to match completion events against
/// the in-flight request.
pub trait SessionHost {
    fn start_story(&mut self) -> Result<RequestId, String>;
    fn start_continuation(&mut self, context: String, user_input: String)
        -> Result<RequestId, String>;
}

/// Session Synchronization Controller state.
///
/// Owns the story ledger, the image synchronizer, the input draft, and the
/// visibility flag. All mutation happens through these methods, which the
/// runtime invokes from its serialized section only. Continuation requests
/// are serialized here: only one text request is ever in flight, so ledger
/// appends occur strictly in request-initiation order.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    ledger: StoryLedger,
    images: ImageSynchronizer,
    input_draft: String,
    visible: bool,
    last_error: Option<SessionError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            ledger: StoryLedger::new(),
            images: ImageSynchronizer::new(),
            input_draft: String::new(),
            visible: true,
            last_error: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub fn ledger(&self) -> &StoryLedger {
        &self.ledger
    }

    #[must_use]
    pub fn images(&self) -> &ImageSynchronizer {
        &self.images
    }

    #[must_use]
    pub fn input_draft(&self) -> &str {
        &self.input_draft
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Pure visibility toggle driven by hover enter/leave. Always allowed.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Replaces the input draft (textarea binding). Always allowed.
    pub fn on_input_replace(&mut self, text: String) {
        self.input_draft = text;
    }

    /// Starts a fresh story. Valid from `Idle` and from `Failed`, which is
    /// how an external caller retries after an initialization failure.
    pub fn on_initialize(&mut self, host: &mut dyn SessionHost) {
        if !matches!(self.phase, Phase::Idle | Phase::Failed(_)) {
            return;
        }

        match host.start_story() {
            Ok(request_id) => {
                self.phase = Phase::Initializing { request_id };
                self.last_error = None;
            }
            Err(error) => {
                self.phase = Phase::Failed(error.clone());
                self.last_error = Some(SessionError::Initialization(error));
            }
        }
    }

    /// Submits the current input draft as a continuation.
    ///
    /// Valid only from `Ready`; any other phase rejects the call as a no-op,
    /// which is the serialization gate. Whitespace-only input is a no-op, not
    /// an error. The generation context is captured from the ledger *before*
    /// the call is issued, so it cannot be altered by anything that happens
    /// while the request is in flight. The draft is kept until the
    /// continuation succeeds, so a failure leaves it available to resubmit.
    pub fn on_submit(&mut self, host: &mut dyn SessionHost) {
        if self.phase != Phase::Ready {
            return;
        }

        let user_input = self.input_draft.trim().to_string();
        if user_input.is_empty() {
            return;
        }

        let context = self.ledger.joined_context();
        match host.start_continuation(context, user_input) {
            Ok(request_id) => {
                self.phase = Phase::Continuing { request_id };
            }
            Err(error) => {
                self.last_error = Some(SessionError::Continuation(error));
            }
        }
    }

    /// Applies a successful `start_story` completion. Returns the opening
    /// segment so the runtime can issue its image request; an event carrying
    /// a request id other than the in-flight one is ignored entirely.
    pub fn on_story_started(&mut self, request_id: RequestId, text: String) -> Option<Segment> {
        if !self.is_initializing(request_id) {
            return None;
        }

        let segment = self.ledger.append(text).clone();
        self.images.begin_request(segment.index);
        self.phase = Phase::Ready;
        self.last_error = None;
        Some(segment)
    }

    /// Applies a failed `start_story` completion.
    pub fn on_story_start_failed(&mut self, request_id: RequestId, error: &str) {
        if !self.is_initializing(request_id) {
            return;
        }

        self.phase = Phase::Failed(error.to_string());
        self.last_error = Some(SessionError::Initialization(error.to_string()));
    }

    /// Applies a successful `continue_story` completion: appends the segment,
    /// clears the draft, and returns the new segment for its image request.
    /// Stale completions are ignored.
    pub fn on_continuation_finished(
        &mut self,
        request_id: RequestId,
        text: String,
    ) -> Option<Segment> {
        if !self.is_continuing(request_id) {
            return None;
        }

        let segment = self.ledger.append(text).clone();
        self.images.begin_request(segment.index);
        self.input_draft.clear();
        self.phase = Phase::Ready;
        self.last_error = None;
        Some(segment)
    }

    /// Applies a failed `continue_story` completion. The ledger and the input
    /// draft are untouched; the session returns to `Ready` for resubmission.
    pub fn on_continuation_failed(&mut self, request_id: RequestId, error: &str) {
        if !self.is_continuing(request_id) {
            return;
        }

        self.phase = Phase::Ready;
        self.last_error = Some(SessionError::Continuation(error.to_string()));
    }

    /// Applies an arrived image artifact through the latest-wins index check.
    /// Returns false when the result was superseded and discarded.
    pub fn on_image_ready(&mut self, artifact: ImageArtifact) -> bool {
        let index = artifact.for_index;
        self.images.apply_if_current(index, artifact)
    }

    /// Applies an image failure. Non-fatal: the narrative and any prior image
    /// are unaffected. A stale failure is discarded without surfacing.
    pub fn on_image_failed(&mut self, for_index: usize, error: &str) {
        if !self.images.note_failure(for_index) {
            return;
        }

        self.last_error = Some(SessionError::Image {
            index: for_index,
            message: error.to_string(),
        });
    }

    /// Builds the renderer-facing snapshot for the explicit publish step.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        SessionState {
            ledger_view: self.ledger.snapshot(),
            input_draft: self.input_draft.clone(),
            visible: self.visible,
            image: self.images.active().cloned(),
            busy: matches!(
                self.phase,
                Phase::Initializing { .. } | Phase::Continuing { .. }
            ),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    fn is_initializing(&self, request_id: RequestId) -> bool {
        matches!(self.phase, Phase::Initializing { request_id: active } if active == request_id)
    }

    fn is_continuing(&self, request_id: RequestId) -> bool {
        matches!(self.phase, Phase::Continuing { request_id: active } if active == request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, RequestId, Session, SessionHost};

    #[derive(Default)]
    struct HostSpy {
        next_request_id: RequestId,
        started_stories: usize,
        started_continuations: Vec<(String, String)>,
        fail_with: Option<String>,
    }

    impl SessionHost for HostSpy {
        fn start_story(&mut self) -> Result<RequestId, String> {
            if let Some(error) = self.fail_with.clone() {
                return Err(error);
            }
            self.started_stories += 1;
            Ok(self.next_request_id)
        }

        fn start_continuation(
            &mut self,
            context: String,
            user_input: String,
        ) -> Result<RequestId, String> {
            if let Some(error) = self.fail_with.clone() {
                return Err(error);
            }
            self.started_continuations.push((context, user_input));
            Ok(self.next_request_id)
        }
    }

    fn ready_session(opening: &str) -> Session {
        let mut session = Session::new();
        let mut host = HostSpy {
            next_request_id: 1,
            ..HostSpy::default()
        };
        session.on_initialize(&mut host);
        assert!(session.on_story_started(1, opening.to_string()).is_some());
        session
    }

    #[test]
    fn initialize_is_rejected_outside_idle_and_failed() {
        let mut session = ready_session("opening");
        let mut host = HostSpy::default();

        session.on_initialize(&mut host);

        assert_eq!(host.started_stories, 0);
        assert_eq!(*session.phase(), Phase::Ready);
    }

    #[test]
    fn failed_initialize_can_be_retried() {
        let mut session = Session::new();
        let mut failing = HostSpy {
            fail_with: Some("unreachable".to_string()),
            ..HostSpy::default()
        };

        session.on_initialize(&mut failing);
        assert_eq!(*session.phase(), Phase::Failed("unreachable".to_string()));

        let mut host = HostSpy {
            next_request_id: 2,
            ..HostSpy::default()
        };
        session.on_initialize(&mut host);
        assert_eq!(*session.phase(), Phase::Initializing { request_id: 2 });
        assert!(session.last_error().is_none());
    }

    #[test]
    fn submit_captures_context_before_the_call() {
        let mut session = ready_session("Once upon a time.");
        let mut host = HostSpy {
            next_request_id: 7,
            ..HostSpy::default()
        };

        session.on_input_replace("a dragon appears".to_string());
        session.on_submit(&mut host);

        assert_eq!(
            host.started_continuations,
            vec![(
                "Once upon a time.".to_string(),
                "a dragon appears".to_string()
            )]
        );
        assert_eq!(*session.phase(), Phase::Continuing { request_id: 7 });
        // draft is preserved until the continuation succeeds
        assert_eq!(session.input_draft(), "a dragon appears");
    }

    #[test]
    fn whitespace_only_input_is_a_noop() {
        let mut session = ready_session("opening");
        let mut host = HostSpy::default();

        session.on_input_replace("   \n\t".to_string());
        session.on_submit(&mut host);

        assert!(host.started_continuations.is_empty());
        assert_eq!(*session.phase(), Phase::Ready);
        assert_eq!(session.ledger().len(), 1);
    }

    #[test]
    fn submit_while_continuing_is_rejected() {
        let mut session = ready_session("opening");
        let mut host = HostSpy {
            next_request_id: 7,
            ..HostSpy::default()
        };

        session.on_input_replace("first".to_string());
        session.on_submit(&mut host);
        session.on_input_replace("second".to_string());
        session.on_submit(&mut host);

        assert_eq!(host.started_continuations.len(), 1);
        assert_eq!(*session.phase(), Phase::Continuing { request_id: 7 });
    }

    #[test]
    fn stale_completion_events_are_ignored() {
        let mut session = ready_session("opening");
        let mut host = HostSpy {
            next_request_id: 7,
            ..HostSpy::default()
        };

        session.on_input_replace("go on".to_string());
        session.on_submit(&mut host);

        assert!(session.on_continuation_finished(99, "stale".to_string()).is_none());
        session.on_continuation_failed(99, "stale error");

        assert_eq!(*session.phase(), Phase::Continuing { request_id: 7 });
        assert_eq!(session.ledger().len(), 1);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn failed_continuation_keeps_ledger_and_draft() {
        let mut session = ready_session("opening");
        let mut host = HostSpy {
            next_request_id: 7,
            ..HostSpy::default()
        };

        session.on_input_replace("go on".to_string());
        session.on_submit(&mut host);
        session.on_continuation_failed(7, "HTTP 500");

        assert_eq!(*session.phase(), Phase::Ready);
        assert_eq!(session.ledger().len(), 1);
        assert_eq!(session.input_draft(), "go on");
        assert!(session.last_error().is_some());
    }

    #[test]
    fn successful_continuation_clears_draft_and_requests_image() {
        let mut session = ready_session("opening");
        let mut host = HostSpy {
            next_request_id: 7,
            ..HostSpy::default()
        };

        session.on_input_replace("go on".to_string());
        session.on_submit(&mut host);
        let segment = session
            .on_continuation_finished(7, "And so it went.".to_string())
            .expect("in-flight continuation applies");

        assert_eq!(segment.index, 1);
        assert_eq!(session.input_draft(), "");
        assert_eq!(*session.phase(), Phase::Ready);
        assert_eq!(session.images().pending_request_index(), Some(1));
    }

    #[test]
    fn snapshot_reports_busy_while_a_request_is_in_flight() {
        let mut session = Session::new();
        let mut host = HostSpy {
            next_request_id: 1,
            ..HostSpy::default()
        };

        assert!(!session.snapshot().busy);
        session.on_initialize(&mut host);
        assert!(session.snapshot().busy);
        session.on_story_started(1, "opening".to_string());
        assert!(!session.snapshot().busy);
    }
}
