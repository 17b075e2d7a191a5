use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use story_backend::StoryBackend;

use crate::image_sync::ImageArtifact;
use crate::ledger::Segment;
use crate::session::{RequestId, Session, SessionHost, SessionState};

/// Completion event produced by a backend worker, applied to the session
/// inside the runtime's serialized section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StoryStarted { request_id: RequestId, text: String },
    StoryStartFailed { request_id: RequestId, error: String },
    ContinuationFinished { request_id: RequestId, text: String },
    ContinuationFailed { request_id: RequestId, error: String },
    ImageReady { for_index: usize, data: Vec<u8> },
    ImageFailed { for_index: usize, error: String },
}

impl SessionEvent {
    /// Returns the text-request identifier for story events, `None` for
    /// image events (those are matched by ledger position instead).
    fn text_request_id(&self) -> Option<RequestId> {
        match self {
            Self::StoryStarted { request_id, .. }
            | Self::StoryStartFailed { request_id, .. }
            | Self::ContinuationFinished { request_id, .. }
            | Self::ContinuationFailed { request_id, .. } => Some(*request_id),
            Self::ImageReady { .. } | Self::ImageFailed { .. } => None,
        }
    }
}

/// Renderer seam: receives the freshly published snapshot after every state
/// transition. Implementations must not call back into the runtime.
pub trait StateSink: Send + Sync + 'static {
    fn publish(&self, state: SessionState);
}

struct ActiveTextRequest {
    request_id: RequestId,
    join_handle: Option<JoinHandle<()>>,
}

/// Runtime host around the session state machine.
///
/// Owns the backend, runs its blocking calls on named worker threads, and
/// funnels their completions through a pending-event queue into the session
/// under one mutex, which is the serialized section every invariant relies
/// on. After each applied batch a snapshot is published to the sink.
pub struct SessionRuntime {
    session: Arc<Mutex<Session>>,
    backend: Arc<dyn StoryBackend>,
    sink: Arc<dyn StateSink>,
    pending_events: Mutex<VecDeque<SessionEvent>>,
    next_request_id: AtomicU64,
    active_text_request: Mutex<Option<ActiveTextRequest>>,
}

impl SessionRuntime {
    pub fn new(
        session: Arc<Mutex<Session>>,
        backend: Arc<dyn StoryBackend>,
        sink: Arc<dyn StateSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session,
            backend,
            sink,
            pending_events: Mutex::new(VecDeque::new()),
            next_request_id: AtomicU64::new(1),
            active_text_request: Mutex::new(None),
        })
    }

    /// Starts a fresh story (retries are the caller's decision after a
    /// failure). Publishes the resulting state.
    pub fn initialize(self: &Arc<Self>) {
        {
            let mut session = lock_unpoisoned(&self.session);
            let mut host = Arc::clone(self);
            session.on_initialize(&mut host);
        }
        self.publish_state();
    }

    /// Replaces the input draft and submits it as a continuation. The
    /// session's phase gate decides whether a request is actually issued.
    pub fn submit_continuation(self: &Arc<Self>, input: impl Into<String>) {
        {
            let mut session = lock_unpoisoned(&self.session);
            session.on_input_replace(input.into());
            let mut host = Arc::clone(self);
            session.on_submit(&mut host);
        }
        self.publish_state();
    }

    /// Updates the input draft without submitting (textarea binding).
    pub fn set_input_draft(self: &Arc<Self>, input: impl Into<String>) {
        {
            let mut session = lock_unpoisoned(&self.session);
            session.on_input_replace(input.into());
        }
        self.publish_state();
    }

    /// Toggles chat visibility (hover enter/leave). Always allowed.
    pub fn set_visible(self: &Arc<Self>, visible: bool) {
        {
            let mut session = lock_unpoisoned(&self.session);
            session.set_visible(visible);
        }
        self.publish_state();
    }

    /// Drains queued completion events, applies them to the session, and
    /// publishes when anything changed. Workers call this after enqueueing;
    /// headless callers can call it to guarantee queued events are applied.
    pub fn flush_pending_events(self: &Arc<Self>) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        if drained > 0 {
            self.publish_state();
        }

        drained
    }

    fn enqueue_event(self: &Arc<Self>, event: SessionEvent) {
        {
            let mut pending_events = lock_unpoisoned(&self.pending_events);
            pending_events.push_back(event);
        }

        self.flush_pending_events();
    }

    fn apply_event(self: &Arc<Self>, event: SessionEvent) {
        let terminal_text_request = event.text_request_id();

        let appended = {
            let mut session = lock_unpoisoned(&self.session);
            match event {
                SessionEvent::StoryStarted { request_id, text } => {
                    session.on_story_started(request_id, text)
                }
                SessionEvent::StoryStartFailed { request_id, error } => {
                    session.on_story_start_failed(request_id, &error);
                    None
                }
                SessionEvent::ContinuationFinished { request_id, text } => {
                    session.on_continuation_finished(request_id, text)
                }
                SessionEvent::ContinuationFailed { request_id, error } => {
                    session.on_continuation_failed(request_id, &error);
                    None
                }
                SessionEvent::ImageReady { for_index, data } => {
                    // superseded artifacts are discarded here and freed
                    session.on_image_ready(ImageArtifact::new(for_index, data));
                    None
                }
                SessionEvent::ImageFailed { for_index, error } => {
                    session.on_image_failed(for_index, &error);
                    None
                }
            }
        };

        if let Some(request_id) = terminal_text_request {
            self.clear_active_text_request_if_matching(request_id);
        }

        if let Some(segment) = appended {
            self.spawn_image_worker(segment);
        }
    }

    fn publish_state(&self) {
        let state = {
            let session = lock_unpoisoned(&self.session);
            session.snapshot()
        };
        self.sink.publish(state);
    }

    fn start_story_internal(self: &Arc<Self>) -> Result<RequestId, String> {
        let mut active = self.lock_active_text_request();
        if active.is_some() {
            return Err("Text request already active".to_string());
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let runtime = Arc::clone(self);
        let join_handle = thread::Builder::new()
            .name(format!("storyloom-start-{request_id}"))
            .spawn(move || {
                let event = match runtime.backend.start_story() {
                    Ok(text) => SessionEvent::StoryStarted { request_id, text },
                    Err(error) => SessionEvent::StoryStartFailed {
                        request_id,
                        error: error.to_string(),
                    },
                };
                runtime.enqueue_event(event);
            })
            .map_err(|error| format!("Failed to spawn start-story worker: {error}"))?;

        *active = Some(ActiveTextRequest {
            request_id,
            join_handle: Some(join_handle),
        });

        Ok(request_id)
    }

    fn start_continuation_internal(
        self: &Arc<Self>,
        context: String,
        user_input: String,
    ) -> Result<RequestId, String> {
        let mut active = self.lock_active_text_request();
        if active.is_some() {
            return Err("Text request already active".to_string());
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let runtime = Arc::clone(self);
        let join_handle = thread::Builder::new()
            .name(format!("storyloom-continue-{request_id}"))
            .spawn(move || {
                let event = match runtime.backend.continue_story(&context, &user_input) {
                    Ok(text) => SessionEvent::ContinuationFinished { request_id, text },
                    Err(error) => SessionEvent::ContinuationFailed {
                        request_id,
                        error: error.to_string(),
                    },
                };
                runtime.enqueue_event(event);
            })
            .map_err(|error| format!("Failed to spawn continuation worker: {error}"))?;

        *active = Some(ActiveTextRequest {
            request_id,
            join_handle: Some(join_handle),
        });

        Ok(request_id)
    }

    /// Image workers are independent of the text-request gate: several may be
    /// outstanding at once, and the synchronizer's index check is the sole
    /// mechanism re-establishing latest-wins order among their results.
    fn spawn_image_worker(self: &Arc<Self>, segment: Segment) {
        let runtime = Arc::clone(self);
        let for_index = segment.index;
        let spawned = thread::Builder::new()
            .name(format!("storyloom-image-{for_index}"))
            .spawn(move || {
                let event = match runtime.backend.generate_image(&segment.text) {
                    Ok(data) => SessionEvent::ImageReady { for_index, data },
                    Err(error) => SessionEvent::ImageFailed {
                        for_index,
                        error: error.to_string(),
                    },
                };
                runtime.enqueue_event(event);
            });

        if let Err(error) = spawned {
            self.enqueue_event(SessionEvent::ImageFailed {
                for_index,
                error: format!("Failed to spawn image worker: {error}"),
            });
        }
    }

    fn clear_active_text_request_if_matching(&self, request_id: RequestId) {
        let mut active = self.lock_active_text_request();
        let matches = active.as_ref().map(|request| request.request_id) == Some(request_id);
        if !matches {
            return;
        }

        let mut completed = match active.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn lock_active_text_request(&self) -> MutexGuard<'_, Option<ActiveTextRequest>> {
        lock_unpoisoned(&self.active_text_request)
    }
}

impl SessionHost for Arc<SessionRuntime> {
    fn start_story(&mut self) -> Result<RequestId, String> {
        self.start_story_internal()
    }

    fn start_continuation(
        &mut self,
        context: String,
        user_input: String,
    ) -> Result<RequestId, String> {
        self.start_continuation_internal(context, user_input)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
