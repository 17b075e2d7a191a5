//! Interactive storytelling session core.
//!
//! The crate owns client-side session state for a narrative that grows by
//! repeatedly sending the accumulated story plus new user input to a
//! generation backend, with an illustrative image requested for the latest
//! segment. Three invariants hold at all times:
//!
//! - the story ledger is append-only with contiguous indices, mutated only
//!   inside the runtime's serialized section;
//! - at most one text request (initialization or continuation) is in flight
//!   per session, so appends happen in request-initiation order;
//! - image results apply only when they answer the latest image request for
//!   their ledger position, so a slow older illustration can never overwrite
//!   a newer one, regardless of resolution order.
//!
//! Rendering and transport are external collaborators: renderers subscribe
//! through [`runtime::StateSink`] and call the runtime entry points; backends
//! implement the `story_backend` contract (`story_backend_http` for the HTTP
//! service, `story_backend_mock` for deterministic local runs).

pub mod error;
pub mod image_sync;
pub mod ledger;
pub mod runtime;
pub mod session;
