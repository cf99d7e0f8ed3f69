//! Shared types for the render-video service and its clients.
//!
//! The server crate and `render-video-cli` both depend on this crate so the
//! JSON shapes of the two endpoints, the client session state machine and the
//! sequential progress poller stay in one place.

pub mod poller;
pub mod session;
pub mod types;

pub use poller::{DEFAULT_POLL_INTERVAL, PollError, PollEvent, Poller, ProgressSource};
pub use session::{RenderSession, SessionState, TransitionError};
pub use types::{ApiErrorBody, ApiErrorMessage, JobHandle, ProgressSnapshot, RenderRequest};
