//! Client-side lifecycle of a single render: submit once, poll until a terminal state.

use std::fmt;

use thiserror::Error;

use crate::types::{JobHandle, ProgressSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Submitting,
    Polling {
        handle: JobHandle,
        latest: Option<ProgressSnapshot>,
    },
    Done {
        handle: JobHandle,
        snapshot: ProgressSnapshot,
    },
    Failed {
        handle: Option<JobHandle>,
        message: String,
    },
    Cancelled {
        handle: Option<JobHandle>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Submitting => "submitting",
            SessionState::Polling { .. } => "polling",
            SessionState::Done { .. } => "done",
            SessionState::Failed { .. } => "failed",
            SessionState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done { .. } | SessionState::Failed { .. } | SessionState::Cancelled { .. }
        )
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            SessionState::Polling { handle, .. } | SessionState::Done { handle, .. } => {
                Some(handle)
            }
            SessionState::Failed { handle, .. } | SessionState::Cancelled { handle } => {
                handle.as_ref()
            }
            SessionState::Idle | SessionState::Submitting => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} while {state}")]
    Invalid {
        action: &'static str,
        state: &'static str,
    },
    #[error("submission returned an empty render id")]
    EmptyRenderId,
}

/// Tracks which step of the submit-then-poll protocol a client is in.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSession {
    state: SessionState,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// Session for a job submitted elsewhere, already in Polling.
    pub fn resume(handle: JobHandle) -> Result<Self, TransitionError> {
        let mut session = Self::new();
        session.begin_submit()?;
        session.submitted(handle)?;
        Ok(session)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Idle (or any finished state) → Submitting.
    pub fn begin_submit(&mut self) -> Result<(), TransitionError> {
        if matches!(
            self.state,
            SessionState::Submitting | SessionState::Polling { .. }
        ) {
            return Err(self.invalid("submit"));
        }
        self.state = SessionState::Submitting;
        Ok(())
    }

    /// Submitting → Polling once the service handed back a usable handle.
    pub fn submitted(&mut self, handle: JobHandle) -> Result<(), TransitionError> {
        if !matches!(self.state, SessionState::Submitting) {
            return Err(self.invalid("accept a job handle"));
        }
        if !handle.has_render_id() {
            self.state = SessionState::Failed {
                handle: None,
                message: TransitionError::EmptyRenderId.to_string(),
            };
            return Err(TransitionError::EmptyRenderId);
        }
        self.state = SessionState::Polling {
            handle,
            latest: None,
        };
        Ok(())
    }

    /// Polling → Polling | Done | Failed depending on the snapshot.
    pub fn observe(&mut self, snapshot: ProgressSnapshot) -> Result<(), TransitionError> {
        let SessionState::Polling { handle, .. } = &self.state else {
            return Err(self.invalid("record progress"));
        };
        let handle = handle.clone();

        self.state = if snapshot.done {
            SessionState::Done { handle, snapshot }
        } else if snapshot.is_fatal() {
            let message = snapshot
                .fatal_error_message()
                .unwrap_or_else(|| "render failed".to_string());
            SessionState::Failed {
                handle: Some(handle),
                message,
            }
        } else {
            SessionState::Polling {
                handle,
                latest: Some(snapshot),
            }
        };
        Ok(())
    }

    /// Any state → Failed. Failures are terminal; nothing retries them.
    pub fn fail(&mut self, message: impl Into<String>) {
        let handle = self.state.handle().cloned();
        self.state = SessionState::Failed {
            handle,
            message: message.into(),
        };
    }

    /// Stops an in-progress session. Finished sessions keep their outcome.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let handle = self.state.handle().cloned();
        self.state = SessionState::Cancelled { handle };
    }

    fn invalid(&self, action: &'static str) -> TransitionError {
        TransitionError::Invalid {
            action,
            state: self.state.name(),
        }
    }
}
