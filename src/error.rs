//! Public error of pollable-timer.

use crate::prelude::*;

/// Error enumeration for timer construction, inspection and release.
#[derive(Error, Debug)]
pub enum TimerError {
    /// The requested interval can't be expressed in the native time type.
    /// Raised before any OS call, nothing was allocated.
    #[error("Invalid timer interval: {reason}.")]
    InvalidInterval {
        /// What was wrong with the value.
        reason: String,
    },
    /// The OS refused to allocate a timer object.
    #[error("Timer creation failed.")]
    TimerCreateFailed(#[source] io::Error),
    /// The OS refused to arm the freshly created timer.
    /// The descriptor has already been closed when this is returned.
    #[error("Timer arming failed.")]
    TimerArmFailed(#[source] io::Error),
    /// Closing the timer descriptor failed.
    #[error("Timer descriptor release failed.")]
    ReleaseFailed(#[source] io::Error),
    /// Reading the timer state (current spec or expiration count) failed.
    #[error("Timer read failed.")]
    TimerReadFailed(#[source] io::Error),
    /// Registering the descriptor with an async reactor failed.
    #[error("Timer registration with the reactor failed.")]
    TimerRegisterFailed(#[source] io::Error),
}

impl TimerError {
    pub(crate) fn invalid_interval(reason: impl Into<String>) -> Self {
        TimerError::InvalidInterval {
            reason: reason.into(),
        }
    }

    /// Underlying OS error code, if the failure came from a system call.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }

    /// The `io::Error` carried by the OS-level variants.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            TimerError::InvalidInterval { .. } => None,
            TimerError::TimerCreateFailed(e)
            | TimerError::TimerArmFailed(e)
            | TimerError::ReleaseFailed(e)
            | TimerError::TimerReadFailed(e)
            | TimerError::TimerRegisterFailed(e) => Some(e),
        }
    }

    /// `true` for caller mistakes (a bad interval),
    /// `false` for resource or environment failures reported by the OS.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TimerError::InvalidInterval { .. })
    }

    /// `true` if a read failed only because the timer hasn't expired yet
    /// on a non-blocking descriptor.
    pub fn is_would_block(&self) -> bool {
        match self {
            TimerError::TimerReadFailed(e) => e.kind() == io::ErrorKind::WouldBlock,
            _ => false,
        }
    }
}

impl From<TimerError> for io::Error {
    fn from(e: TimerError) -> Self {
        match e {
            TimerError::InvalidInterval { reason } => {
                io::Error::new(io::ErrorKind::InvalidInput, reason)
            }
            TimerError::TimerCreateFailed(e)
            | TimerError::TimerArmFailed(e)
            | TimerError::ReleaseFailed(e)
            | TimerError::TimerReadFailed(e)
            | TimerError::TimerRegisterFailed(e) => e,
        }
    }
}
