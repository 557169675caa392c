//! Error taxonomy for the scheduling core.
//!
//! Local checks (prerequisites, quota, regeneration limit, input validation)
//! are resolved here and never reach the network. Everything a collaborator
//! reports is folded into [`SchedulerError::TransportFailure`] with the best
//! message available. None of these errors is fatal: the offending operation
//! can always be invoked again by the user.

use thiserror::Error;

use crate::contract::ApiError;
use crate::post::PostStatus;

/// Result alias used across the core.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Shown when a collaborator fails without a usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Upstream data the operation depends on is absent (brand purpose).
    /// The caller should send the user to set it up rather than retry.
    #[error("{what} is missing; complete it before continuing")]
    PrerequisiteMissing { what: &'static str },

    #[error("post quota exhausted ({remaining} remaining); upgrade or wait for the next cycle")]
    QuotaExhausted { remaining: i64 },

    #[error("video regeneration limit reached ({limit} allowed per session)")]
    RegenerationLimitReached { limit: u8 },

    #[error("{operation} failed: {message}")]
    TransportFailure {
        operation: &'static str,
        message: String,
    },

    #[error("invalid input: {0}")]
    ValidationFailure(String),

    #[error("post {0} not found")]
    PostNotFound(String),

    #[error("cannot {action} post {post_id} while it is {status}")]
    InvalidTransition {
        post_id: String,
        action: &'static str,
        status: PostStatus,
    },

    /// Another mutation for the same post is still in flight.
    #[error("post {0} has another request in flight")]
    PostBusy(String),

    /// The video workflow already has a live session, or the session is generating.
    #[error("video session busy: {0}")]
    SessionBusy(String),
}

impl SchedulerError {
    /// Builds a [`SchedulerError::TransportFailure`], preferring the
    /// server-provided message over the generic one.
    pub fn transport(operation: &'static str, err: &ApiError) -> Self {
        let message = err
            .server_message()
            .map(str::to_owned)
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_owned());
        SchedulerError::TransportFailure { operation, message }
    }

    /// Every error in the core leaves the application usable.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Whether the user must be sent to brand-purpose setup.
    pub fn requires_redirect(&self) -> bool {
        matches!(self, SchedulerError::PrerequisiteMissing { .. })
    }

    /// Text suitable for a toast / notification.
    pub fn user_message(&self) -> String {
        match self {
            SchedulerError::TransportFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
