use crate::permissions::Action;
use crate::ticket::TicketStatus;

/// Every way a ticket operation can be rejected.
///
/// All variants are recoverable by the caller; the engine never retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Permission denied for '{action}': {reason}")]
    PermissionDenied { action: Action, reason: String },

    #[error("Ticket has already been rated")]
    AlreadyRated,

    #[error("Ticket is already closed")]
    AlreadyClosed,

    #[error("Ticket has no resolution awaiting a rating")]
    NoActiveRating,

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Stable machine-readable code for each variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::AlreadyRated => "ALREADY_RATED",
            Self::AlreadyClosed => "ALREADY_CLOSED",
            Self::NoActiveRating => "NO_ACTIVE_RATING",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }

    pub(crate) fn denied(action: Action, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action,
            reason: reason.into(),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
