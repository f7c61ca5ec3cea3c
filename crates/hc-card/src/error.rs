//! Error type for the card command layer

use thiserror::Error;

use crate::apdu::CommandKind;
use crate::status::ResponseStatus;

/// Errors raised while talking to a health card
#[derive(Debug, Error)]
pub enum CardError {
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    #[error("response too short: {0} bytes, status word missing")]
    ShortResponse(usize),

    #[error("{command}: expected status {expected}, but was {actual}")]
    StatusMismatch {
        command: CommandKind,
        expected: ResponseStatus,
        actual: ResponseStatus,
    },

    #[error("expected state: {expected}, but was: {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("PIN must have 4 to 12 digits, got {0}")]
    InvalidPinLength(usize),

    #[error("object system version must be 3 bytes, got {0}")]
    InvalidVersionLength(usize),

    #[error("command data too long: {0} bytes")]
    DataTooLong(usize),
}

impl CardError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        CardError::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CardError>;
