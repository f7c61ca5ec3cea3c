//! Error type for access control operations

use hc_card::{CardError, CardType, PinPurpose};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Card(#[from] CardError),

    #[error("card is not valid: {0}")]
    InvalidCard(&'static str),

    #[error("wrong card type {actual}: {expected}")]
    WrongCardType {
        expected: &'static str,
        actual: CardType,
    },

    #[error("PIN purpose {purpose:?} is not supported by {card_type}")]
    UnsupportedPinPurpose {
        card_type: CardType,
        purpose: PinPurpose,
    },

    #[error("card-to-card authentication failed: {0}")]
    CardToCard(String),

    #[error("certificate validation failed: {0}")]
    CertificateValidation(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    RecordFormat(String),

    #[error("unknown professional role OID {0}")]
    UnknownRole(String),

    #[error("PIN verification failed: {0}")]
    PinVerification(String),

    #[error("{what}: expected state: {expected}, but was: {actual}")]
    UnexpectedState {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("PIN entry aborted")]
    PinEntryAborted,

    #[error("PIN entry timed out after {0} seconds")]
    PinEntryTimedOut(u64),

    #[error("a PIN entry request is already pending")]
    PinEntryPending,
}

pub type Result<T> = std::result::Result<T, ControlError>;
