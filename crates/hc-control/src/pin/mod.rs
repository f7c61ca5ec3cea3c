//! PIN state, PIN results and PIN verification

mod prompt;
mod verifier;

use std::fmt;

use hc_card::{Format2Pin, HealthCard, ResponseStatus};
use tracing::warn;

use crate::error::Result;

pub use hc_card::PinPurpose;
pub use prompt::{NotificationSink, PinEntryUi, PinPrompt, PinReply, PinRequest};
pub use verifier::{read_pin_state, resolve_target, verify_pin};
pub(crate) use verifier::valid_card_type;

/// PIN digits as entered, one value 0..=9 per character
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Pin {
    digits: Vec<u8>,
}

impl Pin {
    /// Accumulate decimal digits until the first character that is not one.
    /// Nothing after that character is used and no padding is added.
    pub fn parse(value: &str) -> Self {
        let mut digits = Vec::with_capacity(value.len());
        for c in value.chars() {
            match c.to_digit(10) {
                Some(d) => digits.push(d as u8),
                None => {
                    warn!(position = digits.len(), "PIN contains an invalid digit");
                    break;
                }
            }
        }
        Self { digits }
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Format 2 PIN block for VERIFY
    pub fn to_block(&self) -> hc_card::Result<Format2Pin> {
        Format2Pin::new(&self.digits)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({} digits)", self.digits.len())
    }
}

/// Where the digits for a verification come from
pub trait PinSource {
    fn verify(&self, card: &mut HealthCard, purpose: PinPurpose) -> Result<PinResult>;
}

impl PinSource for Pin {
    fn verify(&self, card: &mut HealthCard, purpose: PinPurpose) -> Result<PinResult> {
        verify_pin(card, purpose, self)
    }
}

impl<U: PinEntryUi, N: NotificationSink> PinSource for PinPrompt<U, N> {
    fn verify(&self, card: &mut HealthCard, purpose: PinPurpose) -> Result<PinResult> {
        PinPrompt::verify(self, card, purpose)
    }
}

/// Health of a password object as reported by GET PIN STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinState {
    NoError,
    TransportStatusTransportPin,
    TransportStatusEmptyPin,
    PasswordDisabled,
    /// Remaining attempts before the PIN is blocked, 0 means blocked
    RetryCounterCount(u8),
    SecurityStatusNotSatisfied,
    PasswordNotFound,
}

impl From<ResponseStatus> for PinState {
    fn from(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Success => PinState::NoError,
            ResponseStatus::TransportStatusTransportPin => PinState::TransportStatusTransportPin,
            ResponseStatus::TransportStatusEmptyPin => PinState::TransportStatusEmptyPin,
            ResponseStatus::PasswordDisabled => PinState::PasswordDisabled,
            ResponseStatus::RetryCounterCount(n) => PinState::RetryCounterCount(n),
            ResponseStatus::SecurityStatusNotSatisfied => PinState::SecurityStatusNotSatisfied,
            ResponseStatus::PasswordNotFound => PinState::PasswordNotFound,
            _ => PinState::RetryCounterCount(0),
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinState::NoError => write!(f, "NO_ERROR"),
            PinState::TransportStatusTransportPin => write!(f, "TRANSPORT_STATUS_TRANSPORT_PIN"),
            PinState::TransportStatusEmptyPin => write!(f, "TRANSPORT_STATUS_EMPTY_PIN"),
            PinState::PasswordDisabled => write!(f, "PASSWORD_DISABLED"),
            PinState::RetryCounterCount(n) => write!(f, "RETRY_COUNTER_COUNT_{:02}", n),
            PinState::SecurityStatusNotSatisfied => write!(f, "SECURITY_STATUS_NOT_SATISFIED"),
            PinState::PasswordNotFound => write!(f, "PASSWORD_NOT_FOUND"),
        }
    }
}

/// Outcome of one PIN verification, with texts for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinResult {
    pub state: PinState,
    pub verified: bool,
    pub remaining_attempts: Option<u8>,
    pub failure_text: Option<String>,
    pub warning_text: Option<String>,
}

impl PinResult {
    pub fn from_state(state: PinState) -> Self {
        let mut result = Self {
            state,
            verified: false,
            remaining_attempts: None,
            failure_text: None,
            warning_text: None,
        };

        match state {
            PinState::NoError => {}
            PinState::RetryCounterCount(n) => {
                result.remaining_attempts = Some(n);
                result.warning_text = Some(match n {
                    0 => "No retry remains, the PIN is blocked".to_string(),
                    1 => "1 retry remains".to_string(),
                    n => format!("{} retries remain", n),
                });
            }
            PinState::TransportStatusTransportPin => {
                result.failure_text =
                    Some("The PIN still has transport protection, set a PIN first".to_string());
            }
            PinState::TransportStatusEmptyPin => {
                result.failure_text = Some("The PIN is an empty PIN, set a PIN first".to_string());
            }
            PinState::PasswordDisabled
            | PinState::SecurityStatusNotSatisfied
            | PinState::PasswordNotFound => {
                result.failure_text = Some(state.to_string());
            }
        }
        result
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// Text to show when the verification did not succeed
    pub fn error_text(&self) -> String {
        self.failure_text
            .clone()
            .or_else(|| self.warning_text.clone())
            .unwrap_or_else(|| "PIN verification failed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_stops_at_first_non_digit() {
        assert_eq!(Pin::parse("123456").digits(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(Pin::parse("12a456").digits(), &[1, 2]);
        assert!(Pin::parse("x123").is_empty());
    }

    #[test]
    fn debug_hides_digits() {
        assert_eq!(format!("{:?}", Pin::parse("123456")), "Pin(6 digits)");
    }

    #[rstest]
    #[case(ResponseStatus::Success, PinState::NoError)]
    #[case(ResponseStatus::TransportStatusTransportPin, PinState::TransportStatusTransportPin)]
    #[case(ResponseStatus::TransportStatusEmptyPin, PinState::TransportStatusEmptyPin)]
    #[case(ResponseStatus::PasswordDisabled, PinState::PasswordDisabled)]
    #[case(ResponseStatus::RetryCounterCount(2), PinState::RetryCounterCount(2))]
    #[case(ResponseStatus::SecurityStatusNotSatisfied, PinState::SecurityStatusNotSatisfied)]
    #[case(ResponseStatus::PasswordNotFound, PinState::PasswordNotFound)]
    #[case(ResponseStatus::FileNotFound, PinState::RetryCounterCount(0))]
    fn state_from_status(#[case] status: ResponseStatus, #[case] expected: PinState) {
        assert_eq!(PinState::from(status), expected);
    }

    #[rstest]
    #[case(0, "No retry remains, the PIN is blocked")]
    #[case(1, "1 retry remains")]
    #[case(2, "2 retries remain")]
    #[case(3, "3 retries remain")]
    fn retry_counter_sets_warning_only(#[case] remaining: u8, #[case] text: &str) {
        let result = PinResult::from_state(PinState::RetryCounterCount(remaining));
        assert_eq!(result.remaining_attempts, Some(remaining));
        assert_eq!(result.warning_text.as_deref(), Some(text));
        assert_eq!(result.failure_text, None);
    }

    #[rstest]
    #[case(PinState::PasswordDisabled)]
    #[case(PinState::SecurityStatusNotSatisfied)]
    #[case(PinState::PasswordNotFound)]
    #[case(PinState::TransportStatusTransportPin)]
    #[case(PinState::TransportStatusEmptyPin)]
    fn failure_states_set_failure_only(#[case] state: PinState) {
        let result = PinResult::from_state(state);
        assert!(result.failure_text.is_some());
        assert_eq!(result.warning_text, None);
        assert_eq!(result.remaining_attempts, None);
    }

    #[test]
    fn no_error_sets_nothing() {
        let result = PinResult::from_state(PinState::NoError);
        assert_eq!(result.failure_text, None);
        assert_eq!(result.warning_text, None);
        assert_eq!(result.remaining_attempts, None);
        assert!(!result.verified);
        assert!(result.with_verified(true).verified);
    }
}
