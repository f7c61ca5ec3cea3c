//! Status word interpretation
//!
//! The same status word means different things depending on the command
//! that produced it (63Cx is a retry counter for GET PIN STATUS but a wrong
//! secret warning for VERIFY), so the mapping always takes the command kind.

use std::fmt;

use crate::apdu::CommandKind;

/// Interpreted outcome of one card command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    Success,
    /// 62C1: PIN still carries its transport protection
    TransportStatusTransportPin,
    /// 62C7: empty PIN (Leer-PIN) that has to be set first
    TransportStatusEmptyPin,
    /// 62D0: verification for this password is disabled
    PasswordDisabled,
    /// 63Cx from GET PIN STATUS: remaining attempts
    RetryCounterCount(u8),
    /// 63Cx from VERIFY: wrong secret, remaining attempts
    WrongSecretWarning(u8),
    /// 6300 from EXTERNAL MUTUAL AUTHENTICATE
    AuthenticationFailure,
    EndOfFileWarning,
    FileDeactivated,
    FileTerminated,
    WrongLength,
    SecurityStatusNotSatisfied,
    PasswordBlocked,
    ConditionsOfUseNotSatisfied,
    NoCurrentEf,
    WrongData,
    UnsupportedFunction,
    FileNotFound,
    RecordNotFound,
    FullRecordList,
    PasswordNotFound,
    KeyNotFound,
    OffsetTooBig,
    Unknown(u16),
}

impl ResponseStatus {
    /// Map a status word produced by a command of the given kind.
    pub fn from_status_word(kind: CommandKind, sw: u16) -> Self {
        if sw == 0x9000 {
            return ResponseStatus::Success;
        }

        let counter = (sw & 0x000F) as u8;
        let specific = match kind {
            CommandKind::GetPinStatus => match sw {
                0x62C1 => Some(ResponseStatus::TransportStatusTransportPin),
                0x62C7 => Some(ResponseStatus::TransportStatusEmptyPin),
                0x62D0 => Some(ResponseStatus::PasswordDisabled),
                0x63C0..=0x63CF => Some(ResponseStatus::RetryCounterCount(counter)),
                0x6A88 => Some(ResponseStatus::PasswordNotFound),
                _ => None,
            },
            CommandKind::Verify => match sw {
                0x63C0..=0x63CF => Some(ResponseStatus::WrongSecretWarning(counter)),
                0x6983 => Some(ResponseStatus::PasswordBlocked),
                0x6985 => Some(ResponseStatus::ConditionsOfUseNotSatisfied),
                0x6A88 => Some(ResponseStatus::PasswordNotFound),
                _ => None,
            },
            CommandKind::Select => match sw {
                0x6283 => Some(ResponseStatus::FileDeactivated),
                0x6285 => Some(ResponseStatus::FileTerminated),
                _ => None,
            },
            CommandKind::ReadBinary => match sw {
                0x6282 => Some(ResponseStatus::EndOfFileWarning),
                0x6986 => Some(ResponseStatus::NoCurrentEf),
                0x6B00 => Some(ResponseStatus::OffsetTooBig),
                _ => None,
            },
            CommandKind::ReadRecord => match sw {
                0x6A83 => Some(ResponseStatus::RecordNotFound),
                0x6986 => Some(ResponseStatus::NoCurrentEf),
                _ => None,
            },
            CommandKind::AppendRecord => match sw {
                0x6A84 => Some(ResponseStatus::FullRecordList),
                0x6986 => Some(ResponseStatus::NoCurrentEf),
                _ => None,
            },
            CommandKind::ExternalMutualAuthenticate => match sw {
                0x6300 => Some(ResponseStatus::AuthenticationFailure),
                _ => None,
            },
            CommandKind::ManageSecurityEnvironment
            | CommandKind::PsoVerifyCertificate
            | CommandKind::InternalAuthenticate => match sw {
                0x6A88 => Some(ResponseStatus::KeyNotFound),
                _ => None,
            },
            CommandKind::GetChallenge | CommandKind::Other => None,
        };

        specific.unwrap_or(match sw {
            0x6700 => ResponseStatus::WrongLength,
            0x6982 => ResponseStatus::SecurityStatusNotSatisfied,
            0x6985 => ResponseStatus::ConditionsOfUseNotSatisfied,
            0x6A80 => ResponseStatus::WrongData,
            0x6A81 => ResponseStatus::UnsupportedFunction,
            0x6A82 => ResponseStatus::FileNotFound,
            other => ResponseStatus::Unknown(other),
        })
    }

    pub fn is_success(&self) -> bool {
        *self == ResponseStatus::Success
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "SUCCESS"),
            ResponseStatus::TransportStatusTransportPin => write!(f, "TRANSPORT_STATUS_TRANSPORT_PIN"),
            ResponseStatus::TransportStatusEmptyPin => write!(f, "TRANSPORT_STATUS_EMPTY_PIN"),
            ResponseStatus::PasswordDisabled => write!(f, "PASSWORD_DISABLED"),
            ResponseStatus::RetryCounterCount(n) => write!(f, "RETRY_COUNTER_COUNT_{:02}", n),
            ResponseStatus::WrongSecretWarning(n) => write!(f, "WRONG_SECRET_WARNING_COUNT_{:02}", n),
            ResponseStatus::AuthenticationFailure => write!(f, "AUTHENTICATION_FAILURE"),
            ResponseStatus::EndOfFileWarning => write!(f, "END_OF_FILE_WARNING"),
            ResponseStatus::FileDeactivated => write!(f, "FILE_DEACTIVATED"),
            ResponseStatus::FileTerminated => write!(f, "FILE_TERMINATED"),
            ResponseStatus::WrongLength => write!(f, "WRONG_LENGTH"),
            ResponseStatus::SecurityStatusNotSatisfied => write!(f, "SECURITY_STATUS_NOT_SATISFIED"),
            ResponseStatus::PasswordBlocked => write!(f, "PASSWORD_BLOCKED"),
            ResponseStatus::ConditionsOfUseNotSatisfied => write!(f, "CONDITIONS_OF_USE_NOT_SATISFIED"),
            ResponseStatus::NoCurrentEf => write!(f, "NO_CURRENT_EF"),
            ResponseStatus::WrongData => write!(f, "WRONG_DATA"),
            ResponseStatus::UnsupportedFunction => write!(f, "UNSUPPORTED_FUNCTION"),
            ResponseStatus::FileNotFound => write!(f, "FILE_NOT_FOUND"),
            ResponseStatus::RecordNotFound => write!(f, "RECORD_NOT_FOUND"),
            ResponseStatus::FullRecordList => write!(f, "FULL_RECORD_LIST"),
            ResponseStatus::PasswordNotFound => write!(f, "PASSWORD_NOT_FOUND"),
            ResponseStatus::KeyNotFound => write!(f, "KEY_NOT_FOUND"),
            ResponseStatus::OffsetTooBig => write!(f, "OFFSET_TOO_BIG"),
            ResponseStatus::Unknown(sw) => write!(f, "UNKNOWN_STATUS_{:04X}", sw),
        }
    }
}
