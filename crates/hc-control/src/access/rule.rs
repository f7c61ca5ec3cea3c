use std::fmt;

use crate::pin::PinState;

/// Which rule governs a request for emergency or declaration data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRule {
    /// Emergency access
    R1,
    /// Update of the stored data
    R2,
    /// Normal access, MR-PIN enabled
    R3,
    /// Normal access, MR-PIN disabled by the insured person
    R4,
}

impl AccessRule {
    pub const ALL: [AccessRule; 4] = [AccessRule::R1, AccessRule::R2, AccessRule::R3, AccessRule::R4];
}

/// Pick the rule for a request. Emergency beats update, update beats the
/// PIN state of the data.
pub fn access_rule(pin_state: PinState, emergency: bool, update: bool) -> AccessRule {
    if emergency {
        AccessRule::R1
    } else if update {
        AccessRule::R2
    } else if pin_state != PinState::PasswordDisabled {
        AccessRule::R3
    } else {
        AccessRule::R4
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
