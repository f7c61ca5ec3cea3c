//! Tunables of the access control services

use std::time::Duration;

use hc_card::layout::egk::LOGGING_RECORD_COUNT;

/// Default time a PIN prompt waits for the user
pub const DEFAULT_PIN_ENTRY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    /// How long an interactive PIN request blocks. `None` waits until the
    /// UI delivers digits or an abort.
    pub pin_entry_timeout: Option<Duration>,
    /// Records read from EF.Logging
    pub protocol_record_count: u8,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pin_entry_timeout: Some(DEFAULT_PIN_ENTRY_TIMEOUT),
            protocol_record_count: LOGGING_RECORD_COUNT,
        }
    }
}

impl ControlConfig {
    pub fn with_pin_entry_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pin_entry_timeout = timeout;
        self
    }
}
