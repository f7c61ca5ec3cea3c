//! Transport seam between health card logic and a reader

use pcsc::Card;

use crate::apdu::{ApduCommand, ApduResponse};
use crate::error::Result;

/// Something that can exchange one APDU with a card.
///
/// Implementations must not retry: a failed transmission is reported as is.
pub trait CardChannel {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse>;
}

/// Card connected through a PC/SC reader
pub struct PcscChannel {
    card: Card,
    reader_name: String,
}

impl PcscChannel {
    pub fn new(card: Card, reader_name: String) -> Self {
        Self { card, reader_name }
    }

    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }
}

impl CardChannel for PcscChannel {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse> {
        command.send(&self.card)
    }
}
