//! PC/SC card reader management

use std::ffi::CString;

use pcsc::{Context, Protocols, Scope, ShareMode};
use tracing::debug;

use crate::channel::PcscChannel;
use crate::error::{CardError, Result};

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
}

impl CardReader {
    /// Create a new CardReader by establishing a PC/SC context
    pub fn new() -> Result<Self> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<String>> {
        let mut readers_buf = [0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;

        Ok(readers
            .map(|r| r.to_str().unwrap_or("Unknown").to_string())
            .collect())
    }

    /// Connect to the first reader that holds a card
    pub fn connect_first(&self) -> Result<PcscChannel> {
        let mut readers_buf = [0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;

        let mut last_error = pcsc::Error::NoReadersAvailable;
        for reader in readers {
            let reader_name = reader.to_str().unwrap_or("Unknown").to_string();
            match self.context.connect(reader, ShareMode::Shared, Protocols::ANY) {
                Ok(card) => return Ok(PcscChannel::new(card, reader_name)),
                Err(err) => {
                    debug!(reader = %reader_name, error = %err, "No usable card in reader");
                    last_error = err;
                }
            }
        }
        Err(CardError::Pcsc(last_error))
    }

    /// Connect to a specific reader by name
    pub fn connect(&self, reader_name: &str) -> Result<PcscChannel> {
        let name = CString::new(reader_name)
            .map_err(|_| CardError::Pcsc(pcsc::Error::UnknownReader))?;
        let card = self.context.connect(&name, ShareMode::Shared, Protocols::ANY)?;
        Ok(PcscChannel::new(card, reader_name.to_string()))
    }
}
