use hc_card::apdu::commands;
use hc_card::layout::{aid, egk};
use hc_card::{HealthCard, ResponseStatus, Validate};
use tracing::{debug, info, warn};

use super::entry::{ProtocolEntry, RECORD_LENGTH};
use crate::error::{ControlError, Result};
use crate::pin::{valid_card_type, Pin};

/// Entries read from EF.Logging, in record order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolLog {
    entries: Vec<ProtocolEntry>,
}

impl ProtocolLog {
    pub fn entries(&self) -> &[ProtocolEntry] {
        &self.entries
    }

    /// Entries that decoded to a record, skipping empty slots
    pub fn valid_entries(&self) -> impl Iterator<Item = &ProtocolEntry> {
        self.entries.iter().filter(|entry| entry.is_valid())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ProtocolEntry> for ProtocolLog {
    fn from_iter<T: IntoIterator<Item = ProtocolEntry>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

fn require_egk(card: &HealthCard, what: &'static str) -> Result<()> {
    let card_type = valid_card_type(card, what)?;
    if !card_type.is_egk() {
        return Err(ControlError::WrongCardType {
            expected: "the access protocol is kept on an eGK",
            actual: card_type,
        });
    }
    Ok(())
}

fn select_logging(card: &mut HealthCard) -> Result<()> {
    card.execute(&commands::select_aid(aid::DF_HCA))
        .validate(ResponseStatus::Success)?;
    card.execute(&commands::select_ef(egk::EF_LOGGING_FID))
        .validate(ResponseStatus::Success)?;
    Ok(())
}

/// Append one encoded record to EF.Logging of an eGK
pub fn write_entry(card: &mut HealthCard, record: &[u8]) -> Result<()> {
    require_egk(card, "protocol cannot be written to an invalid card")?;
    if record.len() != RECORD_LENGTH {
        return Err(ControlError::RecordFormat(format!(
            "Wrong length of 'record': {}",
            record.len()
        )));
    }

    select_logging(card)?;
    card.execute(&commands::append_record(egk::EF_LOGGING_SFID, record))
        .validate(ResponseStatus::Success)?;
    info!("Access protocol entry written");
    Ok(())
}

/// Verify MRPIN.home with `pin` and read records 1 to `count` of EF.Logging.
/// `count` is capped at the size of EF.Logging.
///
/// Record statuses are not checked. A record the card does not return
/// decodes to an invalid entry.
pub fn read_entries(card: &mut HealthCard, pin: &Pin, count: u8) -> Result<ProtocolLog> {
    require_egk(card, "protocol cannot be read from an invalid card")?;
    let block = pin.to_block()?;

    let verify = card.execute(&commands::verify(egk::MRPIN_HOME, &block))?;
    if !verify.status.is_success() {
        warn!(status = %verify.status, "MRPIN.home rejected");
        return Err(ControlError::PinVerification(format!(
            "MRPIN.home was not accepted: {}",
            verify.status
        )));
    }

    select_logging(card)?;

    let count = count.min(egk::LOGGING_RECORD_COUNT);
    let mut entries = Vec::with_capacity(count as usize);
    for record in 1..=count {
        let response = card.execute(&commands::read_record(record, egk::EF_LOGGING_SFID))?;
        entries.push(ProtocolEntry::decode(&response.data));
    }

    let log = ProtocolLog { entries };
    debug!(records = log.len(), valid = log.valid_entries().count(), "Access protocol read");
    Ok(log)
}
