use std::time::{SystemTime, UNIX_EPOCH};

use hc_card::apdu::commands;
use hc_card::{CardError, HealthCard, ResponseStatus, Validate};
use tracing::debug;

use super::entry::{ACTOR_ID_LENGTH, ACTOR_NAME_LENGTH, RECORD_LENGTH};
use crate::certificate::CertificateInspector;
use crate::error::{ControlError, Result};
use crate::pin::valid_card_type;
use crate::verifier::CardVerifier;

/// ICCSN position in EF.GDO, behind the 5A tag and length
const GDO_ICCSN: std::ops::Range<usize> = 2..12;

/// Builder for one 46 byte access protocol record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRecordBuilder {
    timestamp: Option<u32>,
    data_type: String,
    type_access: String,
    actor_id: String,
    actor_name: String,
}

impl ProtocolRecordBuilder {
    /// `actor_id` is the ICCSN of the actor's card as hex
    pub fn new(actor_id: impl Into<String>, actor_name: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            data_type: String::new(),
            type_access: String::new(),
            actor_id: actor_id.into(),
            actor_name: actor_name.into(),
        }
    }

    /// Read the actor's ICCSN from EF.GDO and the actor's name from the
    /// authentication certificate of `actor_card` (an HBA or SMC-B)
    pub fn for_actor<I: CertificateInspector>(
        actor_card: &mut HealthCard,
        verifier: &CardVerifier<I>,
    ) -> Result<Self> {
        let card_type = valid_card_type(actor_card, "protocol actor card is invalid")?;

        actor_card
            .execute(&commands::select_root())
            .validate(ResponseStatus::Success)?;
        let gdo = actor_card
            .execute(&commands::read_binary_sfid(card_type.layout().gdo_sfid, 0))
            .validate(ResponseStatus::Success)?
            .data;
        let iccsn = gdo.get(GDO_ICCSN).ok_or_else(|| CardError::Malformed {
            what: "EF.GDO",
            reason: format!("{} bytes, ICCSN needs 12", gdo.len()),
        })?;
        let actor_id = hex::encode(iccsn);
        debug!(%card_type, %actor_id, "Protocol actor identified");

        let actor_name = verifier.actor_name(actor_card)?;
        Ok(Self::new(actor_id, actor_name))
    }

    /// Seconds since the Unix epoch, defaults to the time of `build`
    pub fn timestamp(mut self, seconds: u32) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    /// One character naming the protected data, for example `2`
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    /// One character naming the kind of access, for example `R`
    pub fn type_access(mut self, type_access: impl Into<String>) -> Self {
        self.type_access = type_access.into();
        self
    }

    /// Encode the record. Each field must fit its slot exactly, except the
    /// actor name which is padded with spaces or cut to 30 bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let timestamp = match self.timestamp {
            Some(seconds) => seconds,
            None => now()?,
        };
        let data_type = single_byte("dataType", &self.data_type)?;
        let type_access = single_byte("typeAccess", &self.type_access)?;

        let actor_id = hex::decode(&self.actor_id)
            .map_err(|err| ControlError::RecordFormat(format!("'actorId' is not hex: {}", err)))?;
        if actor_id.len() != ACTOR_ID_LENGTH {
            return Err(wrong_length("actorId", actor_id.len()));
        }

        let mut record = Vec::with_capacity(RECORD_LENGTH);
        record.extend_from_slice(&timestamp.to_be_bytes());
        record.push(data_type);
        record.push(type_access);
        record.extend_from_slice(&actor_id);
        record.extend_from_slice(&pad_name(&self.actor_name));
        Ok(record)
    }
}

fn wrong_length(field: &str, length: usize) -> ControlError {
    ControlError::RecordFormat(format!("Wrong length of '{}': {}", field, length))
}

fn single_byte(field: &str, value: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        bytes => Err(wrong_length(field, bytes.len())),
    }
}

/// Right-pad with spaces to 30 bytes, or cut at the last character boundary
/// that fits
fn pad_name(name: &str) -> [u8; ACTOR_NAME_LENGTH] {
    let mut end = name.len().min(ACTOR_NAME_LENGTH);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    if end < name.len() {
        debug!("Actor name is too long, it is shortened");
    }

    let mut padded = [b' '; ACTOR_NAME_LENGTH];
    padded[..end].copy_from_slice(&name.as_bytes()[..end]);
    padded
}

fn now() -> Result<u32> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| ControlError::RecordFormat(format!("system time before epoch: {}", err)))?
        .as_secs();
    u32::try_from(seconds).map_err(|_| wrong_length("timestamp", 8))
}
