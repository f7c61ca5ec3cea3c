//! Scripted in-memory card for tests
//!
//! Responses are queued per command kind. When a queue is empty the channel
//! falls back to a per-kind default, and to `9000` with no data after that.
//! Every transmitted command is recorded in a [`Journal`] that stays readable
//! after the channel has been moved into a [`HealthCard`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use hc_common::{encode_tlv, tags};

use crate::apdu::{ApduCommand, ApduResponse, CommandKind};
use crate::card::{CardStatus, HealthCard};
use crate::card_type::CardType;
use crate::channel::CardChannel;
use crate::error::Result;

#[derive(Default)]
pub struct FakeChannel {
    queued: HashMap<CommandKind, VecDeque<ApduResponse>>,
    defaults: HashMap<CommandKind, ApduResponse>,
    journal: Journal,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for the next command of `kind`
    pub fn respond(mut self, kind: CommandKind, sw: u16, data: &[u8]) -> Self {
        self.queued
            .entry(kind)
            .or_default()
            .push_back(ApduResponse::new(sw, data.to_vec()));
        self
    }

    /// Answer every command of `kind` without a queued response this way
    pub fn respond_always(mut self, kind: CommandKind, sw: u16, data: &[u8]) -> Self {
        self.defaults.insert(kind, ApduResponse::new(sw, data.to_vec()));
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Wrap the channel in a card session of the given type
    pub fn into_card(self, card_type: CardType) -> (HealthCard, Journal) {
        let journal = self.journal();
        (HealthCard::new(self, CardStatus::Valid(card_type)), journal)
    }
}

impl CardChannel for FakeChannel {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse> {
        self.journal.record(command.clone());
        let kind = command.command_kind();
        let response = self
            .queued
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front())
            .or_else(|| self.defaults.get(&kind).cloned())
            .unwrap_or_else(|| ApduResponse::new(0x9000, Vec::new()));
        Ok(response)
    }
}

/// Shared record of the commands a [`FakeChannel`] received
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<ApduCommand>>>);

impl Journal {
    fn record(&self, command: ApduCommand) {
        if let Ok(mut commands) = self.0.lock() {
            commands.push(command);
        }
    }

    pub fn commands(&self) -> Vec<ApduCommand> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<CommandKind> {
        self.commands().iter().map(ApduCommand::command_kind).collect()
    }

    pub fn count(&self, kind: CommandKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.commands().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Minimal CV certificate with the given CAR and CHR
pub fn cv_certificate(authority_reference: &[u8], holder_reference: &[u8]) -> Vec<u8> {
    let mut body = encode_tlv(tags::CERTIFICATE_PROFILE_IDENTIFIER.bytes(), &[0x70]);
    body.extend(encode_tlv(tags::CERTIFICATION_AUTHORITY_REFERENCE.bytes(), authority_reference));
    body.extend(encode_tlv(tags::PUBLIC_KEY.bytes(), &[0x06, 0x01, 0x00]));
    body.extend(encode_tlv(tags::CERTIFICATE_HOLDER_REFERENCE.bytes(), holder_reference));
    let mut content = encode_tlv(tags::CERTIFICATE_BODY.bytes(), &body);
    content.extend(encode_tlv(tags::SIGNATURE.bytes(), &[0x5A; 64]));
    encode_tlv(tags::CV_CERTIFICATE.bytes(), &content)
}

/// EF.GDO content carrying a ten byte ICCSN
pub fn gdo(iccsn: &[u8; 10]) -> Vec<u8> {
    encode_tlv(&[0x5A], iccsn)
}
