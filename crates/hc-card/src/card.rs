//! Session handle for one health card

use std::fmt;

use hc_common::{find_tag, tags};
use tracing::{debug, info};

use crate::apdu::{commands, ApduCommand, CommandKind};
use crate::card_type::{CardFamily, CardGeneration, CardType};
use crate::channel::CardChannel;
use crate::error::{CardError, Result};
use crate::layout::{aid, EF_VERSION2_SFID};
use crate::status::ResponseStatus;

/// Bytes requested per READ BINARY when reading a whole file
const READ_CHUNK: usize = 256;
/// Highest offset READ BINARY can address
const MAX_FILE_OFFSET: usize = 0x7FFF;

/// Status a card session reports once it has been identified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Valid(CardType),
    Invalid,
}

impl CardStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CardStatus::Valid(_))
    }

    pub fn card_type(&self) -> Option<CardType> {
        match self {
            CardStatus::Valid(card_type) => Some(*card_type),
            CardStatus::Invalid => None,
        }
    }
}

/// Interpreted response of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: CommandKind,
    pub status: ResponseStatus,
    pub sw: u16,
    pub data: Vec<u8>,
}

impl Response {
    /// Keep the response if it carries `expected`, otherwise fail with a
    /// status mismatch naming the command.
    pub fn expect_status(self, expected: ResponseStatus) -> Result<Response> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(CardError::StatusMismatch {
                command: self.command,
                expected,
                actual: self.status,
            })
        }
    }
}

/// A live session with one card. Commands are issued strictly one at a time
/// through `&mut self`.
pub struct HealthCard {
    channel: Box<dyn CardChannel + Send>,
    status: CardStatus,
}

impl HealthCard {
    /// Wrap a channel whose card type is already known
    pub fn new(channel: impl CardChannel + Send + 'static, status: CardStatus) -> Self {
        Self {
            channel: Box::new(channel),
            status,
        }
    }

    /// Identify the card behind `channel` by probing the root application of
    /// each family and reading the object system version from EF.Version2.
    /// Cards that match no supported type get an invalid status.
    pub fn detect(channel: impl CardChannel + Send + 'static) -> Result<Self> {
        let mut card = Self::new(channel, CardStatus::Invalid);

        for (family, root) in [
            (CardFamily::Egk, aid::MF_EGK),
            (CardFamily::Hba, aid::MF_HBA),
            (CardFamily::Smcb, aid::MF_SMCB),
        ] {
            let selected = card.execute(&commands::select_aid(root))?;
            if !selected.status.is_success() {
                debug!(?family, status = %selected.status, "Root application not present");
                continue;
            }

            let version = card.execute(&commands::read_binary_sfid(EF_VERSION2_SFID, 0))?;
            let generation = if version.status.is_success() {
                let object_system = find_tag(&version.data, tags::VERSION2_TEMPLATE.bytes())
                    .and_then(|template| find_tag(template, tags::OBJECT_SYSTEM_VERSION.bytes()))
                    .ok_or_else(|| CardError::malformed("EF.Version2", "object system version missing"))?;
                CardGeneration::from_object_system_version(object_system)?
            } else {
                CardGeneration::Unknown
            };

            card.status = match CardType::from_parts(family, generation) {
                Some(card_type) => {
                    info!(%card_type, "Health card detected");
                    CardStatus::Valid(card_type)
                }
                None => {
                    info!(?family, ?generation, "Unsupported card generation");
                    CardStatus::Invalid
                }
            };
            return Ok(card);
        }

        info!("No health card application found");
        Ok(card)
    }

    pub fn status(&self) -> CardStatus {
        self.status
    }

    pub fn card_type(&self) -> Option<CardType> {
        self.status.card_type()
    }

    /// Send one command and interpret its status word. Never retries.
    pub fn execute(&mut self, command: &ApduCommand) -> Result<Response> {
        let raw = self.channel.transmit(command)?;
        let sw = raw.status_word();
        let status = ResponseStatus::from_status_word(command.command_kind(), sw);
        debug!(
            command = %command.command_kind(),
            sw = %raw.status_string(),
            %status,
            len = raw.data.len(),
            "APDU exchanged"
        );
        Ok(Response {
            command: command.command_kind(),
            status,
            sw,
            data: raw.data,
        })
    }

    /// Read a whole transparent EF addressed by short file identifier.
    ///
    /// The first READ BINARY selects the EF; further chunks are read from the
    /// current offset until the card signals the end of the file or returns a
    /// short chunk.
    pub fn read_file(&mut self, sfid: u8) -> Result<Vec<u8>> {
        let first = self.execute(&commands::read_binary_sfid(sfid, 0))?;
        let mut data = match first.status {
            ResponseStatus::Success => first.data,
            ResponseStatus::EndOfFileWarning => return Ok(first.data),
            _ => return first.expect_status(ResponseStatus::Success).map(|r| r.data),
        };

        let mut last_chunk = data.len();
        while last_chunk == READ_CHUNK && data.len() < MAX_FILE_OFFSET {
            let response = self.execute(&commands::read_binary(data.len() as u16, 0x00))?;
            last_chunk = response.data.len();
            match response.status {
                ResponseStatus::Success => data.extend(response.data),
                ResponseStatus::EndOfFileWarning => {
                    data.extend(response.data);
                    break;
                }
                // The previous chunk ended exactly at the end of the file
                ResponseStatus::OffsetTooBig => break,
                _ => {
                    response.expect_status(ResponseStatus::Success)?;
                }
            }
        }

        debug!(sfid, len = data.len(), "EF read");
        Ok(data)
    }
}

impl fmt::Debug for HealthCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCard").field("status", &self.status).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChannel;

    fn version2(major: u8, minor: u8, revision: u8) -> Vec<u8> {
        let inner = hc_common::encode_tlv(&[0xC0], &[major, minor, revision]);
        hc_common::encode_tlv(&[0xEF], &inner)
    }

    #[test]
    fn detect_egk21() {
        let channel = FakeChannel::new().respond(CommandKind::ReadBinary, 0x9000, &version2(4, 4, 0));
        let card = HealthCard::detect(channel).unwrap();
        assert_eq!(card.status(), CardStatus::Valid(CardType::Egk21));
    }

    #[test]
    fn detect_smcb2_after_probing_other_roots() {
        let channel = FakeChannel::new()
            .respond(CommandKind::Select, 0x6A82, &[])
            .respond(CommandKind::Select, 0x6A82, &[])
            .respond(CommandKind::ReadBinary, 0x9000, &version2(4, 0, 0));
        let journal = channel.journal();
        let card = HealthCard::detect(channel).unwrap();
        assert_eq!(card.card_type(), Some(CardType::Smcb2));
        assert_eq!(journal.count(CommandKind::Select), 3);
    }

    #[test]
    fn detect_g1_card_is_invalid() {
        let channel = FakeChannel::new().respond(CommandKind::ReadBinary, 0x9000, &version2(3, 0, 3));
        let card = HealthCard::detect(channel).unwrap();
        assert_eq!(card.status(), CardStatus::Invalid);
    }

    #[test]
    fn detect_without_any_root_is_invalid() {
        let channel = FakeChannel::new().respond_always(CommandKind::Select, 0x6A82, &[]);
        let journal = channel.journal();
        let card = HealthCard::detect(channel).unwrap();
        assert!(!card.status().is_valid());
        assert_eq!(journal.count(CommandKind::ReadBinary), 0);
    }

    #[test]
    fn execute_maps_status_per_command() {
        let channel = FakeChannel::new().respond(CommandKind::GetPinStatus, 0x63C1, &[]);
        let mut card = HealthCard::new(channel, CardStatus::Valid(CardType::Hba21));
        let response = card
            .execute(&commands::get_pin_status(crate::layout::PasswordReference::global(1)))
            .unwrap();
        assert_eq!(response.status, ResponseStatus::RetryCounterCount(1));
        assert!(matches!(
            response.expect_status(ResponseStatus::Success),
            Err(CardError::StatusMismatch { command: CommandKind::GetPinStatus, .. })
        ));
    }

    #[test]
    fn read_file_follows_chunks_until_short_chunk() {
        let channel = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &[0x30; 256])
            .respond(CommandKind::ReadBinary, 0x9000, &[0x31; 256])
            .respond(CommandKind::ReadBinary, 0x6282, &[0x32; 10]);
        let journal = channel.journal();
        let mut card = HealthCard::new(channel, CardStatus::Valid(CardType::Hba21));
        let data = card.read_file(0x06).unwrap();
        assert_eq!(data.len(), 522);
        assert_eq!(data[256], 0x31);
        let commands = journal.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].header(), [0x00, 0xB0, 0x86, 0x00]);
        assert_eq!(commands[2].header(), [0x00, 0xB0, 0x02, 0x00]);
    }

    #[test]
    fn read_file_single_short_read() {
        let channel = FakeChannel::new().respond(CommandKind::ReadBinary, 0x9000, &[0x01; 40]);
        let journal = channel.journal();
        let mut card = HealthCard::new(channel, CardStatus::Valid(CardType::Smcb2));
        assert_eq!(card.read_file(0x01).unwrap().len(), 40);
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn read_file_missing_ef_fails() {
        let channel = FakeChannel::new().respond(CommandKind::ReadBinary, 0x6A82, &[]);
        let mut card = HealthCard::new(channel, CardStatus::Valid(CardType::Egk21));
        assert!(matches!(
            card.read_file(0x04),
            Err(CardError::StatusMismatch { actual: ResponseStatus::FileNotFound, .. })
        ));
    }
}
