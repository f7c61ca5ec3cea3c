//! APDU (Application Protocol Data Unit) command handling

use std::fmt;

use hc_common::{encode_tlv, tags};
use pcsc::{Card, MAX_BUFFER_SIZE};

use crate::error::{CardError, Result};
use crate::layout::{KeyReference, PasswordReference};

/// APDU response containing data and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    /// Status word SW1
    pub sw1: u8,
    /// Status word SW2
    pub sw2: u8,
}

impl ApduResponse {
    pub fn new(sw: u16, data: Vec<u8>) -> Self {
        Self {
            data,
            sw1: (sw >> 8) as u8,
            sw2: sw as u8,
        }
    }

    /// Check if the response indicates success (9000)
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Get the full status word as a 16-bit value
    pub fn status_word(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Get status word as hex string (e.g., "9000")
    pub fn status_string(&self) -> String {
        format!("{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Send raw APDU bytes to a PC/SC card and split off the status word
pub fn send_apdu(card: &Card, apdu: &[u8]) -> Result<ApduResponse> {
    let mut rapdu_buf = [0; MAX_BUFFER_SIZE];
    let rapdu = card.transmit(apdu, &mut rapdu_buf)?;

    if rapdu.len() < 2 {
        return Err(CardError::ShortResponse(rapdu.len()));
    }

    let sw1 = rapdu[rapdu.len() - 2];
    let sw2 = rapdu[rapdu.len() - 1];
    let data = rapdu[..rapdu.len() - 2].to_vec();

    Ok(ApduResponse { data, sw1, sw2 })
}

/// Which command an APDU carries. Status words are interpreted per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Select,
    ReadBinary,
    ReadRecord,
    AppendRecord,
    Verify,
    GetPinStatus,
    GetChallenge,
    ManageSecurityEnvironment,
    PsoVerifyCertificate,
    InternalAuthenticate,
    ExternalMutualAuthenticate,
    Other,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Select => "SELECT",
            CommandKind::ReadBinary => "READ BINARY",
            CommandKind::ReadRecord => "READ RECORD",
            CommandKind::AppendRecord => "APPEND RECORD",
            CommandKind::Verify => "VERIFY",
            CommandKind::GetPinStatus => "GET PIN STATUS",
            CommandKind::GetChallenge => "GET CHALLENGE",
            CommandKind::ManageSecurityEnvironment => "MANAGE SECURITY ENVIRONMENT",
            CommandKind::PsoVerifyCertificate => "PSO VERIFY CERTIFICATE",
            CommandKind::InternalAuthenticate => "INTERNAL AUTHENTICATE",
            CommandKind::ExternalMutualAuthenticate => "EXTERNAL MUTUAL AUTHENTICATE",
            CommandKind::Other => "COMMAND",
        };
        f.write_str(name)
    }
}

/// APDU command builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    kind: CommandKind,
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    /// Create a new APDU command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            kind: CommandKind::Other,
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Tag the command so its status word is interpreted correctly
    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set command data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Set expected response length (0x00 requests the maximum)
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    pub fn command_kind(&self) -> CommandKind {
        self.kind
    }

    pub fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    pub fn command_data(&self) -> &[u8] {
        &self.data
    }

    /// Build the APDU command bytes, switching to extended length when the
    /// data does not fit a short Lc
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];
        let extended = self.data.len() > 0xFF;

        if self.data.len() > 0xFFFF {
            return Err(CardError::DataTooLong(self.data.len()));
        }

        if !self.data.is_empty() {
            if extended {
                apdu.push(0x00);
                apdu.push((self.data.len() >> 8) as u8);
                apdu.push(self.data.len() as u8);
            } else {
                apdu.push(self.data.len() as u8);
            }
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            if extended {
                apdu.push(0x00);
            }
            apdu.push(le);
        }

        Ok(apdu)
    }

    /// Send this command to a PC/SC card
    pub fn send(&self, card: &Card) -> Result<ApduResponse> {
        let apdu_bytes = self.build()?;
        send_apdu(card, &apdu_bytes)
    }
}

/// PIN in ISO 9564 format 2: control nibble 2, length nibble, BCD digits,
/// padded with F to eight bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Format2Pin([u8; 8]);

impl Format2Pin {
    pub const MIN_DIGITS: usize = 4;
    pub const MAX_DIGITS: usize = 12;

    /// Build the block from digit values 0..=9
    pub fn new(digits: &[u8]) -> Result<Self> {
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(CardError::InvalidPinLength(digits.len()));
        }
        if let Some(bad) = digits.iter().find(|d| **d > 9) {
            return Err(CardError::malformed("PIN digit", format!("{} is not a decimal digit", bad)));
        }

        let mut block = [0xFF; 8];
        block[0] = 0x20 | digits.len() as u8;
        for (i, digit) in digits.iter().enumerate() {
            let byte = 1 + i / 2;
            if i % 2 == 0 {
                block[byte] = (digit << 4) | 0x0F;
            } else {
                block[byte] = (block[byte] & 0xF0) | digit;
            }
        }
        Ok(Self(block))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Debug for Format2Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Format2Pin(****)")
    }
}

/// Algorithm identifiers for asymmetric role authentication
pub mod algorithm {
    /// elcRoleAuthentication, used with INTERNAL AUTHENTICATE
    pub const ELC_ROLE_AUTHENTICATION: u8 = 0x00;
    /// elcRoleCheck, used with EXTERNAL MUTUAL AUTHENTICATE
    pub const ELC_ROLE_CHECK: u8 = 0x00;
}

/// Health card commands (ISO 7816-4 with gematik COS extensions)
pub mod commands {
    use super::*;

    /// SELECT the root application (MF) without FCP
    pub fn select_root() -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x0C).kind(CommandKind::Select)
    }

    /// SELECT a DF by application identifier
    pub fn select_aid(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x0C)
            .kind(CommandKind::Select)
            .data(aid.to_vec())
    }

    /// SELECT a DF by application identifier and return its FCP
    pub fn select_aid_with_fcp(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x04)
            .kind(CommandKind::Select)
            .data(aid.to_vec())
            .le(0x00)
    }

    /// SELECT an EF below the current DF by file identifier
    pub fn select_ef(fid: u16) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x02, 0x0C)
            .kind(CommandKind::Select)
            .data(fid.to_be_bytes().to_vec())
    }

    /// READ BINARY of a whole EF addressed by short file identifier
    pub fn read_binary_sfid(sfid: u8, offset: u8) -> ApduCommand {
        ApduCommand::new(0x00, 0xB0, 0x80 | (sfid & 0x1F), offset)
            .kind(CommandKind::ReadBinary)
            .le(0x00)
    }

    /// READ BINARY of `length` bytes from an EF addressed by short file identifier
    pub fn read_binary_sfid_range(sfid: u8, offset: u8, length: u8) -> ApduCommand {
        ApduCommand::new(0x00, 0xB0, 0x80 | (sfid & 0x1F), offset)
            .kind(CommandKind::ReadBinary)
            .le(length)
    }

    /// READ BINARY from the currently selected EF
    pub fn read_binary(offset: u16, length: u8) -> ApduCommand {
        ApduCommand::new(0x00, 0xB0, ((offset >> 8) & 0x7F) as u8, offset as u8)
            .kind(CommandKind::ReadBinary)
            .le(length)
    }

    /// READ RECORD command
    pub fn read_record(record_number: u8, sfi: u8) -> ApduCommand {
        let p2 = (sfi << 3) | 0x04;
        ApduCommand::new(0x00, 0xB2, record_number, p2)
            .kind(CommandKind::ReadRecord)
            .le(0x00)
    }

    /// APPEND RECORD command
    pub fn append_record(sfi: u8, record: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xE2, 0x00, sfi << 3)
            .kind(CommandKind::AppendRecord)
            .data(record.to_vec())
    }

    /// VERIFY a password with a format 2 PIN block
    pub fn verify(password: PasswordReference, pin: &Format2Pin) -> ApduCommand {
        ApduCommand::new(0x00, 0x20, 0x00, password.p2())
            .kind(CommandKind::Verify)
            .data(pin.as_bytes().to_vec())
    }

    /// GET PIN STATUS (proprietary class)
    pub fn get_pin_status(password: PasswordReference) -> ApduCommand {
        ApduCommand::new(0x80, 0x20, 0x00, password.p2()).kind(CommandKind::GetPinStatus)
    }

    /// GET CHALLENGE command - request random bytes from the card
    pub fn get_challenge(length: u8) -> ApduCommand {
        ApduCommand::new(0x00, 0x84, 0x00, 0x00)
            .kind(CommandKind::GetChallenge)
            .le(length)
    }

    /// MSE SET: select the public key named by a CAR for CV certificate validation
    pub fn mse_set_cv_certificate_validation(authority_reference: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0x22, 0x81, 0xB6)
            .kind(CommandKind::ManageSecurityEnvironment)
            .data(encode_tlv(tags::CONTROL_REFERENCE_PUBLIC_KEY.bytes(), authority_reference))
    }

    /// MSE SET: select a private key for internal asymmetric authentication
    pub fn mse_set_internal_authentication(key: KeyReference, algorithm: u8) -> ApduCommand {
        let mut data = encode_tlv(tags::CONTROL_REFERENCE_PRIVATE_KEY.bytes(), &[key.p2()]);
        data.extend(encode_tlv(tags::ALGORITHM_IDENTIFIER.bytes(), &[algorithm]));
        ApduCommand::new(0x00, 0x22, 0x41, 0xA4)
            .kind(CommandKind::ManageSecurityEnvironment)
            .data(data)
    }

    /// MSE SET: select a verified public key (by CHR) for external asymmetric authentication
    pub fn mse_set_external_authentication(holder_reference: &[u8], algorithm: u8) -> ApduCommand {
        let mut data = encode_tlv(tags::CONTROL_REFERENCE_PUBLIC_KEY.bytes(), holder_reference);
        data.extend(encode_tlv(tags::ALGORITHM_IDENTIFIER.bytes(), &[algorithm]));
        ApduCommand::new(0x00, 0x22, 0x81, 0xA4)
            .kind(CommandKind::ManageSecurityEnvironment)
            .data(data)
    }

    /// PSO VERIFY CERTIFICATE with certificate body and signature
    pub fn pso_verify_certificate(certificate_content: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0x2A, 0x00, 0xBE)
            .kind(CommandKind::PsoVerifyCertificate)
            .data(certificate_content.to_vec())
    }

    /// INTERNAL AUTHENTICATE command
    pub fn internal_authenticate(data: Vec<u8>) -> ApduCommand {
        ApduCommand::new(0x00, 0x88, 0x00, 0x00)
            .kind(CommandKind::InternalAuthenticate)
            .data(data)
            .le(0x00)
    }

    /// EXTERNAL MUTUAL AUTHENTICATE with a cryptogram from the other card
    pub fn external_mutual_authenticate(cryptogram: Vec<u8>) -> ApduCommand {
        ApduCommand::new(0x00, 0x82, 0x00, 0x00)
            .kind(CommandKind::ExternalMutualAuthenticate)
            .data(cryptogram)
    }
}
