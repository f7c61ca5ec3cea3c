//! Access to emergency data and personal declarations of an eGK
//!
//! [`AccessSession::prepare`] decides whether the holder of the authorizing
//! card (HBA or SMC-B) may access the data and authenticates both cards to
//! each other. [`AccessSession::open`] then records the access in the
//! protocol of the eGK, verifies the MR-PIN the right asks for and checks
//! that the container can be read.

use hc_card::{HealthCard, PinPurpose};
use tracing::{debug, info};

use crate::access::{
    access_rule, ensure_granted, resolve_access_right, AccessRight, AccessRule, DataType, ProfessionalRole,
};
use crate::c2c::authenticate_card_to_card;
use crate::certificate::CertificateInspector;
use crate::error::{ControlError, Result};
use crate::nfd;
use crate::pin::PinSource;
use crate::protocol::{write_entry, ProtocolRecordBuilder};
use crate::verifier::{AuthCertificateState, CardVerifier};

/// Data type code written to the protocol for NFD and DPE access
const PROTOCOL_DATA_TYPE: &str = "2";

/// What the caller wants to do with the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    pub data_type: DataType,
    /// Emergency access to emergency data
    pub emergency: bool,
    /// The data is going to be written
    pub update: bool,
}

impl AccessRequest {
    pub fn read(data_type: DataType) -> Self {
        Self { data_type, emergency: false, update: false }
    }
}

/// Decisions taken while preparing access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessSession {
    request: AccessRequest,
    role: ProfessionalRole,
    rule: AccessRule,
    right: AccessRight,
}

fn mr_pin(data_type: DataType) -> PinPurpose {
    match data_type {
        DataType::Nfd => PinPurpose::Nfd,
        DataType::Dpe => PinPurpose::Dpe,
    }
}

fn require_verified(
    what: &str,
    card: &mut HealthCard,
    source: &impl PinSource,
    purpose: PinPurpose,
) -> Result<()> {
    let result = source.verify(card, purpose)?;
    if result.verified {
        Ok(())
    } else {
        Err(ControlError::PinVerification(format!("{}: {}", what, result.error_text())))
    }
}

impl AccessSession {
    /// Decide access for the holder of `authorizing_card`, verify their PIN
    /// from `cardholder_pin` and authenticate the two cards.
    ///
    /// Fails with [`ControlError::AccessDenied`] before any PIN is asked for
    /// when the role has no right under the computed rule.
    pub fn prepare<I: CertificateInspector>(
        card_to_read: &mut HealthCard,
        authorizing_card: &mut HealthCard,
        request: AccessRequest,
        verifier: &CardVerifier<I>,
        cardholder_pin: &impl PinSource,
    ) -> Result<Self> {
        verifier.check_card(card_to_read)?;

        if verifier.check_auth_certificate(card_to_read)? != AuthCertificateState::ValidationSuccess {
            return Err(ControlError::CertificateValidation(
                "authentication certificate of the eGK is not valid".to_string(),
            ));
        }

        let pin_state = verifier.pin_state(card_to_read, mr_pin(request.data_type))?;
        let role = verifier.professional_role(authorizing_card)?;
        let rule = access_rule(pin_state, request.emergency, request.update);
        let right = ensure_granted(resolve_access_right(card_to_read, request.data_type, role, rule)?)?;
        debug!(%pin_state, %role, %rule, ?right, "Access granted");

        require_verified("cardholder PIN", authorizing_card, cardholder_pin, PinPurpose::Ch)?;
        authenticate_card_to_card(card_to_read, authorizing_card, None)?;

        info!(data_type = %request.data_type, %role, "Access prepared");
        Ok(Self { request, role, rule, right })
    }

    pub fn request(&self) -> AccessRequest {
        self.request
    }

    pub fn role(&self) -> ProfessionalRole {
        self.role
    }

    pub fn rule(&self) -> AccessRule {
        self.rule
    }

    pub fn right(&self) -> AccessRight {
        self.right
    }

    /// Protocol the access on `card_to_read`, verify the MR-PIN if the right
    /// needs one and run the container readiness checks
    pub fn open<I: CertificateInspector>(
        &self,
        card_to_read: &mut HealthCard,
        authorizing_card: &mut HealthCard,
        verifier: &CardVerifier<I>,
        insurant_pin: &impl PinSource,
    ) -> Result<()> {
        let type_access = self.right.type_access_code(self.rule).ok_or_else(|| {
            ControlError::RecordFormat(format!("no type of access for {:?} under {}", self.right, self.rule))
        })?;

        let record = ProtocolRecordBuilder::for_actor(authorizing_card, verifier)?
            .data_type(PROTOCOL_DATA_TYPE)
            .type_access(type_access.to_string())
            .build()?;
        write_entry(card_to_read, &record)?;

        if let Some(purpose) = self.right.required_pin() {
            require_verified("MR-PIN", card_to_read, insurant_pin, purpose)?;
        }

        nfd::ensure_ready(card_to_read, self.request.data_type)
    }

    /// Stored document of the requested container, gzip compressed
    pub fn read(&self, card_to_read: &mut HealthCard) -> Result<Vec<u8>> {
        nfd::read_container(card_to_read, self.request.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::Pin;
    use crate::protocol::ProtocolEntry;
    use hc_card::testing::{cv_certificate, gdo, FakeChannel};
    use hc_card::{CardType, CommandKind};
    use hc_common::encode_tlv;
    use pretty_assertions::assert_eq;

    const CHR: [u8; 12] = [0x00, 0x09, 0x80, 0x27, 0x68, 0x83, 0x11, 0x00, 0x00, 0x01, 0x72, 0x22];
    const ICCSN: [u8; 10] = [0x80, 0x27, 0x68, 0x83, 0x11, 0x00, 0x00, 0x01, 0x72, 0x22];

    struct Doctor {
        valid: bool,
    }

    impl CertificateInspector for Doctor {
        fn admission_oid(&self, _: &[u8]) -> Result<String> {
            Ok("1.2.276.0.76.4.30".to_string())
        }

        fn actor_name(&self, _: &[u8], _: CardType) -> Result<String> {
            Ok("Gesund, Peter".to_string())
        }

        fn is_currently_valid(&self, _: &[u8]) -> bool {
            self.valid
        }
    }

    struct Pharmacist;

    impl CertificateInspector for Pharmacist {
        fn admission_oid(&self, _: &[u8]) -> Result<String> {
            Ok("1.2.276.0.76.4.32".to_string())
        }

        fn actor_name(&self, _: &[u8], _: CardType) -> Result<String> {
            Ok("Apotheke am Markt".to_string())
        }

        fn is_currently_valid(&self, _: &[u8]) -> bool {
            true
        }
    }

    fn c2c_ready() -> FakeChannel {
        FakeChannel::new()
            .respond_always(CommandKind::ReadBinary, 0x9000, &cv_certificate(b"DEGXX820214", &CHR))
            .respond_always(CommandKind::GetChallenge, 0x9000, &[0x11; 16])
            .respond_always(CommandKind::InternalAuthenticate, 0x9000, &[0x42; 64])
    }

    #[test]
    fn doctor_in_emergency_is_authenticated() {
        let (mut egk, egk_log) = c2c_ready().into_card(CardType::Egk21);
        let (mut hba, hba_log) = c2c_ready().into_card(CardType::Hba21);
        let request = AccessRequest { emergency: true, ..AccessRequest::read(DataType::Nfd) };

        let session = AccessSession::prepare(
            &mut egk,
            &mut hba,
            request,
            &CardVerifier::new(Doctor { valid: true }),
            &Pin::parse("123456"),
        )
        .unwrap();

        assert_eq!(session.rule(), AccessRule::R1);
        assert_eq!(session.right(), AccessRight::EmergencyNoPin);
        assert_eq!(session.role(), ProfessionalRole::Arzt);
        assert_eq!(hba_log.count(CommandKind::Verify), 1);
        assert_eq!(egk_log.count(CommandKind::ExternalMutualAuthenticate), 1);
        assert_eq!(hba_log.count(CommandKind::ExternalMutualAuthenticate), 1);
    }

    #[test]
    fn denied_role_never_sees_a_pin_prompt() {
        let (mut egk, egk_log) = c2c_ready().into_card(CardType::Egk21);
        let (mut hba, hba_log) = c2c_ready().into_card(CardType::Hba21);
        let request = AccessRequest { update: true, ..AccessRequest::read(DataType::Nfd) };

        let err = AccessSession::prepare(
            &mut egk,
            &mut hba,
            request,
            &CardVerifier::new(Pharmacist),
            &Pin::parse("123456"),
        )
        .unwrap_err();

        assert!(matches!(err, ControlError::AccessDenied(_)));
        assert_eq!(hba_log.count(CommandKind::Verify), 0);
        assert_eq!(egk_log.count(CommandKind::InternalAuthenticate), 0);
    }

    #[test]
    fn invalid_egk_certificate_stops_preparation() {
        let (mut egk, egk_log) = c2c_ready().into_card(CardType::Egk21);
        let (mut hba, hba_log) = c2c_ready().into_card(CardType::Hba21);
        let err = AccessSession::prepare(
            &mut egk,
            &mut hba,
            AccessRequest::read(DataType::Nfd),
            &CardVerifier::new(Doctor { valid: false }),
            &Pin::parse("123456"),
        )
        .unwrap_err();

        assert!(matches!(err, ControlError::CertificateValidation(_)));
        // SELECT DF.HCA, SELECT DF.ESIGN and EF.C.CH.AUT.R2048 on the eGK only
        assert_eq!(
            egk_log.kinds(),
            vec![CommandKind::Select, CommandKind::Select, CommandKind::ReadBinary]
        );
        assert_eq!(egk_log.commands()[2].header()[2], 0x81);
        assert!(hba_log.is_empty());
    }

    #[test]
    fn rejected_cardholder_pin_stops_authentication() {
        let (mut egk, egk_log) = c2c_ready().into_card(CardType::Egk21);
        let (mut hba, _) = c2c_ready()
            .respond(CommandKind::Verify, 0x63C1, &[])
            .into_card(CardType::Hba21);

        let err = AccessSession::prepare(
            &mut egk,
            &mut hba,
            AccessRequest { emergency: true, ..AccessRequest::read(DataType::Nfd) },
            &CardVerifier::new(Doctor { valid: true }),
            &Pin::parse("000000"),
        )
        .unwrap_err();

        assert!(matches!(err, ControlError::PinVerification(_)));
        assert_eq!(egk_log.count(CommandKind::InternalAuthenticate), 0);
    }

    fn fcp(life_cycle: u8) -> Vec<u8> {
        encode_tlv(&[0x62], &encode_tlv(&[0x8A], &[life_cycle]))
    }

    fn status_ef() -> Vec<u8> {
        let mut data = vec![b'0'];
        data.extend_from_slice(&[0x00; 19]);
        data.extend_from_slice(&[0x00, 0x10, 0x00, 0x00, 0x00]);
        data
    }

    #[test]
    fn open_writes_protocol_then_checks_container() {
        let session = AccessSession {
            request: AccessRequest::read(DataType::Nfd),
            role: ProfessionalRole::Arzt,
            rule: AccessRule::R4,
            right: AccessRight::NoPin,
        };
        // SELECT DF.HCA and EF.Logging, then the container DF with FCP
        let (mut egk, egk_log) = FakeChannel::new()
            .respond(CommandKind::Select, 0x9000, &[])
            .respond(CommandKind::Select, 0x9000, &[])
            .respond(CommandKind::Select, 0x9000, &fcp(0x05))
            .respond(CommandKind::ReadBinary, 0x9000, &status_ef())
            .respond(CommandKind::ReadBinary, 0x9000, &status_ef())
            .respond(CommandKind::ReadBinary, 0x9000, &[0x00, 0x40])
            .into_card(CardType::Egk21);
        let (mut hba, _) = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &gdo(&ICCSN))
            .into_card(CardType::Hba21);

        session
            .open(&mut egk, &mut hba, &CardVerifier::new(Doctor { valid: true }), &Pin::default())
            .unwrap();

        assert_eq!(egk_log.count(CommandKind::Verify), 0);
        let append = egk_log
            .commands()
            .into_iter()
            .find(|c| c.command_kind() == CommandKind::AppendRecord)
            .unwrap();
        let entry = ProtocolEntry::decode(append.command_data());
        assert!(entry.is_valid());
        assert_eq!(entry.data_type(), "2");
        assert_eq!(entry.type_access(), "r");
        assert_eq!(entry.actor_id(), "80276883110000017222");
        assert_eq!(entry.actor_name(), "Gesund, Peter");
    }

    #[test]
    fn open_verifies_required_mr_pin() {
        let session = AccessSession {
            request: AccessRequest::read(DataType::Nfd),
            role: ProfessionalRole::Apotheker,
            rule: AccessRule::R3,
            right: AccessRight::MrPinNfdRead,
        };
        let (mut egk, egk_log) = FakeChannel::new()
            .respond(CommandKind::Verify, 0x63C2, &[])
            .into_card(CardType::Egk21);
        let (mut smcb, _) = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &gdo(&ICCSN))
            .into_card(CardType::Smcb21);

        let err = session
            .open(&mut egk, &mut smcb, &CardVerifier::new(Pharmacist), &Pin::parse("1234"))
            .unwrap_err();
        assert!(matches!(err, ControlError::PinVerification(_)));
        // The access is protocolled before the MR-PIN is asked for
        assert_eq!(egk_log.count(CommandKind::AppendRecord), 1);
        assert_eq!(egk_log.count(CommandKind::Verify), 1);
    }
}
