//! Checks on a card and its content before data is read from it

use hc_card::apdu::commands;
use hc_card::layout::{aid, egk, smcb};
use hc_card::{CardType, HealthCard, PinPurpose, ResponseStatus, Validate};
use tracing::{debug, info, warn};

use crate::access::ProfessionalRole;
use crate::certificate::CertificateInspector;
use crate::error::{ControlError, Result};
use crate::pin::{read_pin_state, valid_card_type, PinState};

/// Outcome of checking the authentication certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCertificateState {
    ValidationSuccess,
    ValidationError,
}

pub struct CardVerifier<I> {
    inspector: I,
}

impl<I: CertificateInspector> CardVerifier<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    /// SELECT DF.HCA. Fails if the application is technically blocked.
    pub fn check_card(&self, card: &mut HealthCard) -> Result<()> {
        card.execute(&commands::select_aid(aid::DF_HCA))
            .validate(ResponseStatus::Success)?;
        Ok(())
    }

    pub fn pin_state(&self, card: &mut HealthCard, purpose: PinPurpose) -> Result<PinState> {
        read_pin_state(card, purpose)
    }

    /// Read the X.509 authentication certificate of the cardholder from DF.ESIGN
    pub fn read_auth_certificate(&self, card: &mut HealthCard) -> Result<Vec<u8>> {
        let card_type = valid_card_type(card, "certificate cannot be read from an invalid card")?;
        read_esign_certificate(card, card_type.layout().esign_aut_sfid)
    }

    /// Check EF.C.CH.AUT.R2048 of the insurant's eGK
    pub fn check_auth_certificate(&self, card: &mut HealthCard) -> Result<AuthCertificateState> {
        let card_type = valid_card_type(card, "certificate cannot be read from an invalid card")?;
        if !card_type.is_egk() {
            return Err(ControlError::WrongCardType {
                expected: "authentication certificate is checked on an eGK",
                actual: card_type,
            });
        }
        let certificate = read_esign_certificate(card, egk::EF_C_CH_AUT_R2048_SFID)?;
        if self.inspector.is_currently_valid(&certificate) {
            Ok(AuthCertificateState::ValidationSuccess)
        } else {
            warn!(%card_type, "Authentication certificate is not valid");
            Ok(AuthCertificateState::ValidationError)
        }
    }

    /// Role of the cardholder, from the admission extension of the
    /// authentication certificate
    pub fn professional_role(&self, card: &mut HealthCard) -> Result<ProfessionalRole> {
        let certificate = self.read_auth_certificate(card)?;
        let oid = self.inspector.admission_oid(&certificate)?;
        let role = ProfessionalRole::from_oid(&oid)?;
        info!(%oid, %role, "Professional role extracted");
        Ok(role)
    }

    /// Name of the cardholder for the access protocol
    pub fn actor_name(&self, card: &mut HealthCard) -> Result<String> {
        let card_type = valid_card_type(card, "actor name cannot be read from an invalid card")?;
        if card_type.is_egk() {
            return Err(ControlError::WrongCardType {
                expected: "actor must hold an HBA or SMC-B",
                actual: card_type,
            });
        }
        let sfid = match card_type {
            CardType::Smcb2 => smcb::EF_C_HCI_OSIG_R2048_SFID,
            CardType::Smcb21 => smcb::EF_C_HCI_OSIG_E256_SFID,
            _ => card_type.layout().esign_aut_sfid,
        };
        let certificate = read_esign_certificate(card, sfid)?;
        self.inspector.actor_name(&certificate, card_type)
    }
}

fn read_esign_certificate(card: &mut HealthCard, sfid: u8) -> Result<Vec<u8>> {
    card.execute(&commands::select_aid(aid::DF_ESIGN))
        .validate(ResponseStatus::Success)?;
    let certificate = card.read_file(sfid)?;
    debug!(sfid, len = certificate.len(), "Certificate read from DF.ESIGN");
    Ok(certificate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_card::testing::FakeChannel;
    use hc_card::CommandKind;
    use rstest::rstest;

    struct Fixed(&'static str, bool);

    impl CertificateInspector for Fixed {
        fn admission_oid(&self, _: &[u8]) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn actor_name(&self, _: &[u8], _: CardType) -> Result<String> {
            Ok("Dr. Gesund, Peter".to_string())
        }

        fn is_currently_valid(&self, _: &[u8]) -> bool {
            self.1
        }
    }

    #[test]
    fn role_from_hba21_certificate() {
        let verifier = CardVerifier::new(Fixed("1.2.276.0.76.4.30", true));
        let (mut hba, journal) = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &[0x30; 100])
            .into_card(CardType::Hba21);
        assert_eq!(verifier.professional_role(&mut hba).unwrap(), ProfessionalRole::Arzt);

        let commands = journal.commands();
        assert_eq!(commands[0].command_data(), aid::DF_ESIGN);
        // EF.C.HP.AUT.E256
        assert_eq!(commands[1].header()[2], 0x86);
    }

    #[test]
    fn unknown_oid_fails() {
        let verifier = CardVerifier::new(Fixed("1.2.3", true));
        let (mut smcb, _) = FakeChannel::new().into_card(CardType::Smcb2);
        assert!(matches!(verifier.professional_role(&mut smcb), Err(ControlError::UnknownRole(_))));
    }

    #[test]
    fn blocked_hca_fails_check() {
        let verifier = CardVerifier::new(Fixed("", true));
        let (mut egk, _) = FakeChannel::new()
            .respond(CommandKind::Select, 0x6283, &[])
            .into_card(CardType::Egk2);
        assert!(verifier.check_card(&mut egk).is_err());
    }

    #[test]
    fn expired_certificate_is_reported() {
        let verifier = CardVerifier::new(Fixed("", false));
        let (mut egk, _) = FakeChannel::new().into_card(CardType::Egk21);
        assert_eq!(
            verifier.check_auth_certificate(&mut egk).unwrap(),
            AuthCertificateState::ValidationError
        );
    }

    #[test]
    fn auth_certificate_is_read_from_egk_esign() {
        let verifier = CardVerifier::new(Fixed("", true));
        let (mut egk, journal) = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &[0x30; 64])
            .into_card(CardType::Egk21);
        assert_eq!(
            verifier.check_auth_certificate(&mut egk).unwrap(),
            AuthCertificateState::ValidationSuccess
        );

        let commands = journal.commands();
        assert_eq!(commands[0].command_data(), aid::DF_ESIGN);
        // EF.C.CH.AUT.R2048
        assert_eq!(commands[1].header()[2], 0x81);
    }

    #[test]
    fn auth_certificate_check_needs_egk() {
        let verifier = CardVerifier::new(Fixed("", true));
        let (mut smcb, journal) = FakeChannel::new().into_card(CardType::Smcb21);
        assert!(matches!(
            verifier.check_auth_certificate(&mut smcb),
            Err(ControlError::WrongCardType { .. })
        ));
        assert!(journal.is_empty());
    }

    #[rstest]
    #[case(CardType::Hba2, 0x81)]
    #[case(CardType::Hba21, 0x86)]
    #[case(CardType::Smcb2, 0x88)]
    #[case(CardType::Smcb21, 0x87)]
    fn actor_name_certificate(#[case] card_type: CardType, #[case] p1: u8) {
        let verifier = CardVerifier::new(Fixed("", true));
        let (mut card, journal) = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &[0x30; 64])
            .into_card(card_type);
        assert_eq!(verifier.actor_name(&mut card).unwrap(), "Dr. Gesund, Peter");
        assert_eq!(journal.commands()[1].header()[2], p1);
    }

    #[test]
    fn egk_is_no_actor() {
        let verifier = CardVerifier::new(Fixed("", true));
        let (mut egk, journal) = FakeChannel::new().into_card(CardType::Egk21);
        assert!(matches!(verifier.actor_name(&mut egk), Err(ControlError::WrongCardType { .. })));
        assert!(journal.is_empty());
    }
}
