//! Card-to-card authentication
//!
//! Both cards prove their role to each other: the internal card checks the
//! certificate chain of the external card, then challenges it. The run is
//! repeated with the roles swapped. All cryptography happens on the cards.

use std::fmt;

use hc_card::apdu::{algorithm, commands};
use hc_card::{
    expect_state, CardError, CardFileLayout, CvCertificate, Format2Pin, HealthCard, ResponseStatus,
    Validate,
};
use tracing::{debug, info, warn};

use crate::error::{ControlError, Result};
use crate::pin::{valid_card_type, Pin};

/// Length of the random challenge requested from the internal card
pub const CHALLENGE_LENGTH: u8 = 16;

/// Outcome of one authentication direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C2CState {
    Success,
    Failed,
}

impl From<ResponseStatus> for C2CState {
    fn from(status: ResponseStatus) -> Self {
        if status.is_success() {
            C2CState::Success
        } else {
            C2CState::Failed
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Authorizing card checks the card to read
    Forward,
    /// Card to read checks the authorizing card
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// Mutually authenticate an eGK and the provider card that authorizes
/// reading it.
///
/// `pin`, when given, is verified as the cardholder PIN of
/// `authorizing_card` before the forward run. The reverse run only starts
/// after the forward run succeeded, and never verifies a PIN.
pub fn authenticate_card_to_card(
    card_to_read: &mut HealthCard,
    authorizing_card: &mut HealthCard,
    pin: Option<&Pin>,
) -> Result<C2CState> {
    let read_type = valid_card_type(card_to_read, "card to read is invalid")?;
    if !read_type.is_egk() {
        return Err(ControlError::WrongCardType {
            expected: "card to read must be an eGK",
            actual: read_type,
        });
    }
    let authorizing_type = valid_card_type(authorizing_card, "authorizing card is invalid")?;
    let block = pin.map(Pin::to_block).transpose()?;

    info!(card_to_read = %read_type, authorizing = %authorizing_type, "Starting card-to-card authentication");

    run(Direction::Forward, authorizing_card, card_to_read, block.as_ref())?;
    debug!("Starting card-to-card authentication in the reverse direction");
    run(Direction::Reverse, card_to_read, authorizing_card, None)
}

/// One direction: `internal` verifies `external`
fn run(
    direction: Direction,
    internal: &mut HealthCard,
    external: &mut HealthCard,
    pin: Option<&Format2Pin>,
) -> Result<C2CState> {
    let internal_layout = valid_card_type(internal, "internal card is invalid")?.layout();
    let external_layout = valid_card_type(external, "external card is invalid")?.layout();

    let state = authenticate(internal, &internal_layout, external, &external_layout, pin)?;
    debug!(%direction, ?state, "Card-to-card direction finished");

    expect_state(C2CState::Success, state).map_err(|err| {
        warn!(%direction, "Card-to-card authentication failed");
        ControlError::CardToCard(format!("{} direction: {}", direction, err))
    })
}

fn authenticate(
    internal: &mut HealthCard,
    internal_layout: &CardFileLayout,
    external: &mut HealthCard,
    external_layout: &CardFileLayout,
    pin: Option<&Format2Pin>,
) -> Result<C2CState> {
    internal
        .execute(&commands::select_root())
        .validate(ResponseStatus::Success)?;
    external
        .execute(&commands::select_root())
        .validate(ResponseStatus::Success)?;

    if let Some(pin) = pin {
        internal
            .execute(&commands::verify(internal_layout.pin_ch, pin))
            .validate(ResponseStatus::Success)?;
    }

    let ca_certificate = read_certificate(external, external_layout.cvc_ca_sfid)?;
    verify_certificate(internal, &ca_certificate)?;

    let aut_certificate = read_certificate(external, external_layout.cvc_aut_sfid)?;
    verify_certificate(internal, &aut_certificate)?;

    external
        .execute(&commands::mse_set_internal_authentication(
            external_layout.prk_aut_cvc,
            algorithm::ELC_ROLE_AUTHENTICATION,
        ))
        .validate(ResponseStatus::Success)?;
    internal
        .execute(&commands::mse_set_external_authentication(
            aut_certificate.holder_reference(),
            algorithm::ELC_ROLE_CHECK,
        ))
        .validate(ResponseStatus::Success)?;

    let token = challenge_token(internal, internal_layout)?;

    let cryptogram = external
        .execute(&commands::internal_authenticate(token))
        .validate(ResponseStatus::Success)?
        .data;
    let response = internal.execute(&commands::external_mutual_authenticate(cryptogram))?;

    Ok(C2CState::from(response.status))
}

fn read_certificate(card: &mut HealthCard, sfid: u8) -> Result<CvCertificate> {
    let response = card
        .execute(&commands::read_binary_sfid(sfid, 0))
        .validate(ResponseStatus::Success)?;
    Ok(CvCertificate::parse(&response.data)?)
}

/// Select the signing key by CAR, then let the card check the certificate
fn verify_certificate(card: &mut HealthCard, certificate: &CvCertificate) -> Result<()> {
    card.execute(&commands::mse_set_cv_certificate_validation(
        certificate.authority_reference(),
    ))
    .validate(ResponseStatus::Success)
    .and_then(|_| {
        card.execute(&commands::pso_verify_certificate(certificate.content()))
            .validate(ResponseStatus::Success)
    })
    .map(|_| ())
    .map_err(|err| ControlError::CertificateValidation(err.to_string()))
}

/// Challenge of the internal card followed by its ICCSN token (EF.GDO bytes 4..12)
fn challenge_token(card: &mut HealthCard, layout: &CardFileLayout) -> Result<Vec<u8>> {
    let gdo = card
        .execute(&commands::read_binary_sfid(layout.gdo_sfid, 0))
        .validate(ResponseStatus::Success)?
        .data;
    let iccsn = gdo.get(4..12).ok_or_else(|| CardError::Malformed {
        what: "EF.GDO",
        reason: format!("{} bytes, ICCSN token needs 12", gdo.len()),
    })?;

    let mut token = card
        .execute(&commands::get_challenge(CHALLENGE_LENGTH))
        .validate(ResponseStatus::Success)?
        .data;
    token.extend_from_slice(iccsn);
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_card::testing::{cv_certificate, FakeChannel, Journal};
    use hc_card::{CardStatus, CardType, CommandKind};

    const CHR: [u8; 12] = [0x00, 0x09, 0x80, 0x27, 0x68, 0x83, 0x11, 0x00, 0x00, 0x01, 0x72, 0x22];

    fn scripted() -> FakeChannel {
        FakeChannel::new()
            .respond_always(CommandKind::ReadBinary, 0x9000, &cv_certificate(b"DEGXX820214", &CHR))
            .respond_always(CommandKind::GetChallenge, 0x9000, &[0x11; 16])
            .respond_always(CommandKind::InternalAuthenticate, 0x9000, &[0x42; 64])
    }

    fn cards(egk: FakeChannel, hba: FakeChannel) -> ((HealthCard, Journal), (HealthCard, Journal)) {
        (egk.into_card(CardType::Egk21), hba.into_card(CardType::Hba21))
    }

    #[test]
    fn both_directions_succeed() {
        let ((mut egk, egk_log), (mut hba, hba_log)) = cards(scripted(), scripted());
        let pin = Pin::parse("123456");
        let state = authenticate_card_to_card(&mut egk, &mut hba, Some(&pin)).unwrap();
        assert_eq!(state, C2CState::Success);

        // PIN only on the authorizing card, in the forward run
        assert_eq!(hba_log.count(CommandKind::Verify), 1);
        assert_eq!(egk_log.count(CommandKind::Verify), 0);
        for log in [&egk_log, &hba_log] {
            assert_eq!(log.count(CommandKind::InternalAuthenticate), 1);
            assert_eq!(log.count(CommandKind::ExternalMutualAuthenticate), 1);
            assert_eq!(log.count(CommandKind::PsoVerifyCertificate), 2);
        }
    }

    #[test]
    fn token_is_challenge_then_iccsn_token() {
        let ((mut egk, egk_log), (mut hba, _)) = cards(scripted(), scripted());
        authenticate_card_to_card(&mut egk, &mut hba, None).unwrap();

        let certificate = cv_certificate(b"DEGXX820214", &CHR);
        let mut expected = vec![0x11; 16];
        expected.extend_from_slice(&certificate[4..12]);
        let internal_auth = egk_log
            .commands()
            .into_iter()
            .find(|c| c.command_kind() == CommandKind::InternalAuthenticate)
            .unwrap();
        assert_eq!(internal_auth.command_data(), expected.as_slice());
    }

    #[test]
    fn provider_card_as_card_to_read_is_rejected() {
        let (mut hba, hba_log) = scripted().into_card(CardType::Hba2);
        let (mut smcb, _) = scripted().into_card(CardType::Smcb21);
        let err = authenticate_card_to_card(&mut hba, &mut smcb, None).unwrap_err();
        assert!(matches!(err, ControlError::WrongCardType { actual: CardType::Hba2, .. }));
        assert!(hba_log.is_empty());
    }

    #[test]
    fn invalid_card_to_read_is_rejected_before_traffic() {
        let channel = scripted();
        let journal = channel.journal();
        let mut invalid = HealthCard::new(channel, CardStatus::Invalid);
        let (mut hba, hba_log) = scripted().into_card(CardType::Hba21);
        let err = authenticate_card_to_card(&mut invalid, &mut hba, None).unwrap_err();
        assert!(matches!(err, ControlError::InvalidCard(_)));
        assert!(journal.is_empty());
        assert!(hba_log.is_empty());
    }

    #[test]
    fn rejected_certificate_is_a_validation_failure() {
        let hba = scripted().respond(CommandKind::PsoVerifyCertificate, 0x6A80, &[]);
        let ((mut egk, egk_log), (mut hba, hba_log)) = cards(scripted(), hba);
        let err = authenticate_card_to_card(&mut egk, &mut hba, None).unwrap_err();
        assert!(matches!(err, ControlError::CertificateValidation(_)));
        assert_eq!(egk_log.count(CommandKind::InternalAuthenticate), 0);
        assert_eq!(hba_log.count(CommandKind::ExternalMutualAuthenticate), 0);
    }

    #[test]
    fn short_gdo_is_malformed() {
        // The first READ BINARY on the authorizing card is its EF.GDO
        let hba = scripted().respond(CommandKind::ReadBinary, 0x9000, &[0x5A, 0x0A, 0x80, 0x27]);
        let ((mut egk, _), (mut hba, hba_log)) = cards(scripted(), hba);
        let err = authenticate_card_to_card(&mut egk, &mut hba, None).unwrap_err();
        assert!(matches!(err, ControlError::Card(CardError::Malformed { what: "EF.GDO", .. })));
        assert_eq!(hba_log.count(CommandKind::GetChallenge), 0);
    }
}
