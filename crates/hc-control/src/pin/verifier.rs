use hc_card::apdu::commands;
use hc_card::{CardType, HealthCard, PinPurpose, PinTarget, ResponseStatus, Validate};
use tracing::{debug, info};

use super::{Pin, PinResult, PinState};
use crate::error::{ControlError, Result};

/// Look up where `purpose` lives on a card of `card_type`
pub fn resolve_target(card_type: CardType, purpose: PinPurpose) -> Result<PinTarget> {
    card_type
        .pin_target(purpose)
        .ok_or(ControlError::UnsupportedPinPurpose { card_type, purpose })
}

pub(crate) fn valid_card_type(card: &HealthCard, what: &'static str) -> Result<CardType> {
    card.card_type().ok_or(ControlError::InvalidCard(what))
}

/// Select the root and then each DF on the way to the password object
fn select_target(card: &mut HealthCard, target: &PinTarget) -> Result<()> {
    card.execute(&commands::select_root())
        .validate(ResponseStatus::Success)?;
    for df in target.path {
        card.execute(&commands::select_aid(df))
            .validate(ResponseStatus::Success)?;
    }
    Ok(())
}

/// Select the password object for `purpose` and ask the card for its state
pub fn read_pin_state(card: &mut HealthCard, purpose: PinPurpose) -> Result<PinState> {
    let card_type = valid_card_type(card, "PIN state cannot be read from an invalid card")?;
    let target = resolve_target(card_type, purpose)?;
    select_target(card, &target)?;
    let response = card.execute(&commands::get_pin_status(target.password))?;
    let state = PinState::from(response.status);
    debug!(%card_type, ?purpose, %state, "PIN state read");
    Ok(state)
}

/// Verify `pin` for `purpose`.
///
/// Runs select root, the DF selection the card type needs, GET PIN STATUS
/// and VERIFY. The returned result carries the state found before VERIFY and
/// whether VERIFY succeeded; a failed VERIFY is not an error.
pub fn verify_pin(card: &mut HealthCard, purpose: PinPurpose, pin: &Pin) -> Result<PinResult> {
    let card_type = valid_card_type(card, "PIN cannot be verified because card is invalid")?;
    let target = resolve_target(card_type, purpose)?;
    let block = pin.to_block()?;

    debug!(
        %card_type,
        ?purpose,
        pwid = target.password.pwid,
        df_specific = target.password.df_specific,
        "Verifying PIN"
    );

    select_target(card, &target)?;
    let status = card.execute(&commands::get_pin_status(target.password))?;
    let result = PinResult::from_state(PinState::from(status.status));

    let verify = card.execute(&commands::verify(target.password, &block))?;
    let verified = verify.status.is_success();
    info!(%card_type, ?purpose, verified, state = %result.state, "PIN verification finished");

    Ok(result.with_verified(verified))
}
