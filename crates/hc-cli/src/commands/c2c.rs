use hc_control::{authenticate_card_to_card, ControlError, Pin, Result};

use crate::pin_entry::prompt_pin;

pub fn cmd_c2c(egk_reader: &str, provider_reader: &str, with_pin: bool) -> Result<()> {
    println!("Card-to-card authentication\n");
    let mut egk = super::connect(Some(egk_reader))?;
    let mut provider = super::connect(Some(provider_reader))?;

    let pin = if with_pin {
        let digits = prompt_pin("Cardholder PIN of the authorizing card")
            .map_err(|err| ControlError::PinVerification(err.to_string()))?
            .ok_or(ControlError::PinEntryAborted)?;
        Some(Pin::parse(&digits))
    } else {
        None
    };

    let state = authenticate_card_to_card(&mut egk, &mut provider, pin.as_ref())?;
    println!("Result: {:?}", state);
    Ok(())
}
