use hc_control::pin::read_pin_state;
use hc_control::{ControlConfig, PinPrompt, PinPurpose, Result};

use crate::formatters::{format_pin_result, FormatMode};
use crate::pin_entry::{StderrSink, TerminalPinUi};

pub fn cmd_pin_status(reader: Option<&str>, purpose: PinPurpose) -> Result<()> {
    let mut card = super::connect(reader)?;
    let state = read_pin_state(&mut card, purpose)?;
    println!("{:?}: {}", purpose, state);
    Ok(())
}

pub fn cmd_verify_pin(
    reader: Option<&str>,
    purpose: PinPurpose,
    config: &ControlConfig,
    format_mode: FormatMode,
) -> Result<()> {
    let mut card = super::connect(reader)?;
    let prompt = PinPrompt::new(TerminalPinUi, StderrSink, config);
    let result = prompt.verify(&mut card, purpose)?;
    println!("{}", format_pin_result(&result, &format_mode));
    Ok(())
}
