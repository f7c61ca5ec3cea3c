use hc_control::{read_entries, ControlConfig, ControlError, Pin, Result};

use crate::formatters::{format_entry, FormatMode};
use crate::pin_entry::prompt_pin;

pub fn cmd_protocol(reader: Option<&str>, all: bool, config: &ControlConfig, format_mode: FormatMode) -> Result<()> {
    let mut egk = super::connect(reader)?;
    let digits = prompt_pin("MRPIN.home")
        .map_err(|err| ControlError::PinVerification(err.to_string()))?
        .ok_or(ControlError::PinEntryAborted)?;

    let log = read_entries(&mut egk, &Pin::parse(&digits), config.protocol_record_count)?;
    println!("\n=== Access Protocol ===\n");
    let mut shown = 0;
    for (i, entry) in log.entries().iter().enumerate() {
        if all || entry.is_valid() {
            println!("{}", format_entry(i + 1, entry, &format_mode));
            shown += 1;
        }
    }
    println!("\n{} of {} records shown", shown, log.len());
    Ok(())
}
