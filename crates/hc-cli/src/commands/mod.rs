pub mod access;
pub mod c2c;
pub mod detect;
pub mod pin;
pub mod protocol;
pub mod readers;

use hc_card::{CardReader, HealthCard};
use hc_control::Result;

/// Connect to `reader`, or the first reader holding a card, and identify the card
pub(crate) fn connect(reader: Option<&str>) -> Result<HealthCard> {
    let context = CardReader::new()?;
    let channel = match reader {
        Some(name) => context.connect(name)?,
        None => context.connect_first()?,
    };
    println!("Reader: {}", channel.reader_name());
    Ok(HealthCard::detect(channel)?)
}
