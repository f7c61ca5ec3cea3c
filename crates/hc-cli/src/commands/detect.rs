use hc_card::CardStatus;
use hc_control::Result;

use crate::formatters::FormatMode;

pub fn cmd_detect(reader: Option<&str>, format_mode: FormatMode) -> Result<()> {
    let card = super::connect(reader)?;
    match card.status() {
        CardStatus::Valid(card_type) => {
            if format_mode == FormatMode::Raw {
                println!("{:?}", card_type);
            } else {
                println!("Card type: {}", card_type);
                println!("Generation: {:?}", card_type.generation());
            }
        }
        CardStatus::Invalid => println!("Card is not a supported health card (generation 2 or later)"),
    }
    Ok(())
}
