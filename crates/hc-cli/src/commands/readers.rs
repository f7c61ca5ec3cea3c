use hc_card::CardReader;
use hc_control::Result;

pub fn cmd_readers() -> Result<()> {
    let readers = CardReader::new()?.list_readers()?;
    if readers.is_empty() {
        println!("No card readers found");
    }
    for (i, name) in readers.iter().enumerate() {
        println!("{}: {}", i + 1, name);
    }
    Ok(())
}
