//! Access protocol kept in EF.Logging of the eGK
//!
//! Every access to emergency data or personal declarations leaves a fixed
//! 46 byte record on the card:
//!
//! | offset | length | field |
//! |---|---|---|
//! | 0 | 4 | timestamp, seconds since the epoch, big endian |
//! | 4 | 1 | data type |
//! | 5 | 1 | type of access |
//! | 6 | 10 | ICCSN of the actor's card |
//! | 16 | 30 | actor name, padded with spaces |

mod builder;
mod entry;
mod log;

pub use builder::ProtocolRecordBuilder;
pub use entry::{ProtocolEntry, ACTOR_ID_LENGTH, ACTOR_NAME_LENGTH, RECORD_LENGTH};
pub use log::{read_entries, write_entry, ProtocolLog};
