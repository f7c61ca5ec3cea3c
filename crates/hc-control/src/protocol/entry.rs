use std::fmt;

use tracing::{debug, warn};

/// Length of one EF.Logging record
pub const RECORD_LENGTH: usize = 46;
pub const ACTOR_ID_LENGTH: usize = 10;
pub const ACTOR_NAME_LENGTH: usize = 30;

const TIMESTAMP: std::ops::Range<usize> = 0..4;
const DATA_TYPE: usize = 4;
const TYPE_ACCESS: usize = 5;
const ACTOR_ID: std::ops::Range<usize> = 6..16;
const ACTOR_NAME: std::ops::Range<usize> = 16..46;

/// One decoded access protocol record.
///
/// Records that are empty (all zero) or have the wrong length decode to an
/// invalid entry with placeholder fields instead of failing.
#[derive(Clone)]
pub struct ProtocolEntry {
    record: Vec<u8>,
    timestamp: u32,
    data_type: String,
    type_access: String,
    actor_id: String,
    actor_name: String,
    valid: bool,
}

impl ProtocolEntry {
    pub fn decode(record: &[u8]) -> Self {
        if record.iter().all(|b| *b == 0) {
            debug!("Empty protocol record");
            return Self::invalid(record);
        }
        if record.len() != RECORD_LENGTH {
            warn!(
                length = record.len(),
                expected = RECORD_LENGTH,
                "Protocol record has wrong length"
            );
            return Self::invalid(record);
        }

        let mut timestamp = [0u8; 4];
        timestamp.copy_from_slice(&record[TIMESTAMP]);

        Self {
            record: record.to_vec(),
            timestamp: u32::from_be_bytes(timestamp),
            data_type: text(&record[DATA_TYPE..=DATA_TYPE]),
            type_access: text(&record[TYPE_ACCESS..=TYPE_ACCESS]),
            actor_id: hex::encode(&record[ACTOR_ID]),
            actor_name: text(&record[ACTOR_NAME]),
            valid: true,
        }
    }

    fn invalid(record: &[u8]) -> Self {
        Self {
            record: record.to_vec(),
            timestamp: 0,
            data_type: "0".to_string(),
            type_access: "0".to_string(),
            actor_id: "0".to_string(),
            actor_name: "0".to_string(),
            valid: false,
        }
    }

    /// Seconds since the Unix epoch
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn type_access(&self) -> &str {
        &self.type_access
    }

    /// ICCSN of the actor's card, lowercase hex
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Bytes the entry was decoded from
    pub fn record(&self) -> &[u8] {
        &self.record
    }
}

/// Fields are padded with trailing spaces
fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches(' ').to_string()
}

impl PartialEq for ProtocolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.data_type == other.data_type
            && self.type_access == other.type_access
            && self.actor_id == other.actor_id
            && self.actor_name == other.actor_name
    }
}

impl Eq for ProtocolEntry {}

impl fmt::Debug for ProtocolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolEntry")
            .field("valid", &self.valid)
            .field("timestamp", &self.timestamp)
            .field("data_type", &self.data_type)
            .field("type_access", &self.type_access)
            .field("actor_id", &self.actor_id)
            .field("actor_name", &self.actor_name)
            .finish()
    }
}
