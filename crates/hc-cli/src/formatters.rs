//! Output formatting for raw and human-readable mode

use chrono::DateTime;
use clap::ValueEnum;
use hc_control::{PinResult, ProtocolEntry};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatMode {
    /// Raw hex output
    Raw,
    /// Human-readable formatted output
    Human,
}

/// Describe a protocol data type code
fn data_type_name(code: &str) -> &'static str {
    match code {
        "2" => "emergency data / personal declarations",
        _ => "unknown",
    }
}

/// Describe a type of access code
fn type_access_name(code: &str) -> &'static str {
    match code {
        "N" => "emergency access",
        "A" => "update",
        "R" => "read with MR-PIN",
        "r" => "read without PIN",
        _ => "unknown",
    }
}

/// Format one protocol entry on a single line
pub fn format_entry(index: usize, entry: &ProtocolEntry, mode: &FormatMode) -> String {
    if *mode == FormatMode::Raw {
        return format!("{:2}: {}", index, hex::encode_upper(entry.record()));
    }

    format!(
        "{:2}: {} {} ({}), {} ({}) by {} [{}]",
        index,
        format_timestamp(entry.timestamp()),
        entry.data_type(),
        data_type_name(entry.data_type()),
        entry.type_access(),
        type_access_name(entry.type_access()),
        entry.actor_name(),
        entry.actor_id()
    )
}

/// Render seconds since the epoch as a UTC date and time
pub fn format_timestamp(seconds: u32) -> String {
    match DateTime::from_timestamp(i64::from(seconds), 0) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => seconds.to_string(),
    }
}

pub fn format_pin_result(result: &PinResult, mode: &FormatMode) -> String {
    let mut out = if result.verified {
        "PIN verified".to_string()
    } else {
        format!("PIN not verified: {}", result.error_text())
    };
    if *mode == FormatMode::Human {
        if let Some(remaining) = result.remaining_attempts {
            out.push_str(&format!(" ({} attempts left before VERIFY)", remaining));
        }
    } else {
        out.push_str(&format!(" [{}]", result.state));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_as_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(1_561_128_299), "2019-06-21 14:44:59 UTC");
        assert_eq!(format_timestamp(951_782_400), "2000-02-29 00:00:00 UTC");
    }

    #[test]
    fn reference_entry_human() {
        let record = hex::decode(
            "5D0CED6B31328027688311000001722247454D2E534D43422D43413420544553542D4F4E4C592020202020202020",
        )
        .unwrap();
        let entry = ProtocolEntry::decode(&record);
        assert_eq!(
            format_entry(1, &entry, &FormatMode::Human),
            " 1: 2019-06-21 14:44:59 UTC 1 (unknown), 2 (unknown) by GEM.SMCB-CA4 TEST-ONLY [80276883110000017222]"
        );
    }
}
