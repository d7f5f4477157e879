//! Parser for `gpg --card-status` output

use tracing::debug;

use crate::model::{CardSlot, CardStatus};

const NOT_SET: &str = "[not set]";
const NO_KEY: &str = "[none]";

/// Parse a card status report. Unknown lines are ignored and fields that
/// never appear keep their defaults.
pub fn parse_card_status(output: &str) -> CardStatus {
    let mut status = CardStatus::default();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("Serial number") {
            if let Some(serial) = parse_serial(line) {
                status.serial = serial;
            }
        } else if line.starts_with("Name of cardholder") {
            let name = value_after_colon(line).unwrap_or_default();
            status.cardholder_name = if name == NOT_SET {
                String::new()
            } else {
                name.to_string()
            };
        } else if line.starts_with("Manufacturer") {
            status.manufacturer = value_after_colon(line)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
        } else if line.starts_with("Key attributes") {
            status.key_attributes = value_after_colon(line)
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
        } else if line.starts_with("PIN retry counter") {
            status.pin_retry_counters = value_after_colon(line)
                .map(|v| v.split_whitespace().filter_map(|n| n.parse().ok()).collect())
                .unwrap_or_default();
        } else if line.starts_with("Signature counter") {
            status.signature_counter = value_after_colon(line).and_then(|v| v.parse().ok());
        } else if let Some((slot, key)) = parse_slot_line(line) {
            status.key_slots.insert(slot, key);
        }
    }

    debug!(
        serial = %status.serial,
        slots = status.key_slots.len(),
        "parsed card status"
    );
    status
}

/// The fourth whitespace token is the serial in gpg's usual layout
/// (`Serial number ....: 12345678`); tighter layouts fall back to the text
/// after the colon.
fn parse_serial(line: &str) -> Option<String> {
    if let Some(token) = line.split_whitespace().nth(3) {
        return Some(token.to_string());
    }
    value_after_colon(line)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Recognise `<Slot> key....: <value>` lines.
///
/// Only the three OpenPGP slot names are accepted. Lines such as
/// `General key info..: [none]` also contain "key" and a colon and would
/// otherwise be mistaken for a slot.
pub fn parse_slot_line(line: &str) -> Option<(CardSlot, String)> {
    let (label, value) = line.split_once(':')?;
    if !label.contains("key") {
        return None;
    }
    let name = match label.find(" key") {
        Some(idx) => &label[..idx],
        None => label,
    };
    let slot = CardSlot::from_label(name.trim()).ok()?;

    let value = value.trim();
    if value.is_empty() || value == NO_KEY {
        return None;
    }
    Some((slot, value.to_string()))
}

fn value_after_colon(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}
