//! Parser for `gpg --list-secret-keys --keyid-format=long` output
//!
//! The listing is human-readable text whose layout drifts between gpg
//! releases, so parsing never fails: lines that cannot be understood are
//! skipped and record lines that only partly match yield partly filled
//! records.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::model::{Capability, KeyKind, KeyRecord, StubMarker};

/// `sec`/`ssb`, optional stub suffix, then whitespace or end of line.
static RECORD_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(sec|ssb)([#>])?(?:\s|$)").expect("record head pattern is valid")
});

/// Full record layout:
/// `sec#  ed25519/07AAA1E535650AF5 2025-09-05 [SC] [expires: 2030-09-04]`
static RECORD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(sec|ssb)([#>])?\s+(\S+)/(\S+)\s+(\S+)\s+\[([^\]]*)\](?:\s+\[expires:\s+([^\]]+)\])?",
    )
    .expect("record line pattern is valid")
});

/// Fallbacks used when the full layout does not match.
static ALGORITHM_AND_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+\s+([^/\s]+)/(\S+)").expect("id pattern is valid"));

static CAPABILITY_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\[([A-Za-z]*)\]").expect("capability pattern is valid"));

static EXPIRY_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[expires:\s*([^\]]+)\]").expect("expiry pattern is valid"));

const CARD_NUMBER_PREFIX: &str = "card-no:";

/// Parse a secret-key listing into records, in listing order.
pub fn parse_key_list(output: &str) -> Vec<KeyRecord> {
    let mut records: Vec<KeyRecord> = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if RECORD_HEAD.is_match(line) {
            records.push(parse_record_line(line));
        } else if let Some(rest) = line.strip_prefix(CARD_NUMBER_PREFIX) {
            // Amends only the record directly above; ignored before any record.
            if let Some(current) = records.last_mut() {
                let serial = rest.split_whitespace().collect::<Vec<_>>().join(" ");
                if !serial.is_empty() {
                    current.token_serial_ref = Some(serial);
                }
            }
        }
    }

    debug!("parsed {} key records", records.len());
    records
}

/// Parse one `sec`/`ssb` line. The caller has already matched the head.
pub fn parse_record_line(line: &str) -> KeyRecord {
    let Some(head) = RECORD_HEAD.captures(line) else {
        // Unreachable for callers that checked the head; keep a usable record.
        return KeyRecord::new(KeyKind::Subkey);
    };

    let kind = KeyKind::from_marker(&head[1]).unwrap_or(KeyKind::Subkey);
    let mut record = KeyRecord::new(kind);
    record.stub = head
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .and_then(StubMarker::from_char);

    if let Some(caps) = RECORD_LINE.captures(line) {
        record.algorithm = caps[3].to_string();
        record.short_id = caps[4].to_string();
        record.created_on = Some(caps[5].to_string());
        record.capabilities = parse_capabilities(&caps[6]);
        record.expires_on = caps.get(7).map(|m| m.as_str().trim().to_string());
        return record;
    }

    // Degrade field by field.
    if let Some(caps) = ALGORITHM_AND_ID.captures(line) {
        record.algorithm = caps[1].to_string();
        record.short_id = caps[2].to_string();
    }
    if let Some(caps) = CAPABILITY_BRACKET.captures(line) {
        record.capabilities = parse_capabilities(&caps[1]);
    }
    if let Some(caps) = EXPIRY_BRACKET.captures(line) {
        record.expires_on = Some(caps[1].trim().to_string());
    }
    record
}

/// Decode a capability bracket, keeping gpg's order and dropping letters
/// that are not known.
pub fn parse_capabilities(bracket: &str) -> Vec<Capability> {
    bracket.chars().filter_map(Capability::from_letter).collect()
}
