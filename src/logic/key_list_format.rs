//! Plain-text rendering of key records for backup snapshots

use std::fmt::Write;

use crate::model::KeyRecord;

/// One line per record: `<marker> <id> [<caps>]`, then optional
/// ` expires: <date>` and ` card-no: <serial>`.
pub fn render_key_list(records: &[KeyRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let capabilities = record
            .capabilities
            .iter()
            .map(|c| c.letter().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        // Writing to a String cannot fail.
        let _ = write!(out, "{} {} [{}]", record.marker(), record.short_id, capabilities);
        if let Some(expires) = &record.expires_on {
            let _ = write!(out, " expires: {expires}");
        }
        if let Some(card) = record.token_serial_ref.as_deref().filter(|c| !c.is_empty()) {
            let _ = write!(out, " card-no: {card}");
        }
        out.push('\n');
    }
    out
}
