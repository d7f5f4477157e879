//! Reading the OpenPGP row of `ykman info`

const NEGATIVE_MARKERS: [&str; 2] = ["not available", "disabled"];
const POSITIVE_MARKERS: [&str; 2] = ["enabled", "available"];

/// Whether the inventory reports the OpenPGP application.
///
/// `Some(false)` for a negative marker, `Some(true)` for a positive one,
/// `None` when no OpenPGP row says either. The first decisive row wins.
pub fn openpgp_support(inventory: &str) -> Option<bool> {
    inventory
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("OpenPGP"))
        .find_map(classify_row)
}

fn classify_row(row: &str) -> Option<bool> {
    let row = row.to_ascii_lowercase();
    // Negative markers are checked first: "not available" contains "available".
    if NEGATIVE_MARKERS.iter().any(|m| row.contains(m)) {
        Some(false)
    } else if POSITIVE_MARKERS.iter().any(|m| row.contains(m)) {
        Some(true)
    } else {
        None
    }
}
