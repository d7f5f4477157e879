use std::fmt;

use super::{CardStatus, KeyRecord};

/// Outcome of asking whether a usable token is attached.
///
/// "Present but blocked" is not a variant: it is reported as a
/// `TokenError` because the operator has to act on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPresence {
    Ready(CardStatus),
    Absent,
    /// The status query hit its deadline; the token may be waiting for a
    /// PIN, a touch, or a card selection.
    Inconclusive,
}

impl TokenPresence {
    pub fn card(&self) -> Option<&CardStatus> {
        match self {
            TokenPresence::Ready(card) => Some(card),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TokenPresence::Ready(_))
    }
}

/// Where the primary secret key currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKeyState {
    OnMachine,
    Offline,
}

impl MasterKeyState {
    /// State of the first primary record in a listing, if any.
    pub fn from_records(records: &[KeyRecord]) -> Option<Self> {
        records.iter().find(|r| r.is_primary()).map(|primary| {
            if primary.is_stub() {
                MasterKeyState::Offline
            } else {
                MasterKeyState::OnMachine
            }
        })
    }
}

impl fmt::Display for MasterKeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterKeyState::OnMachine => f.write_str("on machine"),
            MasterKeyState::Offline => f.write_str("offline"),
        }
    }
}
