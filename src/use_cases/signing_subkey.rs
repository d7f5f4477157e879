//! Which signing subkey lives on the attached token

use crate::model::{CardStatus, KeyRecord, StubMarker};

/// How a signing subkey was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubkeySource {
    /// The token's Signature slot named it.
    SignatureSlot,
    /// Its `card-no` reference matches the token's serial.
    CardNumber,
    /// First token-resident signing subkey in listing order. A guess when
    /// several tokens have held subkeys.
    FirstOnToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningSubkey {
    /// Identifier to pass to gpg.
    pub key_id: String,
    pub source: SubkeySource,
}

impl SigningSubkey {
    pub fn is_guess(&self) -> bool {
        self.source == SubkeySource::FirstOnToken
    }
}

fn compact(id: &str) -> String {
    id.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn signing_subkeys(records: &[KeyRecord]) -> impl Iterator<Item = &KeyRecord> {
    records.iter().filter(|r| !r.is_primary() && r.can_sign())
}

fn on_some_token(record: &KeyRecord) -> bool {
    record.token_serial_ref.as_deref().is_some_and(|s| !s.is_empty())
        || record.stub == Some(StubMarker::OnToken)
}

/// Find the signing subkey on `card`, falling back through weaker signals.
pub fn locate_signing_subkey(records: &[KeyRecord], card: Option<&CardStatus>) -> Option<SigningSubkey> {
    if let Some(card) = card {
        if let Some(slot_fingerprint) = card.signature_key().map(compact).filter(|f| !f.is_empty()) {
            // The slot holds a fingerprint; prefer the listing's own id for it.
            let key_id = signing_subkeys(records)
                .find(|r| !r.short_id.is_empty() && slot_fingerprint.ends_with(&compact(&r.short_id)))
                .map(|r| r.selector().to_string())
                .unwrap_or(slot_fingerprint);
            return Some(SigningSubkey {
                key_id,
                source: SubkeySource::SignatureSlot,
            });
        }

        let forms = card.card_number_forms();
        if let Some(record) = signing_subkeys(records).find(|r| {
            r.token_serial_ref
                .as_deref()
                .is_some_and(|serial| forms.iter().any(|form| form == serial))
        }) {
            return Some(SigningSubkey {
                key_id: record.selector().to_string(),
                source: SubkeySource::CardNumber,
            });
        }
    }

    signing_subkeys(records)
        .find(|r| on_some_token(r))
        .map(|record| SigningSubkey {
            key_id: record.selector().to_string(),
            source: SubkeySource::FirstOnToken,
        })
}
