use std::collections::BTreeMap;

use super::CardSlot;

/// Snapshot of the token reported by `gpg --card-status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardStatus {
    pub serial: String,
    /// Empty when the card reports `[not set]`.
    pub cardholder_name: String,
    pub manufacturer: Option<String>,
    /// Only provisioned slots are present.
    pub key_slots: BTreeMap<CardSlot, String>,
    /// Algorithm per slot in signature, encryption, authentication order.
    pub key_attributes: Vec<String>,
    /// User PIN, reset code and admin PIN retries.
    pub pin_retry_counters: Vec<u32>,
    pub signature_counter: Option<u64>,
}

impl CardStatus {
    pub fn slot_key(&self, slot: CardSlot) -> Option<&str> {
        self.key_slots.get(&slot).map(String::as_str)
    }

    pub fn signature_key(&self) -> Option<&str> {
        self.slot_key(CardSlot::Signature)
    }

    pub fn slot_attribute(&self, slot: CardSlot) -> Option<&str> {
        self.key_attributes
            .get(slot.attribute_index())
            .map(String::as_str)
    }

    /// True when the slot is configured for RSA, which cannot receive
    /// an ed25519/cv25519 key via `keytocard`.
    pub fn slot_expects_rsa(&self, slot: CardSlot) -> bool {
        self.slot_attribute(slot)
            .is_some_and(|attr| attr.to_ascii_lowercase().starts_with("rsa"))
    }

    pub fn user_pin_retries(&self) -> Option<u32> {
        self.pin_retry_counters.first().copied()
    }

    pub fn admin_pin_retries(&self) -> Option<u32> {
        self.pin_retry_counters.get(2).copied()
    }

    /// Forms the serial takes in a `card-no:` line of the key listing.
    pub fn card_number_forms(&self) -> [String; 2] {
        [format!("0006 {}", self.serial), format!("0006{}", self.serial)]
    }
}
