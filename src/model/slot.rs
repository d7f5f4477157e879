use std::fmt;
use thiserror::Error;

/// OpenPGP card key slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardSlot {
    Signature,
    Encryption,
    Authentication,
}

impl CardSlot {
    pub const ALL: [CardSlot; 3] = [
        CardSlot::Signature,
        CardSlot::Encryption,
        CardSlot::Authentication,
    ];

    pub fn default_signing() -> Self {
        Self::Signature
    }

    /// Label used by `gpg --card-status` in front of ` key`.
    pub fn label(self) -> &'static str {
        match self {
            CardSlot::Signature => "Signature",
            CardSlot::Encryption => "Encryption",
            CardSlot::Authentication => "Authentication",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, SlotError> {
        CardSlot::ALL
            .into_iter()
            .find(|slot| slot.label() == label)
            .ok_or_else(|| SlotError::Unsupported {
                slot: label.to_string(),
            })
    }

    /// Position of the slot in the card's `Key attributes` line.
    pub fn attribute_index(self) -> usize {
        match self {
            CardSlot::Signature => 0,
            CardSlot::Encryption => 1,
            CardSlot::Authentication => 2,
        }
    }
}

impl fmt::Display for CardSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Slot not supported: {slot}")]
    Unsupported { slot: String },
}
