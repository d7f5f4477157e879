mod backup;
mod card_status;
mod fingerprint;
mod key_record;
mod slot;
mod token;

pub use backup::BackupRecord;
pub use card_status::CardStatus;
pub use fingerprint::{Fingerprint, FingerprintError};
pub use key_record::{Capability, KeyKind, KeyRecord, StubMarker};
pub use slot::{CardSlot, SlotError};
pub use token::{MasterKeyState, TokenPresence};
