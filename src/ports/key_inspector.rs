//! KeyInspector trait - read-only queries against the keyring and token

use crate::error::YkgpgResult;
use crate::model::{CardStatus, KeyRecord};

/// Capability to look at the local keyring and the attached token
///
/// Every call re-queries live state; nothing is cached between calls.
pub trait KeyInspector {
    /// List secret keys matching `filter` (key id or fingerprint)
    ///
    /// # Returns
    ///
    /// Records in listing order. A filter that matches nothing yields an
    /// empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns errors if the listing command fails for any other reason
    fn list_secret_keys(&self, filter: &str) -> YkgpgResult<Vec<KeyRecord>>;

    /// List every secret key in the keyring
    fn list_all_secret_keys(&self) -> YkgpgResult<Vec<KeyRecord>>;

    /// The listing text exactly as gpg printed it, for display
    fn secret_key_listing(&self, filter: Option<&str>) -> YkgpgResult<String>;

    /// Query the attached token
    ///
    /// # Errors
    ///
    /// Returns errors if no token answers, the token refuses the OpenPGP
    /// application, or the query exceeds its deadline (see
    /// [`crate::YkgpgError::is_timeout`])
    fn card_status(&self) -> YkgpgResult<CardStatus>;
}
