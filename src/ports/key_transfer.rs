//! KeyTransfer trait - moving key material in and out of the keyring

use std::path::Path;

use crate::error::YkgpgResult;

/// Capability to export, import, delete and publish keys
pub trait KeyTransfer {
    /// Armored public key
    fn export_public_key(&self, key_id: &str) -> YkgpgResult<Vec<u8>>;

    /// Secret subkeys without the primary key's secret material
    ///
    /// May legitimately be empty or fail when every subkey already lives
    /// on a token.
    fn export_secret_subkeys(&self, key_id: &str) -> YkgpgResult<Vec<u8>>;

    /// Delete the secret key identified by its full fingerprint, without
    /// asking for confirmation
    fn delete_secret_key(&self, fingerprint: &str) -> YkgpgResult<()>;

    /// Delete the public key, without asking for confirmation
    fn delete_public_key(&self, key_id: &str) -> YkgpgResult<()>;

    /// Import key material from memory
    fn import_key(&self, key_data: &[u8]) -> YkgpgResult<()>;

    /// Import key material from a file, e.g. an offline master key backup
    fn import_key_file(&self, path: &Path) -> YkgpgResult<()>;

    /// Create an ed25519 signing subkey under the primary key without an
    /// interactive session. `expires` is a `YYYY-MM-DD` date.
    fn quick_add_signing_subkey(&self, fingerprint: &str, expires: &str) -> YkgpgResult<()>;

    /// Upload the public key to a keyserver
    fn send_keys(&self, keyserver: &str, key_id: &str) -> YkgpgResult<()>;
}
