//! Master key lifecycle use case
//!
//! Moves the primary secret key from the local keyring to offline storage.
//! The order of steps is what keeps the operation recoverable: nothing is
//! deleted until the public key has been exported, and only the deletion
//! itself is irreversible.

use tracing::{debug, info, warn};

use crate::error::{LifecycleError, YkgpgResult};
use crate::model::{Fingerprint, MasterKeyState};
use crate::ports::{KeyInspector, KeyTransfer};

/// What [`take_master_key_offline`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineOutcome {
    /// Only a stub was present; nothing was touched.
    AlreadyOffline,
    /// The keyring holds no secret primary key for this fingerprint.
    NoSecretKey,
    /// The secret key was deleted and the public key re-imported.
    Removed {
        /// Whether exported subkey material was imported back.
        subkeys_restored: bool,
    },
}

/// Where the primary secret key for `fingerprint` currently lives, or
/// `None` when the keyring has no secret primary key for it.
pub fn master_key_state<D>(directory: &D, fingerprint: &Fingerprint) -> YkgpgResult<Option<MasterKeyState>>
where
    D: KeyInspector + ?Sized,
{
    let records = directory.list_secret_keys(fingerprint.as_str())?;
    Ok(MasterKeyState::from_records(&records))
}

/// Take the master key offline.
///
/// Steps, in order:
/// 1. Inspect the listing; an offline stub makes this a no-op
/// 2. Export secret subkeys (failure tolerated, they may live on a token)
/// 3. Export the public key (failure aborts, nothing deleted yet)
/// 4. Delete the secret key by full fingerprint
/// 5. Re-import the public key
/// 6. Re-import the subkeys captured in step 2 (failure tolerated)
///
/// # Errors
///
/// Returns a `LifecycleError` naming the step that failed. After a
/// `PublicKeyReimport` error the secret key is already gone and the
/// public key must be restored from a backup.
pub fn take_master_key_offline<D>(directory: &D, fingerprint: &Fingerprint) -> YkgpgResult<OfflineOutcome>
where
    D: KeyInspector + KeyTransfer + ?Sized,
{
    let selector = fingerprint.as_str();

    let state = master_key_state(directory, fingerprint)
        .map_err(|err| LifecycleError::Inspect(Box::new(err)))?;
    match state {
        Some(MasterKeyState::Offline) => {
            info!(fingerprint = selector, "master key already offline");
            return Ok(OfflineOutcome::AlreadyOffline);
        }
        None => {
            info!(fingerprint = selector, "no secret primary key in keyring");
            return Ok(OfflineOutcome::NoSecretKey);
        }
        Some(MasterKeyState::OnMachine) => {}
    }

    let subkeys = match directory.export_secret_subkeys(selector) {
        Ok(data) if !data.is_empty() => Some(data),
        Ok(_) => None,
        Err(err) => {
            warn!(%err, "subkey export failed, continuing");
            None
        }
    };

    let public_key = directory
        .export_public_key(selector)
        .map_err(|err| LifecycleError::PublicKeyExport(Box::new(err)))?;

    directory
        .delete_secret_key(selector)
        .map_err(|err| LifecycleError::Delete(Box::new(err)))?;
    info!(fingerprint = selector, "secret key deleted");

    directory
        .import_key(&public_key)
        .map_err(|err| LifecycleError::PublicKeyReimport(Box::new(err)))?;

    let subkeys_restored = match subkeys {
        Some(data) => match directory.import_key(&data) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "subkey re-import failed; stubs return when the token is used");
                false
            }
        },
        None => {
            debug!("no subkey material to restore");
            false
        }
    };

    Ok(OfflineOutcome::Removed { subkeys_restored })
}
