//! Backup use case
//!
//! Writes a timestamped snapshot of the public key, the owner trust and a
//! readable key listing. A failed snapshot leaves its directory behind so
//! it can be inspected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{BackupError, YkgpgResult};
use crate::logic::render_key_list;
use crate::model::BackupRecord;
use crate::ports::{KeyInspector, KeyTransfer, TrustStore};

/// Snapshot `key_id` into a new directory under `root`, named after the
/// current local time.
pub fn create_backup<D>(directory: &D, key_id: &str, root: &Path) -> YkgpgResult<BackupRecord>
where
    D: KeyInspector + KeyTransfer + TrustStore + ?Sized,
{
    create_backup_at(directory, key_id, root, Local::now())
}

/// [`create_backup`] with an explicit timestamp.
///
/// Two snapshots taken within the same second get `-1`, `-2`, ...
/// suffixes instead of sharing a directory.
pub fn create_backup_at<D>(
    directory: &D,
    key_id: &str,
    root: &Path,
    at: DateTime<Local>,
) -> YkgpgResult<BackupRecord>
where
    D: KeyInspector + KeyTransfer + TrustStore + ?Sized,
{
    let path = reserve_directory(root, &BackupRecord::directory_name(&at))?;
    let record = BackupRecord {
        path,
        created_at: at,
    };

    let public_key = directory
        .export_public_key(key_id)
        .map_err(|err| collect_failed("public key", err))?;
    write_file(&record.public_key_path(), &public_key)?;

    let trust = directory
        .export_owner_trust()
        .map_err(|err| collect_failed("owner trust", err))?;
    write_file(&record.trust_db_path(), &trust)?;

    let records = directory
        .list_secret_keys(key_id)
        .map_err(|err| collect_failed("key listing", err))?;
    write_file(&record.key_list_path(), render_key_list(&records).as_bytes())?;

    info!(path = %record.path.display(), "backup created");
    Ok(record)
}

fn collect_failed(what: &'static str, err: crate::YkgpgError) -> BackupError {
    BackupError::Collect {
        what,
        source: Box::new(err),
    }
}

fn reserve_directory(root: &Path, name: &str) -> Result<PathBuf, BackupError> {
    fs::create_dir_all(root).map_err(|source| BackupError::CreateDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            root.join(name)
        } else {
            root.join(format!("{name}-{attempt}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => {
                return Err(BackupError::CreateDir {
                    path: candidate,
                    source,
                })
            }
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), BackupError> {
    fs::write(path, contents).map_err(|source| BackupError::Write {
        path: path.to_path_buf(),
        source,
    })
}
