use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// A snapshot directory written before a risky operation.
///
/// Never modified or pruned after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

impl BackupRecord {
    pub const PUBLIC_KEY_FILE: &'static str = "public-key.asc";
    pub const TRUST_DB_FILE: &'static str = "trustdb.txt";
    pub const KEY_LIST_FILE: &'static str = "key-list.txt";

    /// Directory name for a backup taken at `at`.
    pub fn directory_name(at: &DateTime<Local>) -> String {
        format!("gpg-backup-{}", at.format("%Y%m%d-%H%M%S"))
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.path.join(Self::PUBLIC_KEY_FILE)
    }

    pub fn trust_db_path(&self) -> PathBuf {
        self.path.join(Self::TRUST_DB_FILE)
    }

    pub fn key_list_path(&self) -> PathBuf {
        self.path.join(Self::KEY_LIST_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
