//! Error types for ykgpg
//!
//! This module defines the error hierarchy for all ykgpg operations.
//! Errors are organized by layer and use thiserror for implementation.
//! Every error that crosses a layer boundary says what was being attempted.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::model::FingerprintError;

/// Result type alias for ykgpg operations
pub type YkgpgResult<T> = Result<T, YkgpgError>;

/// Top-level error type for all ykgpg operations
#[derive(Error, Debug)]
pub enum YkgpgError {
    /// Running an external program failed
    #[error("Command error: {0}")]
    Exec(#[from] ExecError),

    /// A gpg key directory operation failed
    #[error("Key directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Token detection or capability errors
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Master key online/offline transition errors
    #[error("Master key error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Backup snapshot errors
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Operator prompt errors
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Workflow precondition and verification errors
    #[error("{0}")]
    Workflow(#[from] WorkflowError),
}

impl YkgpgError {
    /// The underlying command failure, if this error came from one.
    pub fn exec_error(&self) -> Option<&ExecError> {
        match self {
            YkgpgError::Exec(err) => Some(err),
            YkgpgError::Directory(err) => err.exec_error(),
            _ => None,
        }
    }

    /// True when the failure was a command hitting its deadline.
    pub fn is_timeout(&self) -> bool {
        self.exec_error().is_some_and(ExecError::is_timeout)
    }
}

/// External program failures
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program could not be started (missing, not executable)
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The program exited with a non-zero status
    #[error("`{command}` failed with exit code {code}{}", diagnostic_suffix(.stderr))]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The program was terminated by a signal
    #[error("`{command}` was terminated by a signal{}", diagnostic_suffix(.stderr))]
    Signalled { command: String, stderr: String },

    /// The program did not finish before its deadline and was killed
    #[error("`{command}` timed out after {after:?}")]
    TimedOut { command: String, after: Duration },

    /// Feeding input to or collecting output from the child failed
    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::TimedOut { .. })
    }

    /// Captured standard error text, when there is any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecError::NonZeroExit { stderr, .. } | ExecError::Signalled { stderr, .. } => {
                Some(stderr.as_str())
            }
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

fn diagnostic_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// gpg key directory operation failures
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("failed to list secret keys: {0}")]
    ListSecretKeys(#[source] ExecError),

    #[error("failed to get card status: {0}")]
    CardStatus(#[source] ExecError),

    #[error("failed to export public key: {0}")]
    ExportPublicKey(#[source] ExecError),

    #[error("failed to export secret subkeys: {0}")]
    ExportSecretSubkeys(#[source] ExecError),

    #[error("failed to delete secret key: {0}")]
    DeleteSecretKey(#[source] ExecError),

    #[error("failed to delete public key: {0}")]
    DeletePublicKey(#[source] ExecError),

    #[error("failed to import key: {0}")]
    ImportKey(#[source] ExecError),

    #[error("failed to prepare temporary file: {0}")]
    TempFile(#[source] io::Error),

    #[error("failed to export ownertrust: {0}")]
    ExportOwnerTrust(#[source] ExecError),

    #[error("failed to check trustdb: {0}")]
    CheckTrustDb(#[source] ExecError),

    #[error("failed to edit key: {0}")]
    EditKey(#[source] ExecError),

    #[error("failed to edit card: {0}")]
    EditCard(#[source] ExecError),

    #[error("failed to create subkey: {0}")]
    AddSubkey(#[source] ExecError),

    #[error("failed to upload key to keyserver: {0}")]
    SendKeys(#[source] ExecError),

    #[error("signing test failed: {0}")]
    SignTest(#[source] ExecError),
}

impl DirectoryError {
    pub fn exec_error(&self) -> Option<&ExecError> {
        match self {
            DirectoryError::TempFile(_) => None,
            DirectoryError::ListSecretKeys(e)
            | DirectoryError::CardStatus(e)
            | DirectoryError::ExportPublicKey(e)
            | DirectoryError::ExportSecretSubkeys(e)
            | DirectoryError::DeleteSecretKey(e)
            | DirectoryError::DeletePublicKey(e)
            | DirectoryError::ImportKey(e)
            | DirectoryError::ExportOwnerTrust(e)
            | DirectoryError::CheckTrustDb(e)
            | DirectoryError::EditKey(e)
            | DirectoryError::EditCard(e)
            | DirectoryError::AddSubkey(e)
            | DirectoryError::SendKeys(e)
            | DirectoryError::SignTest(e) => Some(e),
        }
    }
}

/// Token presence and capability errors
#[derive(Error, Debug)]
pub enum TokenError {
    /// The token hardware has no OpenPGP application
    #[error(
        "YubiKey detected but does not support OpenPGP. This model (Security Key series) has no \
         OpenPGP application; only YubiKey 4, 5 and some NEO models do"
    )]
    ProtocolUnsupported,

    /// The OpenPGP application exists but has never been initialized
    #[error(
        "YubiKey detected but not initialized for OpenPGP. Initialize it with 'gpg --card-edit' \
         (admin, factory-reset) or 'ykman openpgp reset'"
    )]
    NotInitialized,

    /// No signal could decide whether OpenPGP is supported
    #[error("unable to determine whether the YubiKey supports OpenPGP. {guidance}")]
    SupportUnknown { guidance: String },

    /// The capability probe itself failed
    #[error("unable to check OpenPGP support: {reason}")]
    ProbeFailed { reason: String },

    /// No token is attached
    #[error("no YubiKey detected. Insert a YubiKey and try again")]
    NotDetected,

    /// The status query timed out
    #[error(
        "YubiKey detection timed out. gpg may be waiting for PIN entry, a touch, or a card \
         selection; run 'gpg --card-status' manually to see what it is waiting for"
    )]
    Inconclusive,
}

/// Master key lifecycle failures
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("could not determine where the master key lives: {0}")]
    Inspect(#[source] Box<YkgpgError>),

    /// Nothing has been deleted when this is returned
    #[error("public key export failed, nothing was deleted: {0}")]
    PublicKeyExport(#[source] Box<YkgpgError>),

    #[error("secret key deletion failed: {0}")]
    Delete(#[source] Box<YkgpgError>),

    /// The secret key is gone but the public key did not come back
    #[error(
        "secret key deleted but public key re-import failed: {0}. Re-import the public key from \
         the latest backup with 'gpg --import <backup>/public-key.asc'"
    )]
    PublicKeyReimport(#[source] Box<YkgpgError>),
}

/// Backup snapshot failures
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("failed to create backup directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to collect {what} for backup: {source}")]
    Collect {
        what: &'static str,
        #[source]
        source: Box<YkgpgError>,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("primary_key_fingerprint is invalid: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("cannot locate the home directory")]
    NoHomeDirectory,
}

/// Operator prompt errors
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("failed to read input: {reason}")]
    Input { reason: String },
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        PromptError::Input {
            reason: err.to_string(),
        }
    }
}

/// Workflow-level failures surfaced to the operator
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("primary key {key_id} not found in keyring")]
    PrimaryKeyNotFound { key_id: String },

    #[error("key ID not found: {key_id}")]
    KeyNotFound { key_id: String },

    #[error("{key_id} is the primary key; only subkeys can be changed here")]
    ProtectedKey { key_id: String },

    #[error("master key file not found at {}: {source}", .path.display())]
    MasterKeyFileMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("master key still shows as unavailable after import; the import may have failed")]
    MasterKeyUnavailable,

    #[error("no expiration provided")]
    NoExpiry,

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("verification failed: {failed} check(s) failed")]
    VerificationFailed { failed: usize },
}
