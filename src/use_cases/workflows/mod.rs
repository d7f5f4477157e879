//! Operator workflows
//!
//! One method per subcommand on [`Workflow`], which carries the effective
//! configuration and the service handles explicitly. Every step that
//! touches key material is confirmed through the operator first.

mod card;
mod configure;
mod keyring;
mod maintenance;
mod provisioning;
mod status;
mod verify;

use std::fs;
use std::path::PathBuf;

use tracing::warn;

pub use configure::{config_init, config_show, ConfigSources};
pub use keyring::default_export_path;

use crate::config::Config;
use crate::error::{TokenError, WorkflowError, YkgpgError, YkgpgResult};
use crate::model::{BackupRecord, CardStatus, Fingerprint, KeyRecord, MasterKeyState};
use crate::ports::{HostTools, KeyDirectory, Operator};
use crate::use_cases::backup::create_backup;
use crate::use_cases::master_key::{take_master_key_offline, OfflineOutcome};
use crate::use_cases::token_presence::require_token;

const MANUAL_UPLOAD_URL: &str = "https://keys.openpgp.org/upload";

/// Configuration and services for one command invocation.
pub struct Workflow<'a, D: ?Sized, H: ?Sized, O: ?Sized> {
    config: &'a Config,
    directory: &'a D,
    tools: &'a H,
    operator: &'a mut O,
}

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    pub fn new(config: &'a Config, directory: &'a D, tools: &'a H, operator: &'a mut O) -> Self {
        Self {
            config,
            directory,
            tools,
            operator,
        }
    }

    fn key_id(&self) -> &'a str {
        self.config.primary_key_id.as_str()
    }

    fn fingerprint(&self) -> YkgpgResult<Fingerprint> {
        Ok(self.config.fingerprint()?)
    }

    fn list_primary(&self) -> YkgpgResult<Vec<KeyRecord>> {
        self.directory.list_secret_keys(self.key_id())
    }

    /// A usable token, or an error after telling the operator what to do.
    fn require_card(&mut self) -> YkgpgResult<CardStatus> {
        match require_token(self.directory, self.tools) {
            Ok(card) => {
                self.operator
                    .info(&format!("Detected YubiKey with serial: {}", card.serial));
                Ok(card)
            }
            Err(err) => {
                self.explain_token_error(&err);
                Err(err)
            }
        }
    }

    fn explain_token_error(&self, err: &YkgpgError) {
        let op = &*self.operator;
        op.error(&err.to_string());
        match err {
            YkgpgError::Token(TokenError::ProtocolUnsupported) => {
                op.info("To check your YubiKey capabilities:");
                op.line("  - Install ykman: https://github.com/Yubico/yubikey-manager");
                op.line("  - Run: ykman info");
                op.info("YubiKey models with OpenPGP:");
                op.line("  - YubiKey 4 series and later");
                op.line("  - YubiKey 5 series");
                op.line("  - Some YubiKey NEO models");
            }
            YkgpgError::Token(TokenError::NotInitialized) => {
                op.info("To initialize a blank YubiKey for OpenPGP:");
                op.line("  1. Run: gpg --card-edit");
                op.line("  2. Type: admin");
                op.line("  3. Type: factory-reset (WARNING: this erases all data!)");
                op.line("  4. Type: yes to confirm");
                op.line("  5. Type: quit");
                op.info("Alternatively, with ykman installed:");
                op.line("  ykman openpgp reset");
            }
            _ => {}
        }
    }

    fn take_backup(&mut self) -> YkgpgResult<BackupRecord> {
        self.operator.info("Creating backup before making changes...");
        let record = create_backup(self.directory, self.key_id(), &self.config.backup_dir)?;
        self.operator
            .success(&format!("Backup created at {}", record.path.display()));
        Ok(record)
    }

    fn master_key_path(&mut self) -> YkgpgResult<PathBuf> {
        let path = match &self.config.master_key_path {
            Some(path) => path.clone(),
            None => {
                self.operator
                    .line("Enter the path to your master secret key backup,");
                self.operator
                    .line("typically on a USB drive, e.g. /media/usb/master-key.gpg");
                PathBuf::from(self.operator.ask_required("Master key path")?)
            }
        };
        if let Err(source) = fs::metadata(&path) {
            return Err(WorkflowError::MasterKeyFileMissing { path, source }.into());
        }
        Ok(path)
    }

    /// Import the offline master key and check that it is usable.
    fn import_master_key(&mut self) -> YkgpgResult<()> {
        let path = self.master_key_path()?;
        self.operator.info("Importing master key...");
        self.directory.import_key_file(&path)?;

        let records = self.list_primary()?;
        if MasterKeyState::from_records(&records) != Some(MasterKeyState::OnMachine) {
            return Err(WorkflowError::MasterKeyUnavailable.into());
        }
        self.operator.success("Master key imported");
        Ok(())
    }

    /// Run `body` with the offline master key imported. If `body` fails, the
    /// master key is taken offline again before the error is returned.
    fn with_master_key<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> YkgpgResult<T>,
    ) -> YkgpgResult<T> {
        self.import_master_key()?;
        let result = body(self);
        if let Err(err) = &result {
            warn!(%err, "step failed with the master key imported");
            self.remove_master_key_or_warn();
        }
        result
    }

    /// Take the master key offline, reporting failure as a warning.
    fn remove_master_key_or_warn(&mut self) {
        let result = self
            .fingerprint()
            .and_then(|fingerprint| take_master_key_offline(self.directory, &fingerprint));
        match result {
            Ok(OfflineOutcome::Removed { .. }) => {
                self.operator.success("Master key removed from local keyring")
            }
            Ok(OfflineOutcome::AlreadyOffline) | Ok(OfflineOutcome::NoSecretKey) => {}
            Err(err) => {
                warn!(%err, "master key removal failed");
                self.operator
                    .warning(&format!("Failed to remove master key: {err}"));
            }
        }
    }

    fn offer_master_key_removal(&mut self) -> YkgpgResult<()> {
        if self.operator.confirm("Remove master key from local machine?")? {
            self.remove_master_key_or_warn();
        } else {
            self.operator
                .warning("Master key left on machine. Remember to remove it manually!");
        }
        Ok(())
    }

    /// Keyserver upload. Failure only warns.
    fn offer_upload(&mut self) -> YkgpgResult<()> {
        let keyserver = self.config.keyserver.as_str();
        if !self
            .operator
            .confirm(&format!("Upload updated public key to {keyserver}?"))?
        {
            return Ok(());
        }
        self.operator.info("Uploading to keyserver...");
        match self.directory.send_keys(keyserver, self.key_id()) {
            Ok(()) => self
                .operator
                .success(&format!("Public key uploaded to {keyserver}")),
            Err(err) => {
                self.operator
                    .warning(&format!("Failed to upload to keyserver: {err}"));
                self.operator
                    .warning(&format!("Visit {MANUAL_UPLOAD_URL} to upload manually."));
            }
        }
        Ok(())
    }

    /// True when `id` names the configured primary key.
    fn is_primary_id(&self, id: &str) -> bool {
        id.trim().eq_ignore_ascii_case(self.key_id())
            || self
                .config
                .fingerprint()
                .is_ok_and(|fingerprint| fingerprint.matches(id))
    }
}
