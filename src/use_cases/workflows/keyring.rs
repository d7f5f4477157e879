//! Keyring housekeeping: public key export, manual backups, removing
//! keys that are no longer wanted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ConfigError, WorkflowError, YkgpgResult};
use crate::model::BackupRecord;
use crate::ports::{HostTools, KeyDirectory, Operator};

use super::Workflow;

/// `~/public-key-YYYYMMDD.asc`
pub fn default_export_path(home: &Path, today: NaiveDate) -> PathBuf {
    home.join(format!("public-key-{}.asc", today.format("%Y%m%d")))
}

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    /// Write the armored public key, by default into the home directory.
    pub fn export(&mut self, output: Option<&Path>) -> YkgpgResult<PathBuf> {
        self.operator.header("Export Public Key");
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
                default_export_path(&home, chrono::Local::now().date_naive())
            }
        };

        let armored = self.directory.export_public_key(self.key_id())?;
        fs::write(&path, &armored).map_err(|source| WorkflowError::Write {
            path: path.clone(),
            source,
        })?;

        self.operator
            .success(&format!("Public key exported to: {}", path.display()));
        self.operator.info("You can:");
        self.operator.line("  1. Upload to https://keys.openpgp.org/upload");
        self.operator
            .line("  2. Add to GitHub: Settings > SSH and GPG keys > New GPG key");
        self.operator
            .line("  3. Share with others for encrypted communication");
        Ok(path)
    }

    pub fn backup(&mut self) -> YkgpgResult<BackupRecord> {
        self.operator.header("Backup");
        let record = self.take_backup()?;
        for file in [
            BackupRecord::PUBLIC_KEY_FILE,
            BackupRecord::TRUST_DB_FILE,
            BackupRecord::KEY_LIST_FILE,
        ] {
            self.operator.line(&format!("  {file}"));
        }
        Ok(record)
    }

    /// Show what is in the keyring and delete keys one at a time. The
    /// configured primary key is never deleted.
    pub fn cleanup(&mut self) -> YkgpgResult<()> {
        self.operator.header("Cleanup Old Keys");

        self.operator.section("Current keys in keyring");
        let listing = self.directory.secret_key_listing(None)?;
        for line in listing.lines() {
            self.operator.line(line);
        }

        let others: Vec<String> = self
            .directory
            .list_all_secret_keys()?
            .into_iter()
            .filter(|r| r.is_primary() && !self.is_primary_id(&r.short_id))
            .map(|r| r.short_id)
            .collect();
        if !others.is_empty() {
            self.operator.section(&format!(
                "Keys other than your primary ({})",
                self.key_id()
            ));
            for id in &others {
                self.operator.line(&format!("  {id}"));
            }
        }

        self.operator.info("To delete a key by hand:");
        self.operator.line("  gpg --delete-secret-keys <KEY_ID>");
        self.operator.line("  gpg --delete-keys <KEY_ID>");

        if self
            .operator
            .confirm("Would you like to interactively delete keys?")?
        {
            self.delete_loop()?;
        }

        if self.operator.confirm("Clean up trust database?")? {
            match self.directory.check_trust_db() {
                Ok(()) => self.operator.success("Trust database cleaned"),
                Err(err) => self
                    .operator
                    .warning(&format!("Failed to check trustdb: {err}")),
            }
        }
        Ok(())
    }

    fn delete_loop(&mut self) -> YkgpgResult<()> {
        loop {
            let answer = self
                .operator
                .ask("Enter KEY ID to delete (or 'q' to quit)")?;
            let key = answer.trim();
            if key.eq_ignore_ascii_case("q") {
                return Ok(());
            }
            if key.is_empty() {
                continue;
            }
            if self.is_primary_id(key) {
                let refused = WorkflowError::ProtectedKey {
                    key_id: key.to_string(),
                };
                self.operator.error(&refused.to_string());
                continue;
            }
            if !self.operator.confirm(&format!("Delete {key}?"))? {
                continue;
            }

            if let Err(err) = self.directory.delete_secret_key(key) {
                self.operator
                    .warning(&format!("Failed to delete secret key: {err}"));
            }
            match self.directory.delete_public_key(key) {
                Ok(()) => self.operator.success(&format!("Deleted {key}")),
                Err(err) => self
                    .operator
                    .warning(&format!("Failed to delete public key: {err}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::adapters::fake_keyring::{FakeKeyDirectory, Operation, PUBLIC_KEY};
    use crate::adapters::scripted_operator::ScriptedOperator;
    use crate::adapters::scripted_runner::ScriptedRunner;
    use crate::adapters::SystemTools;
    use crate::ports::contract_tests::FIXTURE_LISTING;
    use crate::YkgpgError;

    fn tools() -> SystemTools<ScriptedRunner> {
        SystemTools::new(ScriptedRunner::new())
    }

    #[test]
    fn test_default_export_path() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 5).unwrap();
        assert_eq!(
            default_export_path(Path::new("/home/user"), today),
            PathBuf::from("/home/user/public-key-20250905.asc")
        );
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config(dir.path());
        let directory = FakeKeyDirectory::with_listing(FIXTURE_LISTING);
        let tools = tools();
        let mut op = ScriptedOperator::new();
        let target = dir.path().join("key.asc");

        let written = Workflow::new(&config, &directory, &tools, &mut op)
            .export(Some(&target))
            .unwrap();

        assert_eq!(written, target);
        assert_eq!(fs::read(&target).unwrap(), PUBLIC_KEY);
        assert_eq!(directory.calls(), vec!["export_public_key 07AAA1E535650AF5"]);
    }

    #[test]
    fn test_export_unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config(dir.path());
        let directory = FakeKeyDirectory::with_listing(FIXTURE_LISTING);
        let tools = tools();
        let mut op = ScriptedOperator::new();

        let err = Workflow::new(&config, &directory, &tools, &mut op)
            .export(Some(&dir.path().join("missing").join("key.asc")))
            .unwrap_err();
        assert!(matches!(err, YkgpgError::Workflow(WorkflowError::Write { .. })));
    }

    #[test]
    fn test_backup_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config(dir.path());
        let directory = FakeKeyDirectory::with_listing(FIXTURE_LISTING);
        let tools = tools();
        let mut op = ScriptedOperator::new();

        let record = Workflow::new(&config, &directory, &tools, &mut op)
            .backup()
            .unwrap();

        assert!(record.path.starts_with(dir.path()));
        assert!(op.said("line:   trustdb.txt"));
    }

    #[test]
    fn test_cleanup_deletes_other_keys_and_protects_primary() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config(dir.path());
        let directory = FakeKeyDirectory::with_listing(
            "\
sec#  ed25519/07AAA1E535650AF5 2025-09-05 [SC]
sec   rsa4096/1234567890ABCDEF 2015-01-01 [SC]
",
        );
        let tools = tools();
        let mut op = ScriptedOperator::new()
            .confirm_with(true) // interactive
            .answer("07aaa1e535650af5")
            .answer("1234567890ABCDEF")
            .confirm_with(true) // delete it
            .answer("q")
            .confirm_with(true); // trustdb

        Workflow::new(&config, &directory, &tools, &mut op)
            .cleanup()
            .unwrap();

        assert!(op.said("section: Keys other than your primary (07AAA1E535650AF5)"));
        assert!(op.said("line:   1234567890ABCDEF"));
        assert!(op.said("error: 07aaa1e535650af5 is the primary key"));
        assert!(directory
            .calls()
            .contains(&"delete_secret_key 1234567890ABCDEF".to_string()));
        assert_eq!(directory.count("delete_secret_key"), 1);
        assert!(op.said("success: Deleted 1234567890ABCDEF"));
        assert!(op.said("success: Trust database cleaned"));
    }

    #[test]
    fn test_cleanup_delete_failures_warn() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config(dir.path());
        let directory = FakeKeyDirectory::with_listing(FIXTURE_LISTING)
            .failing(Operation::DeleteSecretKey)
            .failing(Operation::CheckTrustDb);
        let tools = tools();
        let mut op = ScriptedOperator::new()
            .confirm_with(true)
            .answer("DEADBEEFDEADBEEF")
            .confirm_with(true)
            .answer("q")
            .confirm_with(true);

        Workflow::new(&config, &directory, &tools, &mut op)
            .cleanup()
            .unwrap();

        assert!(op.said("warning: Failed to delete secret key"));
        assert!(op.said("success: Deleted DEADBEEFDEADBEEF"));
        assert!(op.said("warning: Failed to check trustdb"));
    }
}
