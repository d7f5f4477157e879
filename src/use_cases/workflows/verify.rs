use tracing::info;

use crate::error::{TokenError, WorkflowError, YkgpgResult};
use crate::model::{CardStatus, KeyRecord, MasterKeyState, TokenPresence};
use crate::ports::{HostTools, KeyDirectory, Operator};
use crate::use_cases::signing_subkey::locate_signing_subkey;
use crate::use_cases::token_presence::detect_token;

use super::Workflow;

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    fn check(&self, what: &str, result: &str) {
        self.operator.line(&format!("Checking {what}... {result}"));
    }

    /// Run every health check and report how many failed.
    ///
    /// Only a missing primary key and a failed signing test count as
    /// failures; the rest are advice.
    pub fn verify(&mut self) -> YkgpgResult<()> {
        self.operator.header("Verify GPG/YubiKey Setup");
        let mut failed = 0;

        let records = self.check_primary_key(&mut failed);
        self.check_master_key(&records);
        let card = self.check_token();

        let subkey = locate_signing_subkey(&records, card.as_ref());
        match &subkey {
            Some(found) => {
                self.operator
                    .key_value("Signing subkey", &found.key_id);
                if found.is_guess() {
                    self.operator.info(
                        "Several tokens may hold signing subkeys; this is the first one listed",
                    );
                }
            }
            None => self.operator.warning("No signing subkey on a YubiKey found"),
        }

        self.check_git_config();

        match &subkey {
            Some(found) => {
                if !self.check_signing(&found.key_id)? {
                    failed += 1;
                }
            }
            None => {
                self.check("signing", "SKIPPED");
                self.operator
                    .info("Insert your YubiKey and run 'ykgpg verify' again to test signing");
            }
        }

        info!(failed, "verification finished");
        if failed == 0 {
            self.operator.success("All checks passed!");
            Ok(())
        } else {
            let err = WorkflowError::VerificationFailed { failed };
            self.operator.error(&err.to_string());
            Err(err.into())
        }
    }

    fn check_primary_key(&self, failed: &mut usize) -> Vec<KeyRecord> {
        match self.list_primary() {
            Ok(records) if !records.is_empty() => {
                self.check("primary key exists", "OK");
                records
            }
            Ok(_) => {
                self.check("primary key exists", "FAILED");
                *failed += 1;
                Vec::new()
            }
            Err(err) => {
                self.check("primary key exists", "FAILED");
                self.operator.warning(&err.to_string());
                *failed += 1;
                Vec::new()
            }
        }
    }

    fn check_master_key(&self, records: &[KeyRecord]) {
        match MasterKeyState::from_records(records) {
            Some(MasterKeyState::Offline) => self.check("master key offline", "OK (sec# = offline)"),
            Some(MasterKeyState::OnMachine) => {
                self.check("master key offline", "WARNING (master key is on this machine)");
                self.operator
                    .info("Run 'ykgpg remove-master-key' once the YubiKey holds your subkeys");
            }
            None => self.check("master key offline", "SKIPPED"),
        }
    }

    fn check_token(&self) -> Option<CardStatus> {
        match detect_token(self.directory, self.tools) {
            Ok(TokenPresence::Ready(card)) => {
                self.check("YubiKey present", &format!("OK (serial {})", card.serial));
                Some(card)
            }
            Ok(TokenPresence::Absent) => {
                self.check("YubiKey present", "NOT PRESENT");
                None
            }
            Ok(TokenPresence::Inconclusive) => {
                self.check("YubiKey present", "TIMEOUT");
                self.operator
                    .warning(&TokenError::Inconclusive.to_string());
                None
            }
            Err(err) => {
                self.check("YubiKey present", "NOT PRESENT");
                self.operator.warning(&err.to_string());
                None
            }
        }
    }

    fn check_git_config(&self) {
        let key_id = self.key_id().to_ascii_uppercase();
        let fingerprint = self.config.primary_key_fingerprint.replace(' ', "").to_ascii_uppercase();
        match self.tools.git_config("user.signingkey") {
            Ok(Some(value)) => {
                let upper = value.to_ascii_uppercase();
                let matches = (!key_id.is_empty() && upper.contains(&key_id))
                    || (!fingerprint.is_empty() && upper.contains(&fingerprint));
                if matches {
                    self.check("git signing key", "OK");
                } else {
                    self.check("git signing key", &format!("MISMATCH (configured: {value})"));
                }
            }
            Ok(None) => {
                self.check("git signing key", "NOT SET");
                self.operator
                    .info(&format!("Run: git config --global user.signingkey {}", self.key_id()));
            }
            Err(err) => {
                self.check("git signing key", "UNKNOWN");
                self.operator.warning(&err.to_string());
            }
        }

        match self.tools.git_config("commit.gpgsign") {
            Ok(Some(value)) if value == "true" => self.check("git commit signing", "OK"),
            Ok(_) => {
                self.check("git commit signing", "DISABLED");
                self.operator
                    .info("Run: git config --global commit.gpgsign true");
            }
            Err(err) => {
                self.check("git commit signing", "UNKNOWN");
                self.operator.warning(&err.to_string());
            }
        }
    }

    /// Batch signing first; when that needs a PIN, offer the interactive
    /// test. `false` only when an attempted signature failed.
    fn check_signing(&mut self, key_id: &str) -> YkgpgResult<bool> {
        if self.directory.sign_test_batch(key_id).is_ok() {
            self.check("signing", "OK");
            return Ok(true);
        }

        self.check("signing", "INTERACTIVE");
        self.operator
            .info("Signing needs your PIN or a touch on the YubiKey");
        if !self
            .operator
            .confirm("Run interactive signing test? (You'll need to enter your PIN)")?
        {
            self.operator.info(&format!(
                "Test manually with: echo test | gpg --clearsign --local-user {key_id}!"
            ));
            return Ok(true);
        }

        match self.directory.sign_test_interactive(key_id) {
            Ok(()) => {
                self.check("interactive signing", "OK");
                Ok(true)
            }
            Err(err) => {
                self.check("interactive signing", "FAILED");
                self.operator.warning(&err.to_string());
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::adapters::fake_keyring::{CardBehavior, FakeKeyDirectory, Operation};
    use crate::adapters::scripted_operator::ScriptedOperator;
    use crate::adapters::scripted_runner::ScriptedRunner;
    use crate::adapters::SystemTools;
    use crate::ports::contract_tests::{fixture_card, FIXTURE_KEY_ID};
    use crate::YkgpgError;

    fn git_configured() -> SystemTools<ScriptedRunner> {
        SystemTools::new(
            ScriptedRunner::new()
                .respond("git config --global user.signingkey", format!("{FIXTURE_KEY_ID}\n"))
                .respond("git config --global commit.gpgsign", "true\n"),
        )
    }

    #[test]
    fn test_healthy_setup_passes() {
        let backups = tempfile::tempdir().unwrap();
        let config = fixtures::config(backups.path());
        let directory =
            FakeKeyDirectory::with_listing(fixtures::OFFLINE_LISTING).with_card(fixture_card());
        let tools = git_configured();
        let mut op = ScriptedOperator::new();

        Workflow::new(&config, &directory, &tools, &mut op).verify().unwrap();

        assert!(op.said("Checking primary key exists... OK"));
        assert!(op.said("Checking master key offline... OK (sec# = offline)"));
        assert!(op.said("Checking YubiKey present... OK (serial 12345678)"));
        assert!(op.said("value: Signing subkey: DC47D1B090A51498"));
        assert!(op.said("Checking git signing key... OK"));
        assert!(op.said("Checking git commit signing... OK"));
        assert!(op.said("Checking signing... OK"));
        assert!(op.said("success: All checks passed!"));
        assert_eq!(directory.count("sign_test_batch"), 1);
        assert_eq!(directory.count("sign_test_interactive"), 0);
    }

    #[test]
    fn test_missing_primary_fails() {
        let backups = tempfile::tempdir().unwrap();
        let config = fixtures::config(backups.path());
        let directory = FakeKeyDirectory::empty();
        let tools = git_configured();
        let mut op = ScriptedOperator::new();

        let err = Workflow::new(&config, &directory, &tools, &mut op)
            .verify()
            .unwrap_err();

        assert!(matches!(
            err,
            YkgpgError::Workflow(WorkflowError::VerificationFailed { failed: 1 })
        ));
        assert!(op.said("Checking signing... SKIPPED"));
    }

    #[test]
    fn test_timeout_is_reported_not_failed() {
        let backups = tempfile::tempdir().unwrap();
        let config = fixtures::config(backups.path());
        let directory = FakeKeyDirectory::with_listing(fixtures::OFFLINE_LISTING)
            .with_card_behavior(CardBehavior::TimesOut);
        let tools = git_configured();
        let mut op = ScriptedOperator::new();

        Workflow::new(&config, &directory, &tools, &mut op).verify().unwrap();

        assert!(op.said("Checking YubiKey present... TIMEOUT"));
        // The listing still names a token-resident signing subkey.
        assert!(op.said("Checking signing... OK"));
    }

    #[test]
    fn test_interactive_signing_failure_counts() {
        let backups = tempfile::tempdir().unwrap();
        let config = fixtures::config(backups.path());
        let directory = FakeKeyDirectory::with_listing(fixtures::OFFLINE_LISTING)
            .with_card(fixture_card())
            .failing(Operation::SignTestBatch)
            .failing(Operation::SignTestInteractive);
        let tools = git_configured();
        let mut op = ScriptedOperator::new().confirm_with(true);

        let err = Workflow::new(&config, &directory, &tools, &mut op)
            .verify()
            .unwrap_err();

        assert!(matches!(
            err,
            YkgpgError::Workflow(WorkflowError::VerificationFailed { failed: 1 })
        ));
        assert!(op.said("Checking interactive signing... FAILED"));
    }

    #[test]
    fn test_declined_interactive_test_passes() {
        let backups = tempfile::tempdir().unwrap();
        let config = fixtures::config(backups.path());
        let directory = FakeKeyDirectory::with_listing(fixtures::OFFLINE_LISTING)
            .with_card(fixture_card())
            .failing(Operation::SignTestBatch);
        let tools = git_configured();
        let mut op = ScriptedOperator::new().confirm_with(false);

        Workflow::new(&config, &directory, &tools, &mut op).verify().unwrap();
        assert!(op.said("Test manually with: echo test | gpg --clearsign --local-user DC47D1B090A51498!"));
    }

    #[test]
    fn test_git_advice() {
        let backups = tempfile::tempdir().unwrap();
        let config = fixtures::config(backups.path());
        let directory =
            FakeKeyDirectory::with_listing(fixtures::OFFLINE_LISTING).with_card(fixture_card());
        let tools = SystemTools::new(
            ScriptedRunner::new()
                .respond("git config --global user.signingkey", "AAAABBBBCCCCDDDD\n")
                .fail("git config --global commit.gpgsign", 1, ""),
        );
        let mut op = ScriptedOperator::new();

        Workflow::new(&config, &directory, &tools, &mut op).verify().unwrap();

        assert!(op.said("Checking git signing key... MISMATCH (configured: AAAABBBBCCCCDDDD)"));
        assert!(op.said("Checking git commit signing... DISABLED"));
    }
}
