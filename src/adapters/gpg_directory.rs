//! Key directory backed by the `gpg` command line
//!
//! Each operation builds one fixed argument vector. Changing the flags or
//! their order changes what gpg prints and must be treated as a breaking
//! change.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{DirectoryError, ExecError, YkgpgResult};
use crate::logic::{parse_card_status, parse_key_list};
use crate::model::{CardStatus, KeyRecord};
use crate::ports::{
    CommandRunner, Invocation, KeyEditor, KeyInspector, KeyTransfer, TrustStore,
};

const GPG: &str = "gpg";
const NO_SECRET_KEY: &str = "No secret key";
const SIGN_TEST_MESSAGE: &str = "test\n";

/// gpg keyring and card access through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct GpgKeyDirectory<R> {
    runner: R,
    probe_timeout: Duration,
}

impl<R: CommandRunner> GpgKeyDirectory<R> {
    /// Deadline for passive queries that gpg may stall on (card status,
    /// batch signing).
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(runner: R) -> Self {
        Self {
            runner,
            probe_timeout: Self::DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn gpg<I, S>(args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(GPG).args(args)
    }

    fn listing(&self, filter: Option<&str>) -> Result<Vec<u8>, ExecError> {
        let mut invocation = Self::gpg(["--list-secret-keys", "--keyid-format=long"]);
        if let Some(filter) = filter {
            invocation = invocation.arg(filter);
        }
        match self.runner.run(&invocation) {
            Err(err) if matches_nothing(&err) => {
                debug!(filter, "no secret key matches");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn import_path(&self, path: &Path) -> YkgpgResult<()> {
        let invocation = Self::gpg(["--import".to_string(), path.to_string_lossy().into_owned()]);
        self.runner
            .run(&invocation)
            .map_err(DirectoryError::ImportKey)?;
        Ok(())
    }
}

/// gpg exits non-zero when the listing filter matches no key.
fn matches_nothing(err: &ExecError) -> bool {
    err.stderr().is_some_and(|stderr| stderr.contains(NO_SECRET_KEY))
}

impl<R: CommandRunner> KeyInspector for GpgKeyDirectory<R> {
    fn list_secret_keys(&self, filter: &str) -> YkgpgResult<Vec<KeyRecord>> {
        let output = self
            .listing(Some(filter))
            .map_err(DirectoryError::ListSecretKeys)?;
        Ok(parse_key_list(&String::from_utf8_lossy(&output)))
    }

    fn list_all_secret_keys(&self) -> YkgpgResult<Vec<KeyRecord>> {
        let output = self.listing(None).map_err(DirectoryError::ListSecretKeys)?;
        Ok(parse_key_list(&String::from_utf8_lossy(&output)))
    }

    fn secret_key_listing(&self, filter: Option<&str>) -> YkgpgResult<String> {
        let output = self.listing(filter).map_err(DirectoryError::ListSecretKeys)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn card_status(&self) -> YkgpgResult<CardStatus> {
        let invocation = Self::gpg(["--card-status"]).timeout(self.probe_timeout);
        let output = self
            .runner
            .run(&invocation)
            .map_err(DirectoryError::CardStatus)?;
        Ok(parse_card_status(&String::from_utf8_lossy(&output)))
    }
}

impl<R: CommandRunner> KeyTransfer for GpgKeyDirectory<R> {
    fn export_public_key(&self, key_id: &str) -> YkgpgResult<Vec<u8>> {
        Ok(self
            .runner
            .run(&Self::gpg(["--export", "--armor", key_id]))
            .map_err(DirectoryError::ExportPublicKey)?)
    }

    fn export_secret_subkeys(&self, key_id: &str) -> YkgpgResult<Vec<u8>> {
        Ok(self
            .runner
            .run(&Self::gpg(["--export-secret-subkeys", key_id]))
            .map_err(DirectoryError::ExportSecretSubkeys)?)
    }

    fn delete_secret_key(&self, fingerprint: &str) -> YkgpgResult<()> {
        info!(fingerprint, "deleting secret key");
        self.runner
            .run(&Self::gpg(["--batch", "--yes", "--delete-secret-keys", fingerprint]))
            .map_err(DirectoryError::DeleteSecretKey)?;
        Ok(())
    }

    fn delete_public_key(&self, key_id: &str) -> YkgpgResult<()> {
        info!(key_id, "deleting public key");
        self.runner
            .run(&Self::gpg(["--batch", "--yes", "--delete-keys", key_id]))
            .map_err(DirectoryError::DeletePublicKey)?;
        Ok(())
    }

    fn import_key(&self, key_data: &[u8]) -> YkgpgResult<()> {
        // gpg wants a path here. The file is private to this user and is
        // removed when `staged` drops, whatever the outcome.
        let mut staged = tempfile::Builder::new()
            .prefix("gpg-import-")
            .suffix(".gpg")
            .tempfile()
            .map_err(DirectoryError::TempFile)?;
        staged
            .write_all(key_data)
            .and_then(|()| staged.flush())
            .map_err(DirectoryError::TempFile)?;
        self.import_path(staged.path())
    }

    fn import_key_file(&self, path: &Path) -> YkgpgResult<()> {
        self.import_path(path)
    }

    fn quick_add_signing_subkey(&self, fingerprint: &str, expires: &str) -> YkgpgResult<()> {
        info!(fingerprint, expires, "creating signing subkey");
        self.runner
            .run(&Self::gpg([
                "--batch",
                "--passphrase-fd",
                "0",
                "--quick-add-key",
                fingerprint,
                "ed25519",
                "sign",
                expires,
            ]))
            .map_err(DirectoryError::AddSubkey)?;
        Ok(())
    }

    fn send_keys(&self, keyserver: &str, key_id: &str) -> YkgpgResult<()> {
        info!(keyserver, key_id, "uploading public key");
        self.runner
            .run(&Self::gpg(["--keyserver", keyserver, "--send-keys", key_id]))
            .map_err(DirectoryError::SendKeys)?;
        Ok(())
    }
}

impl<R: CommandRunner> TrustStore for GpgKeyDirectory<R> {
    fn export_owner_trust(&self) -> YkgpgResult<Vec<u8>> {
        Ok(self
            .runner
            .run(&Self::gpg(["--export-ownertrust"]))
            .map_err(DirectoryError::ExportOwnerTrust)?)
    }

    fn check_trust_db(&self) -> YkgpgResult<()> {
        self.runner
            .run(&Self::gpg(["--check-trustdb"]))
            .map_err(DirectoryError::CheckTrustDb)?;
        Ok(())
    }
}

impl<R: CommandRunner> KeyEditor for GpgKeyDirectory<R> {
    fn edit_key(&self, key_id: &str) -> YkgpgResult<()> {
        self.runner
            .run_interactive(&Self::gpg(["--edit-key", key_id]))
            .map_err(DirectoryError::EditKey)?;
        Ok(())
    }

    fn edit_card(&self) -> YkgpgResult<()> {
        self.runner
            .run_interactive(&Self::gpg(["--card-edit"]))
            .map_err(DirectoryError::EditCard)?;
        Ok(())
    }

    fn sign_test_batch(&self, key_id: &str) -> YkgpgResult<()> {
        let invocation = Self::gpg([
            "--batch",
            "--pinentry-mode=loopback",
            "--default-key",
            key_id,
            "--sign",
            "--armor",
        ])
        .stdin(SIGN_TEST_MESSAGE)
        .timeout(self.probe_timeout);
        self.runner
            .run(&invocation)
            .map_err(DirectoryError::SignTest)?;
        Ok(())
    }

    fn sign_test_interactive(&self, key_id: &str) -> YkgpgResult<()> {
        let mut message = tempfile::Builder::new()
            .prefix("ykgpg-test-")
            .suffix(".txt")
            .tempfile()
            .map_err(DirectoryError::TempFile)?;
        message
            .write_all(SIGN_TEST_MESSAGE.as_bytes())
            .and_then(|()| message.flush())
            .map_err(DirectoryError::TempFile)?;

        let invocation = Self::gpg([
            "--quiet".to_string(),
            "--default-key".to_string(),
            key_id.to_string(),
            "--sign".to_string(),
            "--armor".to_string(),
            "--output".to_string(),
            "/dev/null".to_string(),
            message.path().to_string_lossy().into_owned(),
        ]);
        self.runner
            .run_interactive(&invocation)
            .map_err(DirectoryError::SignTest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted_runner::ScriptedRunner;
    use crate::model::{CardSlot, StubMarker};
    use crate::YkgpgError;

    const LISTING: &str = "\
sec#  ed25519/07AAA1E535650AF5 2025-09-05 [SC] [expires: 2030-09-04]
      52A1B2C3D4E5F60718293A4B07AAA1E535650AF5
uid                 [ultimate] Test User <test@example.com>
ssb>  ed25519/DC47D1B090A51498 2025-09-05 [S] [expires: 2030-09-04]
      card-no: 0006 12345678
";

    fn directory(runner: ScriptedRunner) -> GpgKeyDirectory<ScriptedRunner> {
        GpgKeyDirectory::new(runner)
    }

    #[test]
    fn test_list_secret_keys_argument_vector() {
        let runner = ScriptedRunner::new().respond(
            "gpg --list-secret-keys --keyid-format=long 07AAA1E535650AF5",
            LISTING,
        );
        let dir = directory(runner);

        let records = dir.list_secret_keys("07AAA1E535650AF5").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].stub, Some(StubMarker::Offline));
        assert_eq!(
            dir.runner().calls(),
            vec!["gpg --list-secret-keys --keyid-format=long 07AAA1E535650AF5"]
        );
    }

    #[test]
    fn test_list_without_match_is_empty() {
        let runner = ScriptedRunner::new().fail(
            "gpg --list-secret-keys --keyid-format=long DEADBEEFDEADBEEF",
            2,
            "gpg: error reading key: No secret key\n",
        );
        let records = directory(runner)
            .list_secret_keys("DEADBEEFDEADBEEF")
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_list_failure_is_wrapped() {
        let runner = ScriptedRunner::new().fail(
            "gpg --list-secret-keys --keyid-format=long ABC",
            2,
            "gpg: keybox '/root/.gnupg/pubring.kbx' is corrupt\n",
        );
        let err = directory(runner).list_secret_keys("ABC").unwrap_err();
        assert!(matches!(
            err,
            YkgpgError::Directory(DirectoryError::ListSecretKeys(_))
        ));
        assert!(err.to_string().contains("failed to list secret keys"));
    }

    #[test]
    fn test_card_status_is_bounded() {
        let runner = ScriptedRunner::new().respond(
            "gpg --card-status",
            "Serial number ....: 12345678\nSignature key ....: ABC123\n",
        );
        let dir = directory(runner).with_probe_timeout(Duration::from_secs(1));

        let status = dir.card_status().unwrap();
        assert_eq!(status.serial, "12345678");
        assert_eq!(status.slot_key(CardSlot::Signature), Some("ABC123"));
        assert_eq!(
            dir.runner().invocations()[0].deadline(),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_card_status_timeout_is_recognisable() {
        let runner = ScriptedRunner::new().time_out("gpg --card-status");
        let err = directory(runner).card_status().unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_export_and_delete_argument_vectors() {
        let runner = ScriptedRunner::new()
            .respond("gpg --export --armor ABC", "-----BEGIN PGP PUBLIC KEY BLOCK-----")
            .respond("gpg --export-secret-subkeys ABC", "subkeys");
        let dir = directory(runner);

        assert_eq!(
            dir.export_public_key("ABC").unwrap(),
            b"-----BEGIN PGP PUBLIC KEY BLOCK-----"
        );
        assert_eq!(dir.export_secret_subkeys("ABC").unwrap(), b"subkeys");
        dir.delete_secret_key("52A1B2C3D4E5F60718293A4B07AAA1E535650AF5")
            .unwrap();
        dir.delete_public_key("ABC").unwrap();

        assert_eq!(
            dir.runner().calls(),
            vec![
                "gpg --export --armor ABC",
                "gpg --export-secret-subkeys ABC",
                "gpg --batch --yes --delete-secret-keys 52A1B2C3D4E5F60718293A4B07AAA1E535650AF5",
                "gpg --batch --yes --delete-keys ABC",
            ]
        );
    }

    #[test]
    fn test_import_stages_a_temporary_file() {
        let dir = directory(ScriptedRunner::new());
        dir.import_key(b"key material").unwrap();

        let invocation = &dir.runner().invocations()[0];
        assert_eq!(invocation.program(), "gpg");
        assert_eq!(invocation.arguments()[0], "--import");
        let staged = Path::new(&invocation.arguments()[1]);
        assert!(staged
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with("gpg-import-")));
        // Removed once the import returns.
        assert!(!staged.exists());
    }

    #[test]
    fn test_import_failure_still_removes_the_file() {
        let runner = ScriptedRunner::new().fail("gpg --import", 2, "gpg: no valid OpenPGP data found.");
        let dir = directory(runner);

        let err = dir.import_key(b"junk").unwrap_err();
        assert!(matches!(err, YkgpgError::Directory(DirectoryError::ImportKey(_))));
        let staged = Path::new(&dir.runner().invocations()[0].arguments()[1]).to_path_buf();
        assert!(!staged.exists());
    }

    #[test]
    fn test_trust_database_argument_vectors() {
        let runner = ScriptedRunner::new().respond("gpg --export-ownertrust", "ABC:6:\n");
        let dir = directory(runner);

        assert_eq!(dir.export_owner_trust().unwrap(), b"ABC:6:\n");
        dir.check_trust_db().unwrap();
        assert_eq!(
            dir.runner().calls(),
            vec!["gpg --export-ownertrust", "gpg --check-trustdb"]
        );
    }

    #[test]
    fn test_interactive_sessions() {
        let dir = directory(ScriptedRunner::new());
        dir.edit_key("07AAA1E535650AF5").unwrap();
        dir.edit_card().unwrap();

        assert_eq!(
            dir.runner().interactive_calls(),
            vec!["gpg --edit-key 07AAA1E535650AF5", "gpg --card-edit"]
        );
        assert!(dir.runner().calls().is_empty());
    }

    #[test]
    fn test_send_keys_argument_vector() {
        let dir = directory(ScriptedRunner::new());
        dir.send_keys("hkps://keys.openpgp.org", "ABC").unwrap();
        assert_eq!(
            dir.runner().calls(),
            vec!["gpg --keyserver hkps://keys.openpgp.org --send-keys ABC"]
        );
    }

    #[test]
    fn test_quick_add_signing_subkey_argument_vector() {
        let dir = directory(ScriptedRunner::new());
        dir.quick_add_signing_subkey("52A1B2C3D4E5F60718293A4B07AAA1E535650AF5", "2031-10-19")
            .unwrap();
        assert_eq!(
            dir.runner().calls(),
            vec!["gpg --batch --passphrase-fd 0 --quick-add-key 52A1B2C3D4E5F60718293A4B07AAA1E535650AF5 ed25519 sign 2031-10-19"]
        );
        assert!(dir.runner().interactive_calls().is_empty());
    }

    #[test]
    fn test_quick_add_failure_is_wrapped() {
        let runner = ScriptedRunner::new().fail(
            "gpg --batch --passphrase-fd 0 --quick-add-key",
            2,
            "gpg: signing failed: No secret key\n",
        );
        let err = directory(runner)
            .quick_add_signing_subkey("52A1B2C3D4E5F60718293A4B07AAA1E535650AF5", "2031-10-19")
            .unwrap_err();
        assert!(matches!(err, YkgpgError::Directory(DirectoryError::AddSubkey(_))));
        assert!(err.to_string().contains("failed to create subkey"));
    }

    #[test]
    fn test_batch_sign_test_feeds_message_with_deadline() {
        let dir = directory(ScriptedRunner::new());
        dir.sign_test_batch("DC47D1B090A51498").unwrap();

        let invocation = &dir.runner().invocations()[0];
        assert_eq!(
            invocation.to_string(),
            "gpg --batch --pinentry-mode=loopback --default-key DC47D1B090A51498 --sign --armor"
        );
        assert_eq!(invocation.input(), Some(&b"test\n"[..]));
        assert_eq!(
            invocation.deadline(),
            Some(GpgKeyDirectory::<ScriptedRunner>::DEFAULT_PROBE_TIMEOUT)
        );
    }

    #[test]
    fn test_interactive_sign_test_signs_a_file() {
        let dir = directory(ScriptedRunner::new());
        dir.sign_test_interactive("DC47D1B090A51498").unwrap();

        let call = &dir.runner().interactive_calls()[0];
        assert!(call.starts_with(
            "gpg --quiet --default-key DC47D1B090A51498 --sign --armor --output /dev/null "
        ));
    }

    mod contract {
        use super::*;
        use crate::contract_tests_for;
        use crate::ports::contract_tests::{self, key_directory_contract, FIXTURE_KEY_ID};

        fn scripted_gpg() -> GpgKeyDirectory<ScriptedRunner> {
            let runner = ScriptedRunner::new()
                .respond(
                    &format!("gpg --list-secret-keys --keyid-format=long {FIXTURE_KEY_ID}"),
                    contract_tests::FIXTURE_LISTING,
                )
                .respond("gpg --card-status", contract_tests::FIXTURE_CARD_STATUS)
                .respond(
                    &format!("gpg --export --armor {FIXTURE_KEY_ID}"),
                    "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmDMEZ...\n",
                )
                .respond(
                    "gpg --export-ownertrust",
                    "52A1B2C3D4E5F60718293A4B07AAA1E535650AF5:6:\n",
                );
            GpgKeyDirectory::new(runner)
        }

        contract_tests_for!(
            gpg_key_directory_contract,
            make = scripted_gpg,
            tests = {
                test_lists_fixture_key => key_directory_contract::test_lists_fixture_key,
                test_card_status_reports_serial => key_directory_contract::test_card_status_reports_serial,
                test_exports_armored_public_key => key_directory_contract::test_exports_armored_public_key,
                test_exports_owner_trust => key_directory_contract::test_exports_owner_trust,
                test_import_accepts_key_material => key_directory_contract::test_import_accepts_key_material,
                test_interactive_session_succeeds => key_directory_contract::test_interactive_session_succeeds,
            }
        );
    }
}
