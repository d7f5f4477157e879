//! In-memory key directory for tests
//!
//! Keeps just enough state to observe the effects of lifecycle steps:
//! deleting the secret key empties the listing, re-importing the exported
//! subkeys brings them back behind an offline primary stub.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{DirectoryError, ExecError, YkgpgResult};
use crate::logic::parse_key_list;
use crate::model::{CardStatus, KeyRecord, StubMarker};
use crate::ports::{KeyEditor, KeyInspector, KeyTransfer, TrustStore};

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListSecretKeys,
    ExportPublicKey,
    ExportSecretSubkeys,
    DeleteSecretKey,
    DeletePublicKey,
    ImportKey,
    AddSubkey,
    ExportOwnerTrust,
    CheckTrustDb,
    EditKey,
    EditCard,
    SendKeys,
    SignTestBatch,
    SignTestInteractive,
}

impl Operation {
    fn error(self, stderr: &str) -> DirectoryError {
        let exec = ExecError::NonZeroExit {
            command: format!("gpg {self:?}"),
            code: 2,
            stderr: stderr.to_string(),
        };
        match self {
            Operation::ListSecretKeys => DirectoryError::ListSecretKeys(exec),
            Operation::ExportPublicKey => DirectoryError::ExportPublicKey(exec),
            Operation::ExportSecretSubkeys => DirectoryError::ExportSecretSubkeys(exec),
            Operation::DeleteSecretKey => DirectoryError::DeleteSecretKey(exec),
            Operation::DeletePublicKey => DirectoryError::DeletePublicKey(exec),
            Operation::ImportKey => DirectoryError::ImportKey(exec),
            Operation::AddSubkey => DirectoryError::AddSubkey(exec),
            Operation::ExportOwnerTrust => DirectoryError::ExportOwnerTrust(exec),
            Operation::CheckTrustDb => DirectoryError::CheckTrustDb(exec),
            Operation::EditKey => DirectoryError::EditKey(exec),
            Operation::EditCard => DirectoryError::EditCard(exec),
            Operation::SendKeys => DirectoryError::SendKeys(exec),
            Operation::SignTestBatch | Operation::SignTestInteractive => {
                DirectoryError::SignTest(exec)
            }
        }
    }
}

/// What `card_status` does.
#[derive(Debug, Clone)]
pub enum CardBehavior {
    Ready(CardStatus),
    /// Fails with this text on standard error.
    Fails(String),
    TimesOut,
}

pub const PUBLIC_KEY: &[u8] = b"-----BEGIN PGP PUBLIC KEY BLOCK-----\nfake\n-----END PGP PUBLIC KEY BLOCK-----\n";
pub const SECRET_SUBKEYS: &[u8] = b"fake secret subkeys";
pub const OWNER_TRUST: &[u8] = b"52A1B2C3D4E5F60718293A4B07AAA1E535650AF5:6:\n";

#[derive(Debug)]
pub struct FakeKeyDirectory {
    records: RefCell<Vec<KeyRecord>>,
    deleted: RefCell<Vec<KeyRecord>>,
    card: RefCell<CardBehavior>,
    card_after_edit: RefCell<Option<CardBehavior>>,
    records_after_edit: RefCell<Option<Vec<KeyRecord>>>,
    subkeys_export: Vec<u8>,
    failing: HashSet<Operation>,
    calls: RefCell<Vec<String>>,
    imported: RefCell<Vec<Vec<u8>>>,
}

impl FakeKeyDirectory {
    /// A keyring holding `listing` and no attached token.
    pub fn with_listing(listing: &str) -> Self {
        Self {
            records: RefCell::new(parse_key_list(listing)),
            deleted: RefCell::new(Vec::new()),
            card: RefCell::new(CardBehavior::Fails(
                "gpg: selecting card failed: No such device".to_string(),
            )),
            card_after_edit: RefCell::new(None),
            records_after_edit: RefCell::new(None),
            subkeys_export: SECRET_SUBKEYS.to_vec(),
            failing: HashSet::new(),
            calls: RefCell::new(Vec::new()),
            imported: RefCell::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_listing("")
    }

    pub fn with_card(self, card: CardStatus) -> Self {
        self.card.replace(CardBehavior::Ready(card));
        self
    }

    pub fn with_card_behavior(self, behavior: CardBehavior) -> Self {
        self.card.replace(behavior);
        self
    }

    /// Card state reported after the next interactive session.
    pub fn card_after_edit(self, behavior: CardBehavior) -> Self {
        self.card_after_edit.replace(Some(behavior));
        self
    }

    /// Listing reported after the next interactive session.
    pub fn listing_after_edit(self, listing: &str) -> Self {
        self.records_after_edit.replace(Some(parse_key_list(listing)));
        self
    }

    pub fn with_subkeys_export(mut self, data: &[u8]) -> Self {
        self.subkeys_export = data.to_vec();
        self
    }

    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls whose name starts with `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.split_whitespace().next() == Some(operation))
            .count()
    }

    pub fn imported(&self) -> Vec<Vec<u8>> {
        self.imported.borrow().clone()
    }

    pub fn records(&self) -> Vec<KeyRecord> {
        self.records.borrow().clone()
    }

    fn call(&self, operation: Operation, entry: String) -> YkgpgResult<()> {
        self.calls.borrow_mut().push(entry);
        if self.failing.contains(&operation) {
            return Err(operation.error("gpg: scripted failure").into());
        }
        Ok(())
    }

    fn after_edit(&self) {
        if let Some(card) = self.card_after_edit.borrow_mut().take() {
            self.card.replace(card);
        }
        if let Some(records) = self.records_after_edit.borrow_mut().take() {
            self.records.replace(records);
        }
    }
}

impl KeyInspector for FakeKeyDirectory {
    fn list_secret_keys(&self, filter: &str) -> YkgpgResult<Vec<KeyRecord>> {
        self.call(Operation::ListSecretKeys, format!("list_secret_keys {filter}"))?;
        Ok(self.records.borrow().clone())
    }

    fn list_all_secret_keys(&self) -> YkgpgResult<Vec<KeyRecord>> {
        self.call(Operation::ListSecretKeys, "list_all_secret_keys".to_string())?;
        Ok(self.records.borrow().clone())
    }

    fn secret_key_listing(&self, _filter: Option<&str>) -> YkgpgResult<String> {
        self.call(Operation::ListSecretKeys, "secret_key_listing".to_string())?;
        Ok(crate::logic::render_key_list(&self.records.borrow()))
    }

    fn card_status(&self) -> YkgpgResult<CardStatus> {
        self.calls.borrow_mut().push("card_status".to_string());
        match &*self.card.borrow() {
            CardBehavior::Ready(card) => Ok(card.clone()),
            CardBehavior::Fails(stderr) => Err(DirectoryError::CardStatus(ExecError::NonZeroExit {
                command: "gpg --card-status".to_string(),
                code: 2,
                stderr: stderr.clone(),
            })
            .into()),
            CardBehavior::TimesOut => Err(DirectoryError::CardStatus(ExecError::TimedOut {
                command: "gpg --card-status".to_string(),
                after: std::time::Duration::from_secs(3),
            })
            .into()),
        }
    }
}

impl KeyTransfer for FakeKeyDirectory {
    fn export_public_key(&self, key_id: &str) -> YkgpgResult<Vec<u8>> {
        self.call(Operation::ExportPublicKey, format!("export_public_key {key_id}"))?;
        Ok(PUBLIC_KEY.to_vec())
    }

    fn export_secret_subkeys(&self, key_id: &str) -> YkgpgResult<Vec<u8>> {
        self.call(
            Operation::ExportSecretSubkeys,
            format!("export_secret_subkeys {key_id}"),
        )?;
        Ok(self.subkeys_export.clone())
    }

    fn delete_secret_key(&self, fingerprint: &str) -> YkgpgResult<()> {
        self.call(
            Operation::DeleteSecretKey,
            format!("delete_secret_key {fingerprint}"),
        )?;
        let removed = self.records.replace(Vec::new());
        self.deleted.replace(removed);
        Ok(())
    }

    fn delete_public_key(&self, key_id: &str) -> YkgpgResult<()> {
        self.call(Operation::DeletePublicKey, format!("delete_public_key {key_id}"))
    }

    fn import_key(&self, key_data: &[u8]) -> YkgpgResult<()> {
        self.call(Operation::ImportKey, format!("import_key {} bytes", key_data.len()))?;
        self.imported.borrow_mut().push(key_data.to_vec());
        if key_data == self.subkeys_export.as_slice() && !key_data.is_empty() {
            let mut restored = self.deleted.replace(Vec::new());
            for record in restored.iter_mut().filter(|r| r.is_primary()) {
                record.stub = Some(StubMarker::Offline);
            }
            self.records.replace(restored);
        }
        Ok(())
    }

    fn import_key_file(&self, path: &Path) -> YkgpgResult<()> {
        self.call(Operation::ImportKey, format!("import_key_file {}", path.display()))?;
        for record in self.records.borrow_mut().iter_mut().filter(|r| r.is_primary()) {
            record.stub = None;
        }
        Ok(())
    }

    /// Takes the listing queued with `listing_after_edit`, leaving any
    /// queued card change for the `keytocard` session that follows.
    fn quick_add_signing_subkey(&self, fingerprint: &str, expires: &str) -> YkgpgResult<()> {
        self.call(
            Operation::AddSubkey,
            format!("quick_add_signing_subkey {fingerprint} {expires}"),
        )?;
        if let Some(records) = self.records_after_edit.borrow_mut().take() {
            self.records.replace(records);
        }
        Ok(())
    }

    fn send_keys(&self, keyserver: &str, key_id: &str) -> YkgpgResult<()> {
        self.call(Operation::SendKeys, format!("send_keys {keyserver} {key_id}"))
    }
}

impl TrustStore for FakeKeyDirectory {
    fn export_owner_trust(&self) -> YkgpgResult<Vec<u8>> {
        self.call(Operation::ExportOwnerTrust, "export_owner_trust".to_string())?;
        Ok(OWNER_TRUST.to_vec())
    }

    fn check_trust_db(&self) -> YkgpgResult<()> {
        self.call(Operation::CheckTrustDb, "check_trust_db".to_string())
    }
}

impl KeyEditor for FakeKeyDirectory {
    fn edit_key(&self, key_id: &str) -> YkgpgResult<()> {
        self.call(Operation::EditKey, format!("edit_key {key_id}"))?;
        self.after_edit();
        Ok(())
    }

    fn edit_card(&self) -> YkgpgResult<()> {
        self.call(Operation::EditCard, "edit_card".to_string())?;
        self.after_edit();
        Ok(())
    }

    fn sign_test_batch(&self, key_id: &str) -> YkgpgResult<()> {
        self.call(Operation::SignTestBatch, format!("sign_test_batch {key_id}"))
    }

    fn sign_test_interactive(&self, key_id: &str) -> YkgpgResult<()> {
        self.call(
            Operation::SignTestInteractive,
            format!("sign_test_interactive {key_id}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::{self, key_directory_contract};

    contract_tests_for!(
        fake_key_directory_contract,
        make = || {
            FakeKeyDirectory::with_listing(contract_tests::FIXTURE_LISTING)
                .with_card(contract_tests::fixture_card())
        },
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
