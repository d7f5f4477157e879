//! Put a signing subkey on a token: `setup` and `setup-batch` create one
//! first, `move-subkey` moves one that already exists.

use chrono::{Local, Months, NaiveDate};
use tracing::info;

use crate::error::YkgpgResult;
use crate::model::{CardSlot, CardStatus, KeyRecord, MasterKeyState};
use crate::ports::{HostTools, KeyDirectory, Operator};
use crate::use_cases::guided_step::{perform_guided_step, GuidedStep, StepOutcome};

use super::Workflow;

const BATCH_SUBKEY_LIFETIME_MONTHS: u32 = 60;

fn local_signing_subkeys(records: &[KeyRecord]) -> usize {
    records
        .iter()
        .filter(|r| !r.is_primary() && r.can_sign() && !r.is_stub())
        .count()
}

/// Batch-created subkeys expire five years from `today`.
fn batch_subkey_expiry(today: NaiveDate) -> String {
    today
        .checked_add_months(Months::new(BATCH_SUBKEY_LIFETIME_MONTHS))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

fn addkey_step() -> GuidedStep {
    GuidedStep::new("Generate a new signing subkey")
        .instruction("At the gpg> prompt, type: addkey")
        .instruction("Select: (10) ECC (sign only)")
        .instruction("Select: (1) Curve 25519")
        .instruction("For expiration, enter: 5y")
        .instruction("Confirm the creation")
        .instruction("Type: save")
}

fn keytocard_step() -> GuidedStep {
    GuidedStep::new("Move the subkey to the YubiKey")
        .instruction("Type: list (to see all subkeys with numbers)")
        .instruction("Identify the signing subkey without a card-no")
        .instruction("Type: key N (where N is the number of that subkey)")
        .instruction("Type: keytocard")
        .instruction("Select: (1) Signature key")
        .instruction("Enter your GPG key PASSPHRASE when prompted")
        .instruction("Enter your YubiKey ADMIN PIN when prompted (default: 12345678)")
        .instruction("Type: save")
        .caution("If 'save' says 'Key not changed', the Admin PIN was likely incorrect.")
}

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    /// Provision a new token: create a signing subkey with the master key
    /// temporarily imported, then move it onto the token.
    pub fn setup(&mut self) -> YkgpgResult<()> {
        self.operator.header("Setup New YubiKey for Signing");
        let card = self.require_card()?;

        if let Some(existing) = card.signature_key() {
            self.operator.warning(&format!(
                "This YubiKey already has a signature key configured: {existing}"
            ));
            if !self
                .operator
                .confirm("Continue anyway? This will add another signing subkey.")?
            {
                return Ok(());
            }
        }

        self.take_backup()?;
        if !self.with_master_key(|this| this.create_and_move_subkey())? {
            return Ok(());
        }

        self.offer_master_key_removal()?;
        self.offer_upload()?;

        self.operator.success("YubiKey setup complete!");
        self.operator.info(&format!("Serial: {}", card.serial));
        self.next_steps(&card);
        Ok(())
    }

    /// Guided `addkey` then `keytocard`, with the master key imported.
    /// `false` when the operator stopped early; the master key has then
    /// been dealt with already.
    fn create_and_move_subkey(&mut self) -> YkgpgResult<bool> {
        let directory = self.directory;
        let key_id = self.key_id();
        let before = local_signing_subkeys(&self.list_primary()?);
        let created = perform_guided_step(
            &mut *self.operator,
            &addkey_step(),
            || directory.edit_key(key_id),
            || directory.list_secret_keys(key_id),
        )?;
        let records = match created {
            StepOutcome::Completed(records) => records,
            StepOutcome::Aborted => {
                self.operator.info("Setup cancelled");
                self.remove_master_key_or_warn();
                return Ok(false);
            }
        };
        if local_signing_subkeys(&records) > before {
            self.operator.success("New signing subkey created");
        } else {
            self.operator
                .warning("No new signing subkey found in the keyring");
        }

        self.hand_new_subkey_to_card()
    }

    /// `keytocard` for a subkey created while the master key is imported.
    fn hand_new_subkey_to_card(&mut self) -> YkgpgResult<bool> {
        if !self.confirm_subkey_backup()? {
            self.operator
                .info("Back up first, then run 'ykgpg move-subkey' to continue.");
            self.operator
                .warning("Master key left on machine. Remember to remove it manually!");
            return Ok(false);
        }

        if !self.move_to_card()? {
            self.operator
                .info("The new subkey stays in the local keyring; run 'ykgpg move-subkey' later.");
            self.offer_master_key_removal()?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Provision a new token without the `addkey` dialogue: the signing
    /// subkey is created in batch mode, only `keytocard` is interactive.
    pub fn setup_batch(&mut self) -> YkgpgResult<()> {
        self.operator.header("Setup New YubiKey (Automated Mode)");
        let card = self.require_card()?;

        if let Some(existing) = card.signature_key() {
            self.operator.warning(&format!(
                "This YubiKey already has a signature key configured: {existing}"
            ));
            if !self
                .operator
                .confirm("Continue anyway? This will add another signing subkey.")?
            {
                return Ok(());
            }
        }

        let fingerprint = self.fingerprint()?;
        let expires = batch_subkey_expiry(Local::now().date_naive());

        self.take_backup()?;
        let moved = self.with_master_key(|this| {
            this.operator
                .info("Generating new ed25519 signing subkey...");
            this.directory
                .quick_add_signing_subkey(fingerprint.as_str(), &expires)?;
            this.operator
                .success(&format!("New signing subkey created (expires {expires})"));
            this.hand_new_subkey_to_card()
        })?;
        if !moved {
            return Ok(());
        }

        self.offer_master_key_removal()?;
        self.offer_upload()?;

        self.operator
            .success(&format!("Setup complete for YubiKey {}", card.serial));
        self.next_steps(&card);
        Ok(())
    }

    /// Move an existing signing subkey onto the attached token.
    pub fn move_subkey(&mut self) -> YkgpgResult<()> {
        self.operator.header("Move Subkey to YubiKey");
        let card = self.require_card()?;

        self.operator.section("PIN INFORMATION");
        self.operator
            .line("You will need your YubiKey ADMIN PIN to move keys (default: 12345678).");
        self.operator
            .line("This is different from the user PIN (default: 123456).");

        if let Some(attribute) = card.slot_attribute(CardSlot::Signature) {
            self.operator
                .key_value("Signature slot configured for", attribute);
        }
        if card.slot_expects_rsa(CardSlot::Signature) {
            self.operator
                .warning("The signature slot expects RSA but your subkey is likely ed25519.");
            self.operator.info("To change the slot to ECC:");
            self.operator.line("  1. Run: gpg --card-edit");
            self.operator.line("  2. Type: admin");
            self.operator.line("  3. Type: key-attr");
            self.operator.line("  4. Select (2) ECC and (1) Curve 25519 for each slot");
            self.operator.line("  5. Type: quit");
            if !self
                .operator
                .confirm("Continue anyway? (keytocard will fail if key types don't match)")?
            {
                return Ok(());
            }
        }

        if let Some(existing) = card.signature_key() {
            self.operator.warning(&format!(
                "This YubiKey already has a signature key configured: {existing}"
            ));
            if !self
                .operator
                .confirm("Continue anyway? This will replace the existing signature key.")?
            {
                return Ok(());
            }
        }

        let records = self.list_primary()?;
        if MasterKeyState::from_records(&records) != Some(MasterKeyState::OnMachine) {
            self.operator
                .warning("Master key not found on this machine; keytocard needs it.");
            self.operator
                .info("Import it first with: gpg --import /path/to/master-key.gpg");
            if !self
                .operator
                .confirm("Continue anyway? (The subkey move may fail if master key is not available)")?
            {
                return Ok(());
            }
        }

        self.take_backup()?;

        if !self.confirm_subkey_backup()? {
            self.operator
                .info("Back up first, then run 'ykgpg move-subkey' again.");
            return Ok(());
        }

        if !self.move_to_card()? {
            return Ok(());
        }

        self.offer_master_key_removal()?;
        self.offer_upload()?;

        self.operator.success("Subkey moved to YubiKey!");
        self.next_steps(&card);
        Ok(())
    }

    fn confirm_subkey_backup(&mut self) -> YkgpgResult<bool> {
        self.operator
            .warning("IMPORTANT: Before moving the key to your YubiKey, UPDATE YOUR BACKUP!");
        self.operator
            .warning("'keytocard' MOVES the key. Without a backup it is PERMANENTLY LOST");
        self.operator
            .warning("if the YubiKey is factory reset or lost.");
        self.operator.info("Create an updated backup now:");
        self.operator.line(&format!(
            "  gpg --export-secret-keys {} > master-key-backup-$(date +%Y%m%d).gpg",
            self.key_id()
        ));
        self.operator
            .confirm("Have you backed up your keys and are ready to proceed?")
    }

    /// The guided `keytocard` session followed by a card re-read.
    /// `false` when the operator quit before the session.
    fn move_to_card(&mut self) -> YkgpgResult<bool> {
        let directory = self.directory;
        let key_id = self.key_id();
        let outcome = perform_guided_step(
            &mut *self.operator,
            &keytocard_step(),
            || directory.edit_key(key_id),
            || directory.card_status(),
        )?;
        let card = match outcome {
            StepOutcome::Completed(card) => card,
            StepOutcome::Aborted => {
                self.operator.info("Move cancelled; nothing was changed on the YubiKey");
                return Ok(false);
            }
        };
        self.report_signature_slot(&card);
        Ok(true)
    }

    fn report_signature_slot(&self, card: &CardStatus) {
        match card.signature_key() {
            Some(key) => {
                info!(serial = %card.serial, "signature slot populated");
                self.operator
                    .success(&format!("Signature key on YubiKey: {key}"));
            }
            None => {
                self.operator
                    .warning("The YubiKey signature slot is still empty.");
                self.operator.info("Common causes:");
                self.operator.line("  - Wrong Admin PIN (default: 12345678)");
                self.operator.line("  - 'save' was not typed at the end");
                self.operator.line("  - The key type does not match the slot (see 'ykgpg init-card')");
            }
        }
    }

    fn next_steps(&self, card: &CardStatus) {
        self.operator.info("Next steps:");
        self.operator.line(&format!(
            "  1. Label this YubiKey physically (e.g. 'Key B - {}')",
            card.serial
        ));
        self.operator.line("  2. Run: ykgpg verify");
        self.operator
            .line("  3. Register this YubiKey with GitHub/GitLab if not already done");
    }
}
