//! Changes that need the master key back for a moment: revoking and
//! extending subkeys, plus taking the master key offline on its own.

use crate::error::{WorkflowError, YkgpgResult};
use crate::model::KeyRecord;
use crate::ports::{HostTools, KeyDirectory, Operator};
use crate::use_cases::guided_step::{perform_guided_step, GuidedStep, StepOutcome};
use crate::use_cases::master_key::{take_master_key_offline, OfflineOutcome};

use super::Workflow;

fn describe(record: &KeyRecord) -> String {
    let mut text = format!("{} {}", record.marker(), record.short_id);
    if let Some(created) = &record.created_on {
        text.push_str(&format!(" created {created}"));
    }
    match &record.expires_on {
        Some(expires) => text.push_str(&format!(" expires {expires}")),
        None => text.push_str(" never expires"),
    }
    text
}

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    pub fn remove_master_key(&mut self) -> YkgpgResult<()> {
        self.operator.header("Remove Master Key");
        let fingerprint = self.fingerprint()?;

        self.operator
            .warning("Make sure you have an offline backup of the master key before continuing.");
        if !self.operator.confirm(&format!(
            "Remove the master key {fingerprint} from this machine?"
        ))? {
            self.operator.info("Cancelled");
            return Ok(());
        }

        match take_master_key_offline(self.directory, &fingerprint)? {
            OfflineOutcome::AlreadyOffline => {
                self.operator.success("Master key is already offline")
            }
            OfflineOutcome::NoSecretKey => self
                .operator
                .warning(&format!("No secret key for {fingerprint} in the keyring")),
            OfflineOutcome::Removed { subkeys_restored } => {
                self.operator.success("Master key removed from local keyring");
                if !subkeys_restored {
                    self.operator
                        .info("Subkey stubs come back the next time the YubiKey is used");
                }
            }
        }
        Ok(())
    }

    /// Revoke one subkey chosen by the operator.
    pub fn revoke(&mut self) -> YkgpgResult<()> {
        self.operator.header("Revoke Subkey");
        self.operator
            .warning("Revocation is permanent. Signatures made with the subkey stay valid,");
        self.operator
            .warning("but it can never sign again once the revocation is published.");

        let records = self.list_primary()?;
        self.operator.section("Signing subkeys");
        for record in records.iter().filter(|r| !r.is_primary() && r.can_sign()) {
            self.operator.line(&format!("  {}", describe(record)));
        }

        let answer = self
            .operator
            .ask("Enter the KEY ID to revoke (or 'q' to quit)")?;
        let answer = answer.trim();
        if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
            self.operator.info("Cancelled");
            return Ok(());
        }
        let Some(target) = records.iter().find(|r| {
            r.short_id.eq_ignore_ascii_case(answer)
                || (!r.fingerprint.is_empty() && r.fingerprint.eq_ignore_ascii_case(answer))
        }) else {
            return Err(WorkflowError::KeyNotFound {
                key_id: answer.to_string(),
            }
            .into());
        };
        if target.is_primary() || self.is_primary_id(answer) {
            return Err(WorkflowError::ProtectedKey {
                key_id: answer.to_string(),
            }
            .into());
        }
        let subkey_id = target.short_id.clone();

        if !self.operator.confirm(&format!(
            "Are you SURE you want to revoke key {subkey_id}? This cannot be undone!"
        ))? {
            self.operator.info("Cancelled");
            return Ok(());
        }

        let step = GuidedStep::new("Revoke the subkey")
            .instruction("Type: list (to see all subkeys with numbers)")
            .instruction(format!("Type: key N (where N is the number of {subkey_id})"))
            .instruction("Type: revkey")
            .instruction("Confirm, and select a reason (1 = compromised, 2 = superseded, 3 = no longer used)")
            .instruction("Type: save");

        self.take_backup()?;
        let outcome = self.with_master_key(|this| {
            let directory = this.directory;
            let key_id = this.key_id();
            perform_guided_step(
                &mut *this.operator,
                &step,
                || directory.edit_key(key_id),
                || Ok(()),
            )
        })?;

        self.remove_master_key_or_warn();
        if outcome.is_aborted() {
            self.operator.info("Cancelled; nothing was revoked");
            return Ok(());
        }

        self.operator
            .warning("Upload the revocation so that others stop trusting the subkey.");
        self.offer_upload()?;
        self.operator
            .success(&format!("Subkey {subkey_id} revoked"));
        Ok(())
    }

    /// Push out the expiry of the primary key and its subkeys.
    pub fn extend(&mut self) -> YkgpgResult<()> {
        self.operator.header("Extend Key Expiration");

        let records = self.list_primary()?;
        self.show_expiries(&records, "Current expiration dates");

        let expiry = self.operator.ask(
            "Enter new expiration (e.g. '2y' for two years, or a date like 2030-12-31)",
        )?;
        let expiry = expiry.trim().to_string();
        if expiry.is_empty() {
            return Err(WorkflowError::NoExpiry.into());
        }

        let step = GuidedStep::new("Extend the expiration")
            .instruction("Type: expire (this changes the primary key)")
            .instruction(format!("Enter: {expiry}"))
            .instruction("Type: key 1, then key 2 and so on to select every subkey")
            .instruction("Type: expire")
            .instruction(format!("Enter: {expiry}"))
            .instruction("Type: save");

        self.take_backup()?;
        let outcome = self.with_master_key(|this| {
            let directory = this.directory;
            let key_id = this.key_id();
            perform_guided_step(
                &mut *this.operator,
                &step,
                || directory.edit_key(key_id),
                || directory.list_secret_keys(key_id),
            )
        })?;

        self.remove_master_key_or_warn();
        let StepOutcome::Completed(updated) = outcome else {
            self.operator.info("Cancelled; expiration dates unchanged");
            return Ok(());
        };

        self.offer_upload()?;
        self.show_expiries(&updated, "Updated expiration dates");
        self.operator.success("Expiration extended");
        Ok(())
    }

    fn show_expiries(&self, records: &[KeyRecord], title: &str) {
        self.operator.section(title);
        for record in records {
            self.operator.line(&format!("  {}", describe(record)));
        }
    }
}
