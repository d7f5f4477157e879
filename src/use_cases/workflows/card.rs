use crate::error::{YkgpgError, YkgpgResult};
use crate::model::Fingerprint;
use crate::ports::{HostTools, KeyDirectory, Operator};
use crate::use_cases::guided_step::{perform_guided_step, GuidedStep, StepOutcome};

use super::status::show_card;
use super::Workflow;

fn passwd_step() -> GuidedStep {
    GuidedStep::new("Change PINs")
        .instruction("Type: admin")
        .instruction("Type: passwd")
        .instruction("Select (1) to change the User PIN: current 123456, then the new PIN twice")
        .instruction("Select (3) to change the Admin PIN: current 12345678, then the new PIN twice")
        .instruction("Optionally select (4) to set a Reset Code for PIN recovery")
        .instruction("Press Q to leave the passwd menu, then type: quit")
        .caution("PIN prompts ask for the CURRENT pin first, then the NEW one!")
}

fn key_attr_step() -> GuidedStep {
    GuidedStep::new("Switch key slots to ed25519/cv25519")
        .instruction("Type: admin")
        .instruction("Type: key-attr")
        .instruction("For each of the three slots select (2) ECC, then (1) Curve 25519")
        .instruction("Enter the Admin PIN when prompted")
        .instruction("Type: quit")
        .caution("You will be prompted for the Admin PIN (default: 12345678)")
}

const KEY_URL_BASE: &str = "https://keys.openpgp.org/vks/v1/by-fingerprint/";

/// Where `fetch` on the card finds the public key.
fn public_key_url(fingerprint: &Fingerprint) -> String {
    format!("{KEY_URL_BASE}{fingerprint}")
}

/// Cardholder name and language, plus the public key URL once the primary
/// key is known.
fn metadata_step(fingerprint: Option<&Fingerprint>) -> GuidedStep {
    let step = GuidedStep::new("Set card metadata")
        .instruction("Type: admin")
        .instruction("Type: name, then enter your surname and given name")
        .instruction("Type: lang, then enter 'en' for English");
    match fingerprint {
        Some(fingerprint) => step
            .instruction(format!("Type: url, then enter: {}", public_key_url(fingerprint)))
            .instruction("Type: quit"),
        None => step.instruction("Type: quit"),
    }
}

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    /// Prepare a token for OpenPGP use: PINs, key algorithm, cardholder.
    /// Needs no key configuration.
    pub fn init_card(&mut self) -> YkgpgResult<()> {
        self.operator.header("Initialize YubiKey for OpenPGP");
        let card = self.require_card()?;

        self.operator.section("CURRENT CARD STATUS");
        show_card(&*self.operator, &card);
        if !card.key_attributes.is_empty() {
            self.operator
                .key_value("Key types", &card.key_attributes.join(" "));
        }
        if !card.key_slots.is_empty() {
            self.operator.warning("This YubiKey already has keys configured.");
            self.operator
                .warning("Changing key attributes will NOT affect existing keys on the card.");
            self.operator.warning(
                "To start fresh, factory reset the card first: gpg --card-edit, admin, factory-reset",
            );
        }

        self.operator.section("PIN INFORMATION");
        self.operator.line("YubiKey OpenPGP uses TWO separate PINs:");
        self.operator
            .line("  User PIN   default 123456    at least 6 chars  signing, decrypting");
        self.operator
            .line("  Admin PIN  default 12345678  at least 8 chars  card management, moving keys");
        self.operator
            .warning("These are NOT the PINs of YubiKey Authenticator or FIDO2.");

        if self
            .operator
            .confirm("Change default PINs? (Highly recommended for new cards)")?
        {
            self.card_session(passwd_step())?;
        }

        self.operator.section("KEY ALGORITHM");
        self.operator
            .line("The card's key type must be configured BEFORE keys are moved to it.");
        if !card.key_attributes.is_empty() {
            self.operator.key_value(
                "Current configuration",
                &card.key_attributes.join(" "),
            );
        }
        if self
            .operator
            .confirm("Change key algorithm to ed25519/cv25519? (Recommended for new keys)")?
        {
            self.card_session(key_attr_step())?;
        }

        if self
            .operator
            .confirm("Set cardholder name on the card? (Helps identify which key is which)")?
        {
            let fingerprint = self.config.fingerprint().ok();
            self.card_session(metadata_step(fingerprint.as_ref()))?;
        }

        self.operator.info("Checking final card status...");
        match self.directory.card_status() {
            Ok(updated) => {
                self.operator.section("FINAL CARD STATUS");
                show_card(&*self.operator, &updated);
            }
            Err(err) => self
                .operator
                .warning(&format!("Could not read the card again: {err}")),
        }

        self.operator.success("YubiKey initialization complete!");
        self.operator.info("Next steps:");
        self.operator.line(
            "  1. Run 'ykgpg setup' to create a new signing subkey and move it to this YubiKey",
        );
        self.operator
            .line("  2. Or run 'ykgpg move-subkey' if you already have a subkey to move");
        self.operator.line(&format!(
            "  3. Label this YubiKey physically with its serial number: {}",
            card.serial
        ));
        Ok(())
    }

    /// Label the attached token with the cardholder name and the URL of
    /// the public key.
    pub fn set_metadata(&mut self) -> YkgpgResult<()> {
        self.operator.header("Set YubiKey Card Metadata");
        let card = self.require_card()?;
        let fingerprint = self.fingerprint()?;

        self.operator
            .info(&format!("Configuring YubiKey with serial: {}", card.serial));
        self.operator
            .line("The cardholder name helps identify which YubiKey is which.");

        let directory = self.directory;
        let outcome = perform_guided_step(
            &mut *self.operator,
            &metadata_step(Some(&fingerprint)),
            || directory.edit_card(),
            || directory.card_status(),
        )?;
        let StepOutcome::Completed(updated) = outcome else {
            self.operator.info("Cancelled; card metadata unchanged");
            return Ok(());
        };

        if !updated.cardholder_name.is_empty() {
            self.operator
                .key_value("Cardholder", &updated.cardholder_name);
        }
        self.operator.success("YubiKey metadata updated");
        Ok(())
    }

    /// One `--card-edit` session. A session that ends badly only warns;
    /// the operator may simply have quit gpg early.
    fn card_session(&mut self, step: GuidedStep) -> YkgpgResult<()> {
        let directory = self.directory;
        match perform_guided_step(&mut *self.operator, &step, || directory.edit_card(), || Ok(())) {
            Ok(_) => Ok(()),
            Err(err @ YkgpgError::Prompt(_)) => Err(err),
            Err(err) => {
                self.operator
                    .warning(&format!("Card edit session ended: {err}"));
                Ok(())
            }
        }
    }
}
