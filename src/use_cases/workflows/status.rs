use crate::error::{TokenError, WorkflowError, YkgpgResult};
use crate::logic::render_key_list;
use crate::model::{CardSlot, CardStatus, MasterKeyState, TokenPresence};
use crate::ports::{HostTools, KeyDirectory, Operator, Presenter};
use crate::use_cases::token_presence::detect_token;

use super::Workflow;

impl<'a, D, H, O> Workflow<'a, D, H, O>
where
    D: KeyDirectory + ?Sized,
    H: HostTools + ?Sized,
    O: Operator + ?Sized,
{
    /// Primary key, its subkeys and the attached token. Changes nothing.
    pub fn status(&mut self) -> YkgpgResult<()> {
        self.operator.header("YubiKey GPG Manager Status");

        self.operator.section("PRIMARY KEY");
        self.operator.key_value("Key ID", self.key_id());
        self.operator.key_value(
            "User",
            &format!("{} <{}>", self.config.user_name, self.config.user_email),
        );

        let records = match self.list_primary() {
            Ok(records) => records,
            Err(err) => {
                self.operator
                    .error(&format!("Failed to list keys: {err}"));
                return Err(err);
            }
        };
        if records.is_empty() {
            let err = WorkflowError::PrimaryKeyNotFound {
                key_id: self.key_id().to_string(),
            };
            self.operator.error(&err.to_string());
            return Err(err.into());
        }

        self.operator.section("KEY DETAILS");
        for line in render_key_list(&records).lines() {
            self.operator.line(line);
        }
        if let Some(state) = MasterKeyState::from_records(&records) {
            self.operator.key_value("Master key", &state.to_string());
        }

        self.operator.section("YUBIKEY STATUS");
        match detect_token(self.directory, self.tools) {
            Ok(TokenPresence::Ready(card)) => {
                self.operator.success("YubiKey detected!");
                show_card(&*self.operator, &card);
            }
            Ok(TokenPresence::Absent) => self.operator.warning("No YubiKey detected"),
            Ok(TokenPresence::Inconclusive) => {
                self.operator.warning(&TokenError::Inconclusive.to_string())
            }
            Err(err) => self
                .operator
                .warning(&format!("Failed to check YubiKey: {err}")),
        }
        Ok(())
    }
}

pub(super) fn show_card<P: Presenter + ?Sized>(presenter: &P, card: &CardStatus) {
    presenter.key_value("Serial", &card.serial);
    let cardholder = if card.cardholder_name.is_empty() {
        "[not set]"
    } else {
        card.cardholder_name.as_str()
    };
    presenter.key_value("Cardholder", cardholder);
    if let Some(manufacturer) = &card.manufacturer {
        presenter.key_value("Manufacturer", manufacturer);
    }
    if let (Some(user), Some(admin)) = (card.user_pin_retries(), card.admin_pin_retries()) {
        presenter.key_value("PIN retries", &format!("user {user}, admin {admin}"));
    }
    presenter.info("Keys on this YubiKey:");
    for slot in CardSlot::ALL {
        let key = card.slot_key(slot).unwrap_or("[none]");
        presenter.line(&format!("  {slot}: {key}"));
    }
}
