//! Test double for the operator: canned answers, recorded output

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{PromptError, YkgpgResult};
use crate::ports::{Presenter, Prompter};

#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    confirmations: VecDeque<bool>,
    prompts: Vec<String>,
    transcript: RefCell<Vec<String>>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a free-text answer.
    pub fn answer(mut self, text: &str) -> Self {
        self.answers.push_back(text.to_string());
        self
    }

    /// Queue a yes/no answer.
    pub fn confirm_with(mut self, yes: bool) -> Self {
        self.confirmations.push_back(yes);
        self
    }

    /// Every question asked, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Everything presented, one entry per call, prefixed with its kind.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.borrow().clone()
    }

    pub fn said(&self, needle: &str) -> bool {
        self.transcript.borrow().iter().any(|entry| entry.contains(needle))
    }

    fn record(&self, kind: &str, text: &str) {
        self.transcript.borrow_mut().push(format!("{kind}: {text}"));
    }

    fn exhausted(prompt: &str) -> PromptError {
        PromptError::Input {
            reason: format!("no scripted answer for {prompt:?}"),
        }
    }
}

impl Prompter for ScriptedOperator {
    fn ask(&mut self, prompt: &str) -> YkgpgResult<String> {
        self.prompts.push(prompt.to_string());
        Ok(self
            .answers
            .pop_front()
            .ok_or_else(|| Self::exhausted(prompt))?)
    }

    fn confirm(&mut self, prompt: &str) -> YkgpgResult<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self
            .confirmations
            .pop_front()
            .ok_or_else(|| Self::exhausted(prompt))?)
    }
}

impl Presenter for ScriptedOperator {
    fn header(&self, title: &str) {
        self.record("header", title);
    }

    fn section(&self, title: &str) {
        self.record("section", title);
    }

    fn key_value(&self, label: &str, value: &str) {
        self.record("value", &format!("{label}: {value}"));
    }

    fn info(&self, message: &str) {
        self.record("info", message);
    }

    fn success(&self, message: &str) {
        self.record("success", message);
    }

    fn warning(&self, message: &str) {
        self.record("warning", message);
    }

    fn error(&self, message: &str) {
        self.record("error", message);
    }

    fn line(&self, text: &str) {
        self.record("line", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_required_skips_blank_answers() {
        let mut op = ScriptedOperator::new().answer("").answer("  ").answer("/media/usb/master.gpg");
        assert_eq!(op.ask_required("Master key path").unwrap(), "/media/usb/master.gpg");
        assert_eq!(op.prompts().len(), 3);
    }

    #[test]
    fn test_ask_with_default() {
        let mut op = ScriptedOperator::new().answer("").answer("hkps://keyserver.ubuntu.com");
        assert_eq!(
            op.ask_with_default("Keyserver URL", "hkps://keys.openpgp.org").unwrap(),
            "hkps://keys.openpgp.org"
        );
        assert_eq!(
            op.ask_with_default("Keyserver URL", "hkps://keys.openpgp.org").unwrap(),
            "hkps://keyserver.ubuntu.com"
        );
        assert_eq!(op.prompts()[0], "Keyserver URL [hkps://keys.openpgp.org]");
    }

    #[test]
    fn test_running_out_of_answers_is_an_error() {
        let mut op = ScriptedOperator::new();
        assert!(op.ask_required("anything").is_err());
        assert!(op.confirm("sure?").is_err());
    }
}
