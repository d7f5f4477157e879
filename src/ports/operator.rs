//! The human at the terminal

use crate::error::YkgpgResult;

/// Capability to ask the operator for input
pub trait Prompter {
    /// A line of free text, possibly empty
    fn ask(&mut self, prompt: &str) -> YkgpgResult<String>;

    /// Yes/no question; anything but an explicit yes is no
    fn confirm(&mut self, prompt: &str) -> YkgpgResult<bool>;

    /// A line of free text, `default` when left empty
    fn ask_with_default(&mut self, prompt: &str, default: &str) -> YkgpgResult<String> {
        let answer = self.ask(&format!("{prompt} [{default}]"))?;
        let answer = answer.trim();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        })
    }

    /// Keep asking until a non-empty answer is given
    fn ask_required(&mut self, prompt: &str) -> YkgpgResult<String> {
        loop {
            let answer = self.ask(prompt)?;
            let answer = answer.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
        }
    }
}

/// Capability to show progress and results to the operator
///
/// Purely cosmetic: nothing here influences control flow.
pub trait Presenter {
    fn header(&self, title: &str);
    fn section(&self, title: &str);
    fn key_value(&self, label: &str, value: &str);
    fn info(&self, message: &str);
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    /// Unstyled text, e.g. numbered instructions
    fn line(&self, text: &str);
}

/// Combined trait for everything a workflow needs from the terminal
pub trait Operator: Prompter + Presenter {}

impl<T> Operator for T where T: Prompter + Presenter {}
