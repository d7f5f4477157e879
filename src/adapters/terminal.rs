//! Operator I/O on the controlling terminal

use colored::Colorize;
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Confirm, Input};

use crate::error::{PromptError, YkgpgResult};
use crate::ports::{Presenter, Prompter};

const RULE: &str = "========================================";
const LABEL_WIDTH: usize = 25;

/// Prompts through `dialoguer`, output coloured with `colored`.
pub struct Terminal {
    plain: bool,
    colorful: ColorfulTheme,
}

impl Terminal {
    pub fn new(no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            plain: no_color,
            colorful: ColorfulTheme::default(),
        }
    }

    fn theme(&self) -> &dyn Theme {
        if self.plain {
            &SimpleTheme
        } else {
            &self.colorful
        }
    }
}

impl Prompter for Terminal {
    fn ask(&mut self, prompt: &str) -> YkgpgResult<String> {
        let answer: String = Input::with_theme(self.theme())
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(PromptError::from)?;
        Ok(answer)
    }

    fn confirm(&mut self, prompt: &str) -> YkgpgResult<bool> {
        Ok(Confirm::with_theme(self.theme())
            .with_prompt(prompt)
            .default(false)
            .show_default(true)
            .wait_for_newline(true)
            .interact()
            .map_err(PromptError::from)?)
    }
}

impl Presenter for Terminal {
    fn header(&self, title: &str) {
        println!();
        println!("{}", RULE.cyan().bold());
        println!("{}", format!("       {title}").cyan().bold());
        println!("{}", RULE.cyan().bold());
        println!();
    }

    fn section(&self, title: &str) {
        println!();
        println!("{}", title.cyan().bold());
        println!("{}", "-".repeat(title.chars().count()).cyan().bold());
    }

    fn key_value(&self, label: &str, value: &str) {
        let label = format!("{label}:");
        println!("{:<width$} {}", label, value.bright_white(), width = LABEL_WIDTH);
    }

    fn info(&self, message: &str) {
        println!("{}", format!("[INFO] {message}").blue());
    }

    fn success(&self, message: &str) {
        println!("{}", format!("[SUCCESS] {message}").green());
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", format!("[WARNING] {message}").yellow());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", format!("[ERROR] {message}").red());
    }

    fn line(&self, text: &str) {
        println!("{text}");
    }
}
