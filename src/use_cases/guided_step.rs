//! Guided interactive step
//!
//! Some key changes are only safe through gpg's own interactive prompt
//! (`addkey`, `keytocard`, `revkey`, `expire`). A guided step prints what
//! to type, waits for the operator, runs exactly one interactive session
//! and then re-reads the resulting state.

use tracing::info;

use crate::error::YkgpgResult;
use crate::ports::Operator;

/// Instructions for one interactive session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuidedStep {
    pub title: String,
    /// Printed as a numbered list.
    pub instructions: Vec<String>,
    /// Printed as warnings after the instructions.
    pub cautions: Vec<String>,
}

impl GuidedStep {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.instructions.push(text.into());
        self
    }

    pub fn caution(mut self, text: impl Into<String>) -> Self {
        self.cautions.push(text.into());
        self
    }
}

/// Whether the operator went through with a guided step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    /// The session ran; holds the verification result.
    Completed(T),
    /// The operator answered `q`; no session was started.
    Aborted,
}

impl<T> StepOutcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, StepOutcome::Aborted)
    }
}

const CONTINUE_PROMPT: &str = "Press Enter when ready to continue, or 'q' to quit";

/// Present `step`, run `session` once, then return what `verify` reports.
///
/// Errors from the session are returned as-is and `verify` is not called.
pub fn perform_guided_step<O, S, V, T>(
    operator: &mut O,
    step: &GuidedStep,
    session: S,
    verify: V,
) -> YkgpgResult<StepOutcome<T>>
where
    O: Operator + ?Sized,
    S: FnOnce() -> YkgpgResult<()>,
    V: FnOnce() -> YkgpgResult<T>,
{
    operator.section(&step.title);
    for (number, instruction) in step.instructions.iter().enumerate() {
        operator.line(&format!("{}. {instruction}", number + 1));
    }
    for caution in &step.cautions {
        operator.warning(caution);
    }

    let answer = operator.ask(CONTINUE_PROMPT)?;
    if answer.trim().eq_ignore_ascii_case("q") {
        info!(step = %step.title, "guided step aborted by operator");
        return Ok(StepOutcome::Aborted);
    }

    session()?;
    Ok(StepOutcome::Completed(verify()?))
}
