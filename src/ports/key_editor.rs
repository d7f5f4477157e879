//! KeyEditor trait - interactive gpg sessions and signing checks

use crate::error::YkgpgResult;

/// Capability to hand the terminal to gpg
///
/// Interactive sessions block until the operator ends them and are never
/// time-bounded. A gpg `save` with nothing to save exits with status 2,
/// which counts as success here.
pub trait KeyEditor {
    /// `gpg --edit-key <key_id>`
    fn edit_key(&self, key_id: &str) -> YkgpgResult<()>;

    /// `gpg --card-edit`
    fn edit_card(&self) -> YkgpgResult<()>;

    /// Sign a fixed message without any prompt
    ///
    /// Succeeds only when no PIN entry is needed (cached PIN or a
    /// graphical pinentry). Bounded by a short deadline.
    fn sign_test_batch(&self, key_id: &str) -> YkgpgResult<()>;

    /// Sign a fixed message, letting gpg prompt for the PIN
    fn sign_test_interactive(&self, key_id: &str) -> YkgpgResult<()>;
}
