use crate::error::YkgpgResult;

/// Other programs on the host that are consulted but never modified
pub trait HostTools {
    /// Output of the token inventory (`ykman info`)
    ///
    /// # Errors
    ///
    /// Returns errors if the inventory tool is missing or fails
    fn token_inventory(&self) -> YkgpgResult<String>;

    /// A global git setting, `None` when unset
    fn git_config(&self, key: &str) -> YkgpgResult<Option<String>>;
}
