use crate::error::YkgpgResult;

pub trait TrustStore {
    /// Owner trust values in gpg's text export format
    fn export_owner_trust(&self) -> YkgpgResult<Vec<u8>>;

    /// Check and rebuild the trust database
    fn check_trust_db(&self) -> YkgpgResult<()>;
}
