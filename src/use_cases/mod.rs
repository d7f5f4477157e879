//! Use cases (orchestration)
//!
//! Each use case coordinates the ports to carry out one job. The
//! workflows on top of them are what the command line runs.

pub mod backup;
pub mod guided_step;
pub mod master_key;
pub mod signing_subkey;
pub mod token_presence;
pub mod workflows;

pub use backup::{create_backup, create_backup_at};
pub use guided_step::{perform_guided_step, GuidedStep, StepOutcome};
pub use master_key::{master_key_state, take_master_key_offline, OfflineOutcome};
pub use signing_subkey::{locate_signing_subkey, SigningSubkey, SubkeySource};
pub use token_presence::{detect_token, require_token, supports_openpgp};
pub use workflows::{config_init, config_show, default_export_path, ConfigSources, Workflow};
