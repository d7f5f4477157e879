//! Manage GPG signing subkeys spread across several YubiKeys while the
//! primary key stays offline.
//!
//! The library drives the `gpg` command line; it never handles key
//! material itself.

mod adapters;
pub mod api;
pub mod config;
pub mod error;
mod logic;
pub mod model;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{Config, ConfigLayer};
pub use error::{YkgpgError, YkgpgResult};

pub use adapters::Terminal;
