//! Ports (traits) for everything outside the process
//!
//! The core depends on these abstractions, not on gpg, ykman or the
//! terminal directly. Adapters implement them for the real programs and,
//! in tests, for scripted doubles.

mod command_runner;
mod host_tools;
mod key_editor;
mod key_inspector;
mod key_transfer;
mod operator;
mod trust_store;


pub use command_runner::{CommandRunner, Invocation};
pub use host_tools::HostTools;
pub use key_editor::KeyEditor;
pub use key_inspector::KeyInspector;
pub use key_transfer::KeyTransfer;
pub use operator::{Operator, Presenter, Prompter};
pub use trust_store::TrustStore;

/// Combined trait for all keyring and token operations
///
/// The gpg-backed directory implements this; use cases ask only for the
/// narrower traits they need.
pub trait KeyDirectory: KeyInspector + KeyTransfer + TrustStore + KeyEditor {}

// Blanket implementation for types that implement all operation traits
impl<T> KeyDirectory for T where T: KeyInspector + KeyTransfer + TrustStore + KeyEditor {}
