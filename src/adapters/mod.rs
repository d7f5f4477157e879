//! Adapters - concrete implementations of ports (traits)

mod gpg_directory;
mod process_runner;
mod system_tools;
mod terminal;

#[cfg(test)]
pub mod fake_keyring;
#[cfg(test)]
pub mod scripted_operator;
#[cfg(test)]
pub mod scripted_runner;

// Re-export for convenience
pub use gpg_directory::GpgKeyDirectory;
pub use process_runner::ProcessRunner;
pub use system_tools::SystemTools;
pub use terminal::Terminal;
