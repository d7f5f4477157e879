use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing::debug;

use ykgpg::api::Services;
use ykgpg::use_cases::{config_init, config_show, ConfigSources};
use ykgpg::{Config, ConfigLayer, Terminal};

#[derive(Parser, Debug)]
#[command(name = "ykgpg")]
#[command(about = "Manage GPG signing subkeys across multiple YubiKeys", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Config file [default: ~/.config/ykgpg/config.toml]
    #[arg(long, global = true, env = "YKGPG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that take precedence over the config file and environment
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Primary key ID
    #[arg(long, global = true)]
    pub key_id: Option<String>,

    /// Primary key fingerprint
    #[arg(long, global = true)]
    pub fingerprint: Option<String>,

    /// Your name
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Your email
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Keyserver URL
    #[arg(long, global = true)]
    pub keyserver: Option<String>,

    /// Path to the offline master key backup
    #[arg(long, global = true)]
    pub master_key_path: Option<PathBuf>,

    /// Directory for automatic backups
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Overrides {
    fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            primary_key_id: self.key_id,
            primary_key_fingerprint: self.fingerprint,
            user_name: self.name,
            user_email: self.email,
            keyserver: self.keyserver,
            backup_dir: self.backup_dir,
            master_key_path: self.master_key_path,
            no_color: self.no_color.then_some(true),
            detection_timeout: None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Workflow(WorkflowCommand),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands that run against a loaded configuration
#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// Show primary key, subkeys and YubiKey status
    Status,

    /// Check that keys, YubiKey and git signing are set up correctly
    #[command(alias = "check")]
    Verify,

    /// Create a new signing subkey and move it to a new YubiKey
    Setup,

    /// Like setup, but create the subkey without the gpg addkey dialogue
    SetupBatch,

    /// Move an existing signing subkey to the attached YubiKey
    MoveSubkey,

    /// Remove the master secret key from the local keyring
    RemoveMasterKey,

    /// Revoke a subkey
    Revoke,

    /// Extend the expiration of the primary key and its subkeys
    Extend,

    /// Prepare a YubiKey for OpenPGP: PINs, key algorithm, cardholder
    InitCard,

    /// Set cardholder name and public key URL on the YubiKey
    #[command(alias = "metadata")]
    SetMetadata,

    /// Export the public key to a file
    Export {
        /// Output file [default: ~/public-key-YYYYMMDD.asc]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Back up the public key, owner trust and key listing
    Backup,

    /// Delete old keys from the keyring
    Cleanup,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a config file interactively
    Init,

    /// Show the effective configuration and where it came from
    Show,
}

fn config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

fn run_config(action: ConfigAction, file: Option<&Path>, flags: ConfigLayer) -> anyhow::Result<()> {
    let no_color = flags.no_color.unwrap_or(false);
    let path = config_path(file)?;
    match action {
        ConfigAction::Init => {
            let mut terminal = Terminal::new(no_color);
            let home = dirs::home_dir();
            config_init(&mut terminal, &path, home.as_deref())
                .context("failed to write configuration")?;
        }
        ConfigAction::Show => {
            let config = Config::load(file, flags).context("failed to load configuration")?;
            let terminal = Terminal::new(config.no_color);
            config_show(&terminal, &config, &ConfigSources::detect(&path));
        }
    }
    Ok(())
}

fn run(command: WorkflowCommand, config: &Config) -> anyhow::Result<()> {
    let mut services = Services::new(config);
    let mut workflow = services.workflow(config);
    match command {
        WorkflowCommand::Status => workflow.status()?,
        WorkflowCommand::Verify => workflow.verify()?,
        WorkflowCommand::Setup => workflow.setup()?,
        WorkflowCommand::SetupBatch => workflow.setup_batch()?,
        WorkflowCommand::MoveSubkey => workflow.move_subkey()?,
        WorkflowCommand::RemoveMasterKey => workflow.remove_master_key()?,
        WorkflowCommand::Revoke => workflow.revoke()?,
        WorkflowCommand::Extend => workflow.extend()?,
        WorkflowCommand::InitCard => workflow.init_card()?,
        WorkflowCommand::SetMetadata => workflow.set_metadata()?,
        WorkflowCommand::Export { output } => {
            workflow.export(output.as_deref())?;
        }
        WorkflowCommand::Backup => {
            workflow.backup()?;
        }
        WorkflowCommand::Cleanup => workflow.cleanup()?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let flags = cli.overrides.into_layer();
    let command = match cli.command {
        Commands::Config { action } => return run_config(action, cli.config.as_deref(), flags),
        Commands::Workflow(command) => command,
    };

    let config = Config::load(cli.config.as_deref(), flags).context("failed to load configuration")?;
    // init-card works on a blank token before any key exists.
    if !matches!(command, WorkflowCommand::InitCard) {
        config
            .validate()
            .context("invalid configuration; run 'ykgpg config init' or pass --key-id and --fingerprint")?;
    }
    debug!(?config, "configuration loaded");

    run(command, &config)
}
