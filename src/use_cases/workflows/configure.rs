//! `config init` and `config show`. These run before a valid
//! configuration exists, so they are free functions rather than
//! [`Workflow`](super::Workflow) methods.

use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigLayer, ENV_VARS};
use crate::error::YkgpgResult;
use crate::model::Fingerprint;
use crate::ports::{Operator, Presenter};

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSources {
    pub file: PathBuf,
    pub file_exists: bool,
    /// Names of the `YKGPG_*` variables that are set.
    pub env_vars: Vec<String>,
}

impl ConfigSources {
    pub fn detect(file: &Path) -> Self {
        let env_vars = ENV_VARS
            .iter()
            .filter(|name| std::env::var(name).is_ok_and(|value| !value.trim().is_empty()))
            .map(|name| name.to_string())
            .collect();
        Self {
            file: file.to_path_buf(),
            file_exists: file.is_file(),
            env_vars,
        }
    }
}

/// Ask for every setting and write the file at `path`.
///
/// Returns `None` when the operator declines to overwrite an existing file.
pub fn config_init<O>(operator: &mut O, path: &Path, home: Option<&Path>) -> YkgpgResult<Option<Config>>
where
    O: Operator + ?Sized,
{
    operator.header("Configure ykgpg");
    if path.exists()
        && !operator.confirm(&format!(
            "Overwrite existing configuration at {}?",
            path.display()
        ))?
    {
        operator.info("Configuration left unchanged");
        return Ok(None);
    }

    operator.info("Find your key ID and fingerprint with:");
    operator.line("  gpg --list-secret-keys --keyid-format long");

    let primary_key_id = operator.ask_required("Primary key ID")?;
    let fingerprint = loop {
        let answer = operator.ask_required("Primary key fingerprint")?;
        match Fingerprint::parse(&answer) {
            Ok(fingerprint) => break fingerprint,
            Err(err) => operator.error(&err.to_string()),
        }
    };
    let user_name = operator.ask_required("Your name")?;
    let user_email = operator.ask_required("Your email")?;
    let keyserver = operator.ask_with_default("Keyserver", Config::DEFAULT_KEYSERVER)?;

    let default_backup_dir = match home {
        Some(home) => Config::default_backup_dir(home),
        None => PathBuf::from(".gnupg").join("backups"),
    };
    let backup_dir = operator.ask_with_default(
        "Backup directory",
        &default_backup_dir.display().to_string(),
    )?;
    let master_key_path = operator.ask("Master key path (leave empty to be asked each time)")?;
    let master_key_path = master_key_path.trim();
    let no_color = operator.confirm("Disable colored output?")?;

    let layer = ConfigLayer {
        primary_key_id: Some(primary_key_id),
        primary_key_fingerprint: Some(fingerprint.to_string()),
        user_name: Some(user_name),
        user_email: Some(user_email),
        keyserver: Some(keyserver),
        backup_dir: Some(PathBuf::from(backup_dir)),
        master_key_path: (!master_key_path.is_empty()).then(|| PathBuf::from(master_key_path)),
        no_color: Some(no_color),
        detection_timeout: None,
    };
    let config = Config::resolve(layer, home);
    config.validate()?;
    config.to_layer().write_to(path)?;

    operator.success(&format!("Configuration saved to {}", path.display()));
    Ok(Some(config))
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "[not set]"
    } else {
        value
    }
}

/// Print the effective configuration and its sources.
pub fn config_show<P>(presenter: &P, config: &Config, sources: &ConfigSources)
where
    P: Presenter + ?Sized,
{
    presenter.header("Configuration");
    presenter.key_value("Primary key ID", or_unset(&config.primary_key_id));
    presenter.key_value("Fingerprint", or_unset(&config.primary_key_fingerprint));
    presenter.key_value("Name", or_unset(&config.user_name));
    presenter.key_value("Email", or_unset(&config.user_email));
    presenter.key_value("Keyserver", &config.keyserver);
    presenter.key_value("Backup directory", &config.backup_dir.display().to_string());
    let master = config
        .master_key_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "[asked when needed]".to_string());
    presenter.key_value("Master key path", &master);
    presenter.key_value("No color", &config.no_color.to_string());
    presenter.key_value(
        "Detection timeout",
        &format!("{}s", config.detection_timeout.as_secs()),
    );

    presenter.section("Sources");
    let state = if sources.file_exists { "found" } else { "not found" };
    presenter.key_value("Config file", &format!("{} ({state})", sources.file.display()));
    if sources.env_vars.is_empty() {
        presenter.key_value("Environment", "none");
    } else {
        presenter.key_value("Environment", &sources.env_vars.join(", "));
    }
}
