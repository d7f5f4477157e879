//! Layered configuration
//!
//! Lowest to highest precedence: built-in defaults, the TOML file, `YKGPG_*`
//! environment variables, command-line flags. Each source is read into a
//! [`ConfigLayer`] of optional values; layers are stacked and the result
//! resolved into a [`Config`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::model::Fingerprint;

pub const ENV_PREFIX: &str = "YKGPG_";

/// Every environment variable that feeds a configuration value.
pub const ENV_VARS: [&str; 9] = [
    "YKGPG_PRIMARY_KEY_ID",
    "YKGPG_PRIMARY_KEY_FINGERPRINT",
    "YKGPG_USER_NAME",
    "YKGPG_USER_EMAIL",
    "YKGPG_KEYSERVER",
    "YKGPG_MASTER_KEY_PATH",
    "YKGPG_BACKUP_DIR",
    "YKGPG_NO_COLOR",
    "YKGPG_DETECTION_TIMEOUT",
];

/// One source of configuration values. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyserver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_key_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_color: Option<bool>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_timeout: Option<u64>,
}

impl ConfigLayer {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config file; a missing file is an empty layer, not an error.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                Ok(None)
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Layer from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_vars(std::env::vars())
    }

    /// Layer from `YKGPG_*` pairs. Empty values count as unset.
    pub fn from_env_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "PRIMARY_KEY_ID" => layer.primary_key_id = Some(value.to_string()),
                "PRIMARY_KEY_FINGERPRINT" => layer.primary_key_fingerprint = Some(value.to_string()),
                "USER_NAME" => layer.user_name = Some(value.to_string()),
                "USER_EMAIL" => layer.user_email = Some(value.to_string()),
                "KEYSERVER" => layer.keyserver = Some(value.to_string()),
                "MASTER_KEY_PATH" => layer.master_key_path = Some(PathBuf::from(value)),
                "BACKUP_DIR" => layer.backup_dir = Some(PathBuf::from(value)),
                "NO_COLOR" => layer.no_color = Some(parse_flag("YKGPG_NO_COLOR", value)?),
                "DETECTION_TIMEOUT" => {
                    layer.detection_timeout =
                        Some(value.parse().map_err(|_| ConfigError::Invalid {
                            field: "YKGPG_DETECTION_TIMEOUT",
                            reason: format!("expected whole seconds, got {value:?}"),
                        })?)
                }
                _ => debug!(name, "ignoring unknown environment variable"),
            }
        }
        Ok(layer)
    }

    /// `self` with every value set in `higher` replaced by it.
    pub fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            primary_key_id: higher.primary_key_id.or(self.primary_key_id),
            primary_key_fingerprint: higher
                .primary_key_fingerprint
                .or(self.primary_key_fingerprint),
            user_name: higher.user_name.or(self.user_name),
            user_email: higher.user_email.or(self.user_email),
            keyserver: higher.keyserver.or(self.keyserver),
            backup_dir: higher.backup_dir.or(self.backup_dir),
            master_key_path: higher.master_key_path.or(self.master_key_path),
            no_color: higher.no_color.or(self.no_color),
            detection_timeout: higher.detection_timeout.or(self.detection_timeout),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write as TOML, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("expected a boolean, got {value:?}"),
        }),
    }
}

/// Effective configuration handed to every workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub primary_key_id: String,
    pub primary_key_fingerprint: String,
    pub user_name: String,
    pub user_email: String,
    pub keyserver: String,
    pub backup_dir: PathBuf,
    pub master_key_path: Option<PathBuf>,
    pub no_color: bool,
    /// Bound on passive token queries.
    pub detection_timeout: Duration,
}

impl Config {
    pub const DEFAULT_KEYSERVER: &'static str = "hkps://keys.openpgp.org";
    pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(3);

    /// `~/.config/ykgpg/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::path_under(&home))
    }

    pub fn path_under(home: &Path) -> PathBuf {
        home.join(".config").join("ykgpg").join("config.toml")
    }

    pub fn default_backup_dir(home: &Path) -> PathBuf {
        home.join(".gnupg").join("backups")
    }

    /// Apply built-in defaults to a stacked layer. Relative to `home` when
    /// one is known.
    pub fn resolve(layer: ConfigLayer, home: Option<&Path>) -> Config {
        let backup_dir = layer.backup_dir.unwrap_or_else(|| match home {
            Some(home) => Self::default_backup_dir(home),
            None => PathBuf::from(".gnupg").join("backups"),
        });
        Config {
            primary_key_id: layer.primary_key_id.unwrap_or_default(),
            primary_key_fingerprint: layer.primary_key_fingerprint.unwrap_or_default(),
            user_name: layer.user_name.unwrap_or_default(),
            user_email: layer.user_email.unwrap_or_default(),
            keyserver: layer
                .keyserver
                .unwrap_or_else(|| Self::DEFAULT_KEYSERVER.to_string()),
            backup_dir,
            master_key_path: layer.master_key_path,
            no_color: layer.no_color.unwrap_or(false),
            detection_timeout: layer
                .detection_timeout
                .map(Duration::from_secs)
                .unwrap_or(Self::DEFAULT_DETECTION_TIMEOUT),
        }
    }

    /// Stack file, environment and `flags`, then resolve.
    ///
    /// `file` overrides the default location; an explicitly named file
    /// must exist.
    pub fn load(file: Option<&Path>, flags: ConfigLayer) -> Result<Config, ConfigError> {
        let home = dirs::home_dir();
        let file_layer = match file {
            Some(path) => ConfigLayer::from_file(path)?.ok_or_else(|| ConfigError::Read {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "file does not exist"),
            })?,
            None => match home.as_deref() {
                Some(home) => ConfigLayer::from_file(&Self::path_under(home))?.unwrap_or_default(),
                None => ConfigLayer::default(),
            },
        };

        let stacked = file_layer.overlay(ConfigLayer::from_env()?).overlay(flags);
        Ok(Self::resolve(stacked, home.as_deref()))
    }

    /// Check the values every key-touching workflow depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_key_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "primary_key_id",
            });
        }
        self.fingerprint()?;
        if self.detection_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "detection_timeout",
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    /// The primary key fingerprint, parsed.
    pub fn fingerprint(&self) -> Result<Fingerprint, ConfigError> {
        if self.primary_key_fingerprint.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "primary_key_fingerprint",
            });
        }
        Ok(Fingerprint::parse(&self.primary_key_fingerprint)?)
    }

    /// The values as a file layer, for writing back to disk.
    pub fn to_layer(&self) -> ConfigLayer {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ConfigLayer {
            primary_key_id: non_empty(&self.primary_key_id),
            primary_key_fingerprint: non_empty(&self.primary_key_fingerprint),
            user_name: non_empty(&self.user_name),
            user_email: non_empty(&self.user_email),
            keyserver: Some(self.keyserver.clone()),
            backup_dir: Some(self.backup_dir.clone()),
            master_key_path: self.master_key_path.clone(),
            no_color: Some(self.no_color),
            detection_timeout: Some(self.detection_timeout.as_secs()),
        }
    }
}
