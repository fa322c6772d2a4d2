use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use crate::{api::Credentials, utils};

pub const CONFIG_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_UPDATE_URL: &str =
    "https://gitee.com/pavinberg/njuNetLogin/raw/master/njunet.ron";

static CONFIG_PATHS: [&str; 3] = [
    "~/.config/njunet.ron",
    "~/.njunet.ron",
    "/etc/njunet/config.ron",
];

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Configuration {
    /// Version of this configuration block, compared by `update`.
    pub version: String,
    pub username: String,
    pub password: String,
    pub request_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub logout_retry_delay_ms: u64,
    pub update_url: String,
    /// Extra command names the logout process check never reports.
    pub ignored_commands: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.into(),
            username: String::new(),
            password: String::new(),
            request_timeout_secs: 5,
            settle_delay_ms: 1000,
            logout_retry_delay_ms: 500,
            update_url: DEFAULT_UPDATE_URL.into(),
            ignored_commands: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn logout_retry_delay(&self) -> Duration {
        Duration::from_millis(self.logout_retry_delay_ms)
    }

    pub fn to_pretty_string(&self) -> Result<String> {
        let pretty_config = ron::ser::PrettyConfig::default();
        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }
}

/// A configuration together with the file it belongs to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    /// `false` when no file was found and defaults are in use.
    pub exists: bool,
    pub config: Configuration,
}

pub fn parse(content: &str) -> Result<Configuration> {
    Ok(ron::from_str::<Configuration>(content)?)
}

fn parse_from_path(path: &Path) -> Result<Configuration> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {:?}", path))?;
    parse(&content).with_context(|| format!("Invalid configuration {:?}", path))
}

pub fn default_path() -> PathBuf {
    utils::expand_home(CONFIG_PATHS[0])
}

/// Loads the file given on the command line, else the first existing default path.
pub fn load(path: Option<&PathBuf>) -> Result<LoadedConfig> {
    if let Some(path) = path {
        let exists = std::fs::metadata(path).is_ok();
        let config = match exists {
            true => parse_from_path(path)?,
            false => Configuration::default(),
        };

        return Ok(LoadedConfig {
            path: path.to_owned(),
            exists,
            config,
        });
    }

    for path in CONFIG_PATHS.iter() {
        let path = utils::expand_home(path);
        if std::fs::metadata(&path).is_err() {
            continue;
        }

        log::debug!("Using configuration {:?}", path);
        let config = parse_from_path(&path)?;
        return Ok(LoadedConfig {
            path,
            exists: true,
            config,
        });
    }

    log::debug!("No configuration file found, using defaults");
    Ok(LoadedConfig {
        path: default_path(),
        exists: false,
        config: Configuration::default(),
    })
}

pub fn init(args: &ArgMatches) -> Result<LoadedConfig> {
    load(args.get_one::<PathBuf>("config"))
}
