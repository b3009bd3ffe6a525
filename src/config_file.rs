use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use tokio::fs;

use crate::account::UserId;
use crate::account_scheme::AccountScheme;
use crate::args::Arguments;

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Profile {
    /// Scheme of the user's account
    pub scheme: Option<AccountScheme>,

    /// Id of the user whose account gets refreshed
    pub user_id: Option<UserId>,

    /// Cloud folder name recorded for a user seen for the first time
    pub cloud_folder_name: Option<String>,

    /// State file with users and their account credentials
    pub state_file: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub profile: HashMap<String, Profile>,

    /// Provider configuration, one table per scheme name
    #[serde(default)]
    pub scheme: HashMap<String, toml::Table>,
}

impl Config {
    pub fn scheme_configuration(&self, scheme: AccountScheme) -> Option<toml::Table> {
        self.scheme.get(scheme.name()).cloned()
    }

    /// Fills arguments left unset on the command line from the selected profile.
    pub fn apply_profile(&self, mut args: Arguments) -> Result<Arguments> {
        let Some(name) = args.profile.to_owned() else {
            return Ok(args);
        };

        let profile = self
            .profile
            .get(&name)
            .with_context(|| format!("The given profile `{}` doesn't exist", name))?;
        log::debug!("Applying profile `{}`", name);

        if args.scheme.is_none() {
            args.scheme = profile.scheme;
        }

        if args.user_id.is_none() {
            args.user_id = profile.user_id;
        }

        if args.cloud_folder_name.is_none() {
            args.cloud_folder_name = profile.cloud_folder_name.to_owned();
        }

        if args.state_file.is_none() {
            args.state_file = profile.state_file.to_owned();
        }

        Ok(args)
    }
}

pub struct ConfigFile {
    file_path: PathBuf,
}

impl ConfigFile {
    pub fn new() -> Result<ConfigFile> {
        let mut file_path = home::home_dir().context("Couldn't access $HOME_DIR")?;
        file_path.push(".server-account/config.toml");

        Ok(ConfigFile { file_path })
    }

    pub fn from(file_path: PathBuf) -> ConfigFile {
        ConfigFile { file_path }
    }

    /// Reads the configuration. A missing or broken file reads as an empty configuration.
    pub async fn read(&self) -> Config {
        log::debug!("Reading the config file");
        let text = fs::read_to_string(&self.file_path)
            .await
            .unwrap_or_default();

        toml::from_str::<Config>(&text).unwrap_or_else(|e| {
            log::warn!(
                "Cannot parse config file {}. Error: {:?}",
                &self.file_path.to_string_lossy(),
                anyhow!(e)
            );

            Config::default()
        })
    }
}
