use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;

use crate::account::UserId;
use crate::account_scheme::AccountScheme;

fn parse_header(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("Header `{}` is not in `Name: value` form", s))?;

    Ok((name.trim().to_owned(), value.trim().to_owned()))
}

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about)]
pub struct Arguments {
    /// Scheme of the user's account
    #[arg(long, value_enum, env = "SERVER_ACCOUNT_SCHEME")]
    pub scheme: Option<AccountScheme>,

    /// Id of the user whose account gets refreshed
    #[arg(long, env = "SERVER_ACCOUNT_USER_ID")]
    pub user_id: Option<UserId>,

    /// Request header carrying freshly obtained account data, e.g. `X-Auth-Code: 4/0Ab...`. May be repeated
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Cloud folder name recorded for a user seen for the first time
    #[arg(long, env = "SERVER_ACCOUNT_CLOUD_FOLDER_NAME")]
    pub cloud_folder_name: Option<String>,

    /// Drops the stored access token, so that a new one gets minted
    #[arg(long, short, default_value_t = false)]
    pub force: bool,

    /// State file with users and their account credentials. Defaults to `~/.server-account.json`
    #[arg(long, env = "SERVER_ACCOUNT_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Configuration file. Defaults to `~/.server-account/config.toml`
    #[arg(long, env = "SERVER_ACCOUNT_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Profile of the configuration file to take unset arguments from
    #[arg(long, short, env = "SERVER_ACCOUNT_PROFILE")]
    pub profile: Option<String>,

    /// Enables debug logging
    #[arg(long, short, default_value_t = false)]
    pub debug: bool,
}

pub struct Args;

impl Args {
    pub fn parse() -> Arguments {
        dotenv().ok();

        Arguments::parse()
    }
}
