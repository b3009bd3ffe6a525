//! The contract every provider account implements.
//!
//! An [`Account`] is one stored credential record: it knows its [`AccountScheme`], round-trips
//! through a JSON form, decides whether fresh tokens are needed and mints them. The type-level
//! half (construction from JSON, headers or properties) lives in [`AccountType`] so that
//! [`registry::AccountRegistry`] can dispatch on a scheme without knowing concrete types.

pub mod error;
pub mod registry;
pub mod user;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::account_scheme::AccountScheme;
use crate::api_call::Transport;
pub use error::{FromJsonError, GenerateTokensError};
pub use user::{AccountCreationUser, UserData, UserId, UserProfile};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Persists accounts on their behalf.
///
/// Accounts call this after minting tokens, when one is configured. Not every account gets a
/// delegate, which is how saving is allowed only some of the time.
#[async_trait]
pub trait AccountDelegate: Send + Sync {
    /// Returns `false` iff saving failed.
    async fn save_to_database(&self, account: &dyn Account) -> bool;
}

/// Lookup of inbound request headers.
pub trait AccountHeaders {
    fn header(&self, key: &str) -> Option<String>;
}

impl AccountHeaders for HashMap<String, String> {
    fn header(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl AccountHeaders for HeaderMap {
    fn header(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }
}

/// Account specific properties pulled out of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProperties {
    pub account_scheme: AccountScheme,
    pub properties: Map<String, Value>,
}

impl AccountProperties {
    pub fn new(account_scheme: AccountScheme, properties: Map<String, Value>) -> Self {
        Self {
            account_scheme,
            properties,
        }
    }
}

#[async_trait]
pub trait Account: Debug + Send + Sync {
    fn account_scheme(&self) -> AccountScheme;

    /// Sharing accounts always return `false`. Owning accounts return `true` iff they store data
    /// under a cloud folder.
    fn owning_accounts_need_cloud_folder_name(&self) -> bool;

    fn account_creation_user(&self) -> Option<&AccountCreationUser>;

    fn set_account_creation_user(&mut self, user: Option<AccountCreationUser>);

    fn access_token(&self) -> Option<&str>;

    fn set_access_token(&mut self, access_token: Option<String>);

    fn can_create_account(&self, _user_profile: &UserProfile) -> bool {
        true
    }

    fn to_json(&self) -> Option<String>;

    /// Given the account already stored for this user, if any, decides whether tokens have to be
    /// generated.
    ///
    /// Must be called before [`Account::generate_tokens`]: an account may keep state from the
    /// decision that changes what generation does.
    fn need_to_generate_tokens(&mut self, db_creds: Option<&dyn Account>) -> bool;

    /// Mints the tokens decided on by [`Account::need_to_generate_tokens`], saving the account
    /// through its delegate, if it has one, once they are in.
    async fn generate_tokens(&mut self) -> Result<(), GenerateTokensError>;

    /// Updates `self` from a just authenticated account of the same scheme. Fields `newer`
    /// doesn't carry are left alone.
    fn merge(&mut self, newer: &dyn Account);

    fn as_any(&self) -> &dyn Any;

    /// Cloud folder of the attached user. Only meaningful for owning accounts.
    ///
    /// # Panics
    ///
    /// When the account needs a cloud folder name and none can be resolved. That is a mismatch
    /// between configuration and stored data, not a runtime condition.
    fn cloud_folder_name(&self) -> Option<String> {
        let cloud_folder_name = match self.account_creation_user() {
            Some(AccountCreationUser::User(user)) => user.cloud_folder_name(),
            Some(AccountCreationUser::UserId(_)) | None => None,
        };

        match cloud_folder_name {
            Some(name) => {
                debug_assert!(self.owning_accounts_need_cloud_folder_name());
                Some(name)
            }
            None => {
                if self.owning_accounts_need_cloud_folder_name() {
                    log::error!(
                        "{} account needs a cloud folder name, but has none.",
                        self.account_scheme()
                    );
                    panic!("{} account has no cloud folder name", self.account_scheme());
                }

                None
            }
        }
    }
}

/// Construction side of an [`Account`] implementation.
pub trait AccountType: Account + Sized + 'static {
    const SCHEME: AccountScheme;

    /// Provider configuration, typically a table of the configuration file.
    type Configuration: DeserializeOwned + Debug + Send + Sync + 'static;

    fn new(
        configuration: Option<Arc<Self::Configuration>>,
        delegate: Option<Arc<dyn AccountDelegate>>,
    ) -> Option<Self>;

    /// Account specific properties, if any, found in the headers.
    fn get_properties(headers: &dyn AccountHeaders) -> Map<String, Value>;

    fn from_properties(
        properties: &AccountProperties,
        user: Option<AccountCreationUser>,
        configuration: Option<Arc<Self::Configuration>>,
        delegate: Option<Arc<dyn AccountDelegate>>,
    ) -> Option<Self>;

    fn from_json(
        json: &str,
        user: AccountCreationUser,
        configuration: Option<Arc<Self::Configuration>>,
        delegate: Option<Arc<dyn AccountDelegate>>,
    ) -> Result<Option<Self>, FromJsonError>;

    /// Routes the account's provider calls through `transport`.
    #[must_use]
    fn with_transport(self, transport: Arc<dyn Transport>) -> Self;
}

/// Decodes an account's JSON form into its key/value mapping.
pub fn json_object(json: &str) -> Result<Map<String, Value>, FromJsonError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(FromJsonError::NotAnObject),
    }
}

/// Hands the string under `key` to `set_with_value`. Values that aren't strings count as missing.
pub fn set_property(
    json: &Map<String, Value>,
    key: &str,
    required: bool,
    set_with_value: impl FnOnce(String),
) -> Result<(), FromJsonError> {
    match json.get(key).and_then(Value::as_str) {
        Some(value) => {
            set_with_value(value.to_owned());
            Ok(())
        }
        None if required => {
            log::error!("No {} value present: {:?}", key, json.keys());
            Err(FromJsonError::NoRequiredKeyValue {
                key: key.to_owned(),
            })
        }
        None => {
            log::warn!("No {} value present: {:?}", key, json.keys());
            Ok(())
        }
    }
}
