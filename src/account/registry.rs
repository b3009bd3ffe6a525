use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::{
    Account, AccountCreationUser, AccountDelegate, AccountHeaders, AccountProperties, AccountType,
    FromJsonError,
};
use crate::account_scheme::AccountScheme;
use crate::api_call::Transport;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No account type registered for scheme {0}")]
    UnknownScheme(AccountScheme),

    #[error("Invalid configuration for scheme {scheme}: {message}")]
    InvalidConfiguration {
        scheme: AccountScheme,
        message: String,
    },

    #[error(transparent)]
    FromJson(#[from] FromJsonError),
}

type Delegate = Option<Arc<dyn AccountDelegate>>;

type NewFn = Box<dyn Fn(Delegate) -> Option<Box<dyn Account>> + Send + Sync>;
type FromJsonFn = Box<
    dyn Fn(&str, AccountCreationUser, Delegate) -> Result<Option<Box<dyn Account>>, FromJsonError>
        + Send
        + Sync,
>;
type FromPropertiesFn = Box<
    dyn Fn(&AccountProperties, Option<AccountCreationUser>, Delegate) -> Option<Box<dyn Account>>
        + Send
        + Sync,
>;
type GetPropertiesFn = fn(&dyn AccountHeaders) -> Map<String, Value>;

fn boxed<T: AccountType>(account: T, transport: &Option<Arc<dyn Transport>>) -> Box<dyn Account> {
    match transport {
        Some(transport) => Box::new(account.with_transport(transport.clone())),
        None => Box::new(account),
    }
}

struct Entry {
    new: NewFn,
    from_json: FromJsonFn,
    from_properties: FromPropertiesFn,
    get_properties: GetPropertiesFn,
}

/// Maps each scheme to the constructors of the account type implementing it.
#[derive(Default)]
pub struct AccountRegistry {
    entries: HashMap<AccountScheme, Entry>,
    transport: Option<Arc<dyn Transport>>,
}

impl AccountRegistry {
    pub fn new() -> AccountRegistry {
        AccountRegistry {
            entries: HashMap::new(),
            transport: None,
        }
    }

    /// Registry whose accounts make their provider calls through `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>) -> AccountRegistry {
        AccountRegistry {
            entries: HashMap::new(),
            transport: Some(transport),
        }
    }

    /// Registers `T` under its scheme, replacing whatever was registered there before.
    pub fn register<T: AccountType>(&mut self, configuration: Option<T::Configuration>) {
        log::debug!("Registering account type for {}", T::SCHEME);
        let configuration = configuration.map(Arc::new);

        let (config, transport) = (configuration.clone(), self.transport.clone());
        let new: NewFn = Box::new(move |delegate: Delegate| {
            T::new(config.clone(), delegate).map(|account| boxed(account, &transport))
        });

        let (config, transport) = (configuration.clone(), self.transport.clone());
        let from_json: FromJsonFn = Box::new(
            move |json: &str, user: AccountCreationUser, delegate: Delegate| {
                Ok(T::from_json(json, user, config.clone(), delegate)?
                    .map(|account| boxed(account, &transport)))
            },
        );

        let (config, transport) = (configuration, self.transport.clone());
        let from_properties: FromPropertiesFn = Box::new(
            move |properties: &AccountProperties,
                  user: Option<AccountCreationUser>,
                  delegate: Delegate| {
                T::from_properties(properties, user, config.clone(), delegate)
                    .map(|account| boxed(account, &transport))
            },
        );

        self.entries.insert(
            T::SCHEME,
            Entry {
                new,
                from_json,
                from_properties,
                get_properties: T::get_properties,
            },
        );
    }

    /// Registers `T` with its configuration taken from a TOML table.
    pub fn register_with_toml<T: AccountType>(
        &mut self,
        configuration: Option<toml::Table>,
    ) -> Result<(), RegistryError> {
        let configuration = configuration
            .map(|table| toml::Value::Table(table).try_into::<T::Configuration>())
            .transpose()
            .map_err(|e| RegistryError::InvalidConfiguration {
                scheme: T::SCHEME,
                message: e.to_string(),
            })?;

        self.register::<T>(configuration);
        Ok(())
    }

    pub fn is_registered(&self, scheme: AccountScheme) -> bool {
        self.entries.contains_key(&scheme)
    }

    fn entry(&self, scheme: AccountScheme) -> Result<&Entry, RegistryError> {
        self.entries
            .get(&scheme)
            .ok_or(RegistryError::UnknownScheme(scheme))
    }

    pub fn new_account(
        &self,
        scheme: AccountScheme,
        delegate: Delegate,
    ) -> Result<Option<Box<dyn Account>>, RegistryError> {
        Ok((self.entry(scheme)?.new)(delegate))
    }

    pub fn get_properties(
        &self,
        scheme: AccountScheme,
        headers: &dyn AccountHeaders,
    ) -> Result<AccountProperties, RegistryError> {
        let properties = (self.entry(scheme)?.get_properties)(headers);

        Ok(AccountProperties::new(scheme, properties))
    }

    pub fn from_properties(
        &self,
        properties: &AccountProperties,
        user: Option<AccountCreationUser>,
        delegate: Delegate,
    ) -> Result<Option<Box<dyn Account>>, RegistryError> {
        let entry = self.entry(properties.account_scheme)?;

        Ok((entry.from_properties)(properties, user, delegate))
    }

    pub fn from_json(
        &self,
        scheme: AccountScheme,
        json: &str,
        user: AccountCreationUser,
        delegate: Delegate,
    ) -> Result<Option<Box<dyn Account>>, RegistryError> {
        Ok((self.entry(scheme)?.from_json)(json, user, delegate)?)
    }
}
