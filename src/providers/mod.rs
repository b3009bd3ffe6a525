pub mod oauth2_account;

use crate::account::AccountType;
use crate::account::registry::{AccountRegistry, RegistryError};
use crate::api_call::Transport;
use crate::config_file::Config;
use oauth2_account::OAuth2Account;
use std::sync::Arc;

/// Registry of every account type this crate ships, configured from `config`. Provider calls of
/// its accounts go through `transport`.
pub fn default_registry(
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<AccountRegistry, RegistryError> {
    let mut registry = AccountRegistry::with_transport(transport);

    registry
        .register_with_toml::<OAuth2Account>(config.scheme_configuration(OAuth2Account::SCHEME))?;

    Ok(registry)
}
