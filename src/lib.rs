#![deny(warnings)]

use crate::account::{Account, AccountCreationUser, AccountDelegate};
use crate::api_call::Transport;
use crate::args::Arguments;
use crate::config_file::ConfigFile;
use crate::file_state::{FileState, StoredUser};
use crate::providers::default_registry;
use crate::token_refresh::generate_tokens_if_needed;
use anyhow::{Context, Result, bail};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

pub mod account;
pub mod account_scheme;
pub mod api_call;
pub mod args;
pub mod config_file;
pub mod file_state;
pub mod providers;
pub mod token_refresh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Pending,
    Succeeded,
    Failed,
}

fn succeeded(outcome: &mut RefreshOutcome) {
    *outcome = RefreshOutcome::Succeeded;
}

fn failed(outcome: &mut RefreshOutcome) {
    *outcome = RefreshOutcome::Failed;
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut header_map = HeaderMap::new();

    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name `{}`", name))?;
        let header_value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value of header `{}`", name))?;

        header_map.append(header_name, header_value);
    }

    Ok(header_map)
}

/// Brings the account of `args.user_id` up to date and returns its access token. Provider calls
/// go through `transport`.
///
/// Account data given as headers is treated like a just authenticated client request: a new
/// account is built from it, tokens are generated if it needs them, and the result is merged
/// into the stored account. Without headers the stored account refreshes itself.
pub async fn refresh_account(args: Arguments, transport: Arc<dyn Transport>) -> Result<String> {
    let config_file = match &args.config_file {
        Some(path) => ConfigFile::from(path.to_owned()),
        None => ConfigFile::new()?,
    };
    let config = config_file.read().await;
    let args = config.apply_profile(args)?;

    let scheme = args.scheme.context("`--scheme` is required")?;
    let user_id = args.user_id.context("`--user-id` is required")?;

    let registry =
        default_registry(&config, transport).context("Failed to set up account types")?;
    let file_state = Arc::new(match &args.state_file {
        Some(path) => FileState::from(path.to_owned()),
        None => FileState::new()?,
    });
    let delegate: Arc<dyn AccountDelegate> = file_state.clone();

    let headers = header_map(&args.headers)?;
    let candidate = if headers.is_empty() {
        None
    } else {
        let properties = registry.get_properties(scheme, &headers)?;
        let account = registry
            .from_properties(&properties, None, None)?
            .with_context(|| format!("Cannot create {} account from the given headers", scheme))?;

        Some(account)
    };

    let mut outcome = RefreshOutcome::Pending;
    let account: Box<dyn Account> = match (file_state.read_user(user_id).await, candidate) {
        (Some(stored_user), candidate) => {
            if stored_user.account_type != scheme {
                bail!(
                    "User {} has a {} account, not {}",
                    user_id,
                    stored_user.account_type,
                    scheme
                );
            }

            let user = AccountCreationUser::User(Arc::new(stored_user.to_owned()));
            let mut stored = registry
                .from_json(scheme, &stored_user.creds, user.clone(), Some(delegate.clone()))?
                .with_context(|| format!("Cannot restore {} account of user {}", scheme, user_id))?;

            if stored.owning_accounts_need_cloud_folder_name() {
                log::info!("Cloud folder: {:?}", stored.cloud_folder_name());
            }

            if args.force {
                stored.set_access_token(None);
            }

            match candidate {
                Some(mut candidate) => {
                    candidate.set_account_creation_user(Some(user));
                    generate_tokens_if_needed(
                        &mut *candidate,
                        Some(&*stored),
                        &mut outcome,
                        succeeded,
                        failed,
                    )
                    .await;

                    if outcome == RefreshOutcome::Succeeded {
                        stored.merge(&*candidate);

                        if !delegate.save_to_database(&*stored).await {
                            bail!("Failed to save the account of user {}", user_id);
                        }
                    }
                }
                None => {
                    generate_tokens_if_needed(&mut *stored, None, &mut outcome, succeeded, failed)
                        .await;
                }
            }

            stored
        }
        (None, Some(mut candidate)) => {
            candidate.set_account_creation_user(Some(AccountCreationUser::UserId(user_id)));
            generate_tokens_if_needed(&mut *candidate, None, &mut outcome, succeeded, failed)
                .await;

            if outcome == RefreshOutcome::Succeeded {
                let creds = candidate.to_json().with_context(|| {
                    format!("Headers carry no {} account data for user {}", scheme, user_id)
                })?;

                file_state
                    .upsert_user(StoredUser {
                        user_id,
                        account_type: scheme,
                        creds,
                        cloud_folder_name: args.cloud_folder_name.to_owned(),
                    })
                    .await?;
            }

            candidate
        }
        (None, None) => bail!(
            "User {} is unknown and no account headers were given",
            user_id
        ),
    };

    if outcome != RefreshOutcome::Succeeded {
        bail!("Failed to generate tokens for user {}", user_id);
    }

    account
        .access_token()
        .map(str::to_owned)
        .context("Account has no access token")
}
