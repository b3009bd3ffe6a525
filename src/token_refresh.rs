use crate::account::Account;

/// Refreshes tokens of `account` only when it decides it needs to.
///
/// `db_creds` is the account already stored for the user, if any. `response` is whatever the
/// caller is answering its own client with; it is handed untouched to the callback that fires.
/// Exactly one of `on_success` and `on_failure` runs, once. Failures are not retried.
pub async fn generate_tokens_if_needed<S, F, G>(
    account: &mut dyn Account,
    db_creds: Option<&dyn Account>,
    response: &mut S,
    on_success: F,
    on_failure: G,
) where
    S: ?Sized + Send,
    F: FnOnce(&mut S) + Send,
    G: FnOnce(&mut S) + Send,
{
    if !account.need_to_generate_tokens(db_creds) {
        log::debug!("No need to generate tokens for {} account", account.account_scheme());
        on_success(response);
        return;
    }

    match account.generate_tokens().await {
        Ok(()) => on_success(response),
        Err(e) => {
            log::error!("Failed attempting to generate tokens: {}", e);
            on_failure(response);
        }
    }
}
