use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

use crate::account::{Account, AccountCreationUser, AccountDelegate, UserData, UserId};
use crate::account_scheme::AccountScheme;

/// A user record as kept in the state file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredUser {
    pub user_id: UserId,

    pub account_type: AccountScheme,

    /// Account credentials in the account's JSON form
    pub creds: String,

    pub cloud_folder_name: Option<String>,
}

impl UserData for StoredUser {
    fn cloud_folder_name(&self) -> Option<String> {
        self.cloud_folder_name.to_owned()
    }

    fn account_type(&self) -> AccountScheme {
        self.account_type
    }

    fn creds(&self) -> String {
        self.creds.to_owned()
    }

    fn user_id(&self) -> UserId {
        self.user_id
    }
}

#[derive(Deserialize, Serialize)]
struct AccountState {
    version: u32,
    data: HashMap<UserId, StoredUser>,
}

/// Users and their account credentials, kept in a JSON file.
pub struct FileState {
    file_path: PathBuf,
    lock: Mutex<()>,
}

impl FileState {
    pub fn new() -> Result<FileState> {
        let mut file_path = home::home_dir().context("Couldn't access $HOME_DIR")?;
        file_path.push(".server-account.json");

        Ok(FileState::from(file_path))
    }

    pub fn from(file_path: PathBuf) -> FileState {
        FileState {
            file_path,
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> AccountState {
        log::debug!("Reading the state file");
        let text = fs::read_to_string(&self.file_path)
            .await
            .unwrap_or_default();

        let data = HashMap::new();
        serde_json::from_str::<AccountState>(&text).unwrap_or(AccountState { version: 1, data })
    }

    async fn write(&self, state: &AccountState) -> Result<()> {
        log::debug!("Writing the state file");
        let state_str = serde_json::to_string(state).context("Failed to serialize the state")?;

        fs::write(&self.file_path, state_str)
            .await
            .with_context(|| {
                format!(
                    "Failed to write to {} file",
                    &self.file_path.as_os_str().to_string_lossy()
                )
            })?;

        Ok(())
    }

    pub async fn read_user(&self, user_id: UserId) -> Option<StoredUser> {
        log::debug!("Reading user: {} from the state", user_id);
        let state = self.read().await;

        state.data.get(&user_id).cloned()
    }

    pub async fn upsert_user(&self, user: StoredUser) -> Result<()> {
        log::debug!("Saving user: {} to the state", user.user_id);
        let _guard = self.lock.lock().await;
        let mut state = self.read().await;

        state.data.insert(user.user_id, user);

        self.write(&state).await
    }

    pub async fn clear_user(&self, user_id: UserId) -> Result<()> {
        log::debug!("Clearing user: {} in the state", user_id);
        let _guard = self.lock.lock().await;
        let mut state = self.read().await;

        state.data.remove(&user_id);

        self.write(&state).await
    }

    async fn save_account(&self, account: &dyn Account) -> Result<()> {
        let user = account
            .account_creation_user()
            .context("Account has no user to be saved for")?;
        let creds = account
            .to_json()
            .context("Account cannot be serialized")?;

        let _guard = self.lock.lock().await;
        let mut state = self.read().await;

        let user_id = user.user_id();
        let cloud_folder_name = match user {
            AccountCreationUser::User(user) => user.cloud_folder_name(),
            AccountCreationUser::UserId(_) => state
                .data
                .get(&user_id)
                .and_then(|stored| stored.cloud_folder_name.to_owned()),
        };

        state.data.insert(
            user_id,
            StoredUser {
                user_id,
                account_type: account.account_scheme(),
                creds,
                cloud_folder_name,
            },
        );

        self.write(&state).await
    }
}

#[async_trait]
impl AccountDelegate for FileState {
    async fn save_to_database(&self, account: &dyn Account) -> bool {
        match self.save_account(account).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save {} account: {:?}", account.account_scheme(), e);
                false
            }
        }
    }
}
