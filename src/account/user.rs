use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use crate::account_scheme::AccountScheme;

pub type UserId = i64;

/// A user record already known to the server.
pub trait UserData: Debug + Send + Sync {
    fn cloud_folder_name(&self) -> Option<String>;

    fn account_type(&self) -> AccountScheme;

    /// Credentials of the user's account, in the account's JSON form.
    fn creds(&self) -> String;

    fn user_id(&self) -> UserId;
}

/// The user an account is being created or used for.
#[derive(Debug, Clone)]
pub enum AccountCreationUser {
    /// Use this when the user record is at hand.
    User(Arc<dyn UserData>),
    /// And this when only its id is known.
    UserId(UserId),
}

impl AccountCreationUser {
    pub fn user_id(&self) -> UserId {
        match self {
            AccountCreationUser::User(user) => user.user_id(),
            AccountCreationUser::UserId(user_id) => *user_id,
        }
    }
}

/// Profile of a freshly signed in user, as reported by the sign-in provider.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,

    pub display_name: String,

    /// Provider which authenticated the user
    pub provider: String,

    pub emails: Vec<String>,
}
