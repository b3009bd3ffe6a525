use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_variant::to_variant_name;

/// Whether accounts of a scheme own cloud storage for a user or only grant access to someone
/// else's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserType {
    Owning,
    Sharing,
}

#[derive(Serialize, Deserialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountScheme {
    /// Google Drive storage account
    Google,
    /// Dropbox storage account
    Dropbox,
    /// Microsoft OneDrive storage account
    Microsoft,
    /// Facebook sign in. Grants access to other users' data only
    Facebook,
    /// Sign in with Apple. Grants access to other users' data only
    AppleSignIn,
    /// Any provider speaking plain OAuth 2.0 token exchanges. More: <https://www.rfc-editor.org/rfc/rfc6749#section-6>
    #[serde(rename = "OAuth2")]
    #[value(name = "oauth2")]
    OAuth2,
}

impl AccountScheme {
    pub fn user_type(&self) -> UserType {
        match self {
            AccountScheme::Google
            | AccountScheme::Dropbox
            | AccountScheme::Microsoft
            | AccountScheme::OAuth2 => UserType::Owning,
            AccountScheme::Facebook | AccountScheme::AppleSignIn => UserType::Sharing,
        }
    }

    /// Name used for this scheme in stored records and configuration files.
    pub fn name(&self) -> &'static str {
        to_variant_name(self).unwrap_or("Unknown")
    }
}

impl std::fmt::Display for AccountScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
