use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

use crate::account::{
    ACCESS_TOKEN_KEY, Account, AccountCreationUser, AccountDelegate, AccountHeaders,
    AccountProperties, AccountType, FromJsonError, GenerateTokensError, REFRESH_TOKEN_KEY,
    UserProfile, json_object, set_property,
};
use crate::account_scheme::{AccountScheme, UserType};
use crate::api_call::{
    AccountApiCall, ApiCallBody, ApiCallResult, ApiRequest, ExpectedResponse, Transport,
};

pub const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";
pub const AUTH_CODE_HEADER: &str = "X-Auth-Code";

/// Property key of the one-time authorization code.
pub const AUTH_CODE_KEY: &str = "authCode";

/// How the client authenticates at the token endpoint. More: <https://www.rfc-editor.org/rfc/rfc6749#section-2.3.1>
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuth {
    /// `client_id` and `client_secret` sent as form parameters
    #[default]
    RequestBody,
    /// HTTP Basic authentication
    Basic,
}

fn default_token_path() -> String {
    "/token".to_owned()
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct OAuth2Configuration {
    /// OAuth 2.0 Client Identifier <https://www.rfc-editor.org/rfc/rfc6749#section-2.2>
    pub client_id: String,

    /// OAuth 2.0 Client Secret <https://www.rfc-editor.org/rfc/rfc6749#section-2.3.1>
    pub client_secret: Option<String>,

    /// Host of the token endpoint, without scheme
    pub token_host: String,

    /// Path of the token endpoint
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Redirect URI the authorization code was issued for
    pub redirect_uri: Option<String>,

    /// OAuth 2.0 Scope <https://www.rfc-editor.org/rfc/rfc6749#section-3.3>
    pub scope: Option<String>,

    #[serde(default)]
    pub client_auth: ClientAuth,

    /// Accounts own cloud storage kept under the user's cloud folder. Ignored for sharing schemes
    #[serde(default)]
    pub owning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Exchange {
    AuthorizationCode(String),
    RefreshToken(String),
}

/// Account of any provider speaking plain OAuth 2.0.
///
/// Tokens are minted either by redeeming a one-time authorization code or, when the access token
/// is gone, by redeeming the refresh token.
pub struct OAuth2Account {
    configuration: Arc<OAuth2Configuration>,
    delegate: Option<Arc<dyn AccountDelegate>>,
    api: AccountApiCall,
    account_creation_user: Option<AccountCreationUser>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    auth_code: Option<String>,
    pending: Option<Exchange>,
}

impl std::fmt::Debug for OAuth2Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Account")
            .field("client_id", &self.configuration.client_id)
            .field("account_creation_user", &self.account_creation_user)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_auth_code", &self.auth_code.is_some())
            .finish_non_exhaustive()
    }
}

impl OAuth2Account {
    /// Replaces the engine used for token exchanges.
    #[must_use]
    pub fn with_api_call(mut self, api: AccountApiCall) -> Self {
        self.api = api;
        self
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn set_refresh_token(&mut self, refresh_token: Option<String>) {
        self.refresh_token = refresh_token;
    }

    pub fn auth_code(&self) -> Option<&str> {
        self.auth_code.as_deref()
    }

    fn token_request(&self, exchange: &Exchange) -> ApiRequest {
        let configuration = &self.configuration;
        let mut form = form_urlencoded::Serializer::new(String::new());

        match exchange {
            Exchange::AuthorizationCode(code) => {
                form.append_pair("grant_type", "authorization_code");
                form.append_pair("code", code);

                if let Some(redirect_uri) = &configuration.redirect_uri {
                    form.append_pair("redirect_uri", redirect_uri);
                }
            }
            Exchange::RefreshToken(refresh_token) => {
                form.append_pair("grant_type", "refresh_token");
                form.append_pair("refresh_token", refresh_token);
            }
        }

        if let Some(scope) = &configuration.scope {
            form.append_pair("scope", scope);
        }

        let mut request = ApiRequest::new(Method::POST, configuration.token_path.to_owned())
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .expected_success_body(ExpectedResponse::Json)
            .expected_failure_body(ExpectedResponse::Json);

        match configuration.client_auth {
            ClientAuth::RequestBody => {
                form.append_pair("client_id", &configuration.client_id);

                if let Some(client_secret) = &configuration.client_secret {
                    form.append_pair("client_secret", client_secret);
                }
            }
            ClientAuth::Basic => {
                let credentials = format!(
                    "{}:{}",
                    configuration.client_id,
                    configuration.client_secret.as_deref().unwrap_or_default()
                );
                request = request.with_header(
                    "Authorization",
                    format!("Basic {}", BASE64_STANDARD.encode(credentials)),
                );
            }
        }

        request.with_body(ApiCallBody::String(form.finish()))
    }
}

fn tokens_from_result(
    result: Option<ApiCallResult>,
) -> Result<(String, Option<String>), GenerateTokensError> {
    let dictionary = match result {
        Some(ApiCallResult::Dictionary(dictionary)) => dictionary,
        Some(ApiCallResult::Array(_)) | Some(ApiCallResult::Data(_)) => {
            return Err(GenerateTokensError::CouldNotDecodeResult);
        }
        None => return Err(GenerateTokensError::NilApiResult),
    };

    if dictionary.is_empty() {
        return Err(GenerateTokensError::NoDataInApiResult);
    }

    let access_token = dictionary
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or(GenerateTokensError::CouldNotObtainParameterFromJson)?;
    let refresh_token = dictionary
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok((access_token.to_owned(), refresh_token))
}

#[async_trait]
impl Account for OAuth2Account {
    fn account_scheme(&self) -> AccountScheme {
        Self::SCHEME
    }

    fn owning_accounts_need_cloud_folder_name(&self) -> bool {
        Self::SCHEME.user_type() == UserType::Owning && self.configuration.owning
    }

    fn account_creation_user(&self) -> Option<&AccountCreationUser> {
        self.account_creation_user.as_ref()
    }

    fn set_account_creation_user(&mut self, user: Option<AccountCreationUser>) {
        self.account_creation_user = user;
    }

    fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn set_access_token(&mut self, access_token: Option<String>) {
        self.access_token = access_token;
    }

    fn can_create_account(&self, user_profile: &UserProfile) -> bool {
        !user_profile.id.is_empty()
    }

    /// `None` until the account holds an access token, since the stored form requires one.
    fn to_json(&self) -> Option<String> {
        let access_token = self.access_token.as_ref()?;

        let mut json = Map::new();
        json.insert(ACCESS_TOKEN_KEY.to_owned(), access_token.to_owned().into());

        if let Some(refresh_token) = &self.refresh_token {
            json.insert(REFRESH_TOKEN_KEY.to_owned(), refresh_token.to_owned().into());
        }

        serde_json::to_string(&Value::Object(json)).ok()
    }

    fn need_to_generate_tokens(&mut self, db_creds: Option<&dyn Account>) -> bool {
        self.pending = if let Some(code) = &self.auth_code {
            Some(Exchange::AuthorizationCode(code.to_owned()))
        } else if self.access_token.is_none() {
            let stored_refresh_token = db_creds
                .and_then(|account| account.as_any().downcast_ref::<OAuth2Account>())
                .and_then(|account| account.refresh_token.to_owned());

            self.refresh_token
                .to_owned()
                .or(stored_refresh_token)
                .map(Exchange::RefreshToken)
        } else {
            None
        };

        log::debug!("Token exchange needed: {:?}", self.pending.is_some());
        self.pending.is_some()
    }

    async fn generate_tokens(&mut self) -> Result<(), GenerateTokensError> {
        let exchange = match self.pending.take() {
            Some(exchange) => exchange,
            None => {
                log::warn!("No token exchange pending, nothing to generate");
                return Ok(());
            }
        };

        let response = self.api.api_call(self.token_request(&exchange)).await;

        match response.status {
            Some(StatusCode::OK) => {}
            Some(status) => {
                log::error!(
                    "Token endpoint answered {}: {:?}",
                    status,
                    response.result.as_ref().and_then(ApiCallResult::as_dictionary)
                );
                return Err(GenerateTokensError::BadStatusCode(Some(status)));
            }
            None => return Err(GenerateTokensError::NilApiResult),
        }

        let (access_token, refresh_token) = tokens_from_result(response.result)?;

        self.access_token = Some(access_token);
        match exchange {
            Exchange::AuthorizationCode(_) => {
                self.auth_code = None;
                if refresh_token.is_some() {
                    self.refresh_token = refresh_token;
                }
            }
            Exchange::RefreshToken(used) => {
                self.refresh_token = refresh_token.or(Some(used));
            }
        }

        if let Some(delegate) = self.delegate.clone() {
            if !delegate.save_to_database(self).await {
                return Err(GenerateTokensError::ErrorSavingCredsToDatabase);
            }
        }

        Ok(())
    }

    fn merge(&mut self, newer: &dyn Account) {
        let Some(newer) = newer.as_any().downcast_ref::<OAuth2Account>() else {
            log::error!(
                "Cannot merge {} account into {} account",
                newer.account_scheme(),
                self.account_scheme()
            );
            return;
        };

        if let Some(access_token) = &newer.access_token {
            self.access_token = Some(access_token.to_owned());
        }

        if let Some(refresh_token) = &newer.refresh_token {
            self.refresh_token = Some(refresh_token.to_owned());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AccountType for OAuth2Account {
    const SCHEME: AccountScheme = AccountScheme::OAuth2;

    type Configuration = OAuth2Configuration;

    fn new(
        configuration: Option<Arc<OAuth2Configuration>>,
        delegate: Option<Arc<dyn AccountDelegate>>,
    ) -> Option<Self> {
        let Some(configuration) = configuration else {
            log::error!("{} account needs a configuration", Self::SCHEME);
            return None;
        };

        let api = AccountApiCall::new().base_url(configuration.token_host.to_owned());

        Some(OAuth2Account {
            configuration,
            delegate,
            api,
            account_creation_user: None,
            access_token: None,
            refresh_token: None,
            auth_code: None,
            pending: None,
        })
    }

    fn get_properties(headers: &dyn AccountHeaders) -> Map<String, Value> {
        let mut properties = Map::new();

        if let Some(access_token) = headers.header(ACCESS_TOKEN_HEADER) {
            properties.insert(ACCESS_TOKEN_KEY.to_owned(), access_token.into());
        }

        if let Some(auth_code) = headers.header(AUTH_CODE_HEADER) {
            properties.insert(AUTH_CODE_KEY.to_owned(), auth_code.into());
        }

        properties
    }

    fn from_properties(
        properties: &AccountProperties,
        user: Option<AccountCreationUser>,
        configuration: Option<Arc<OAuth2Configuration>>,
        delegate: Option<Arc<dyn AccountDelegate>>,
    ) -> Option<Self> {
        let mut account = Self::new(configuration, delegate)?;
        let string_property = |key: &str| {
            properties
                .properties
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        account.access_token = string_property(ACCESS_TOKEN_KEY);
        account.auth_code = string_property(AUTH_CODE_KEY);
        account.account_creation_user = user;

        Some(account)
    }

    fn from_json(
        json: &str,
        user: AccountCreationUser,
        configuration: Option<Arc<OAuth2Configuration>>,
        delegate: Option<Arc<dyn AccountDelegate>>,
    ) -> Result<Option<Self>, FromJsonError> {
        let json = json_object(json)?;
        let Some(mut account) = Self::new(configuration, delegate) else {
            return Ok(None);
        };

        set_property(&json, ACCESS_TOKEN_KEY, true, |value| {
            account.access_token = Some(value)
        })?;
        set_property(&json, REFRESH_TOKEN_KEY, false, |value| {
            account.refresh_token = Some(value)
        })?;
        account.account_creation_user = Some(user);

        Ok(Some(account))
    }

    fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        let api = AccountApiCall::with_transport(transport)
            .base_url(self.configuration.token_host.to_owned());

        self.with_api_call(api)
    }
}
