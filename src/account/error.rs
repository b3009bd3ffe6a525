use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FromJsonError {
    #[error("No `{key}` value present")]
    NoRequiredKeyValue { key: String },

    #[error("Account JSON cannot be decoded: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Account JSON is not an object")]
    NotAnObject,
}

/// Why a token generation attempt ended without new tokens. Every kind is final for the attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateTokensError {
    #[error("Provider answered with bad status code {0:?}")]
    BadStatusCode(Option<StatusCode>),

    #[error("Could not obtain an expected parameter from the provider's JSON")]
    CouldNotObtainParameterFromJson,

    #[error("Provider call returned no result")]
    NilApiResult,

    #[error("Provider result has no data")]
    NoDataInApiResult,

    #[error("Could not decode the provider result")]
    CouldNotDecodeResult,

    #[error("Failed saving refreshed credentials")]
    ErrorSavingCredsToDatabase,

    #[error("Account went away while tokens were being generated")]
    CouldNotGetSelf,
}
