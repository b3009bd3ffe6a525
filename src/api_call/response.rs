use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use thiserror::Error;

use super::transport::TransportError;

/// How the caller expects a response body to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedResponse {
    Data,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCallResult {
    Dictionary(Map<String, Value>),
    Array(Vec<Value>),
    Data(Bytes),
}

impl ApiCallResult {
    pub fn as_dictionary(&self) -> Option<&Map<String, Value>> {
        match self {
            ApiCallResult::Dictionary(dictionary) => Some(dictionary),
            ApiCallResult::Array(_) | ApiCallResult::Data(_) => None,
        }
    }
}

/// Outcome of one call. All three are `None` when the call failed for an unspecified reason.
#[derive(Debug, Default)]
pub struct ApiResponse {
    pub result: Option<ApiCallResult>,
    pub status: Option<StatusCode>,
    pub headers: Option<HeaderMap>,
}

impl ApiResponse {
    pub fn none() -> ApiResponse {
        ApiResponse::default()
    }

    pub fn is_none(&self) -> bool {
        self.result.is_none() && self.status.is_none() && self.headers.is_none()
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read response body: {0}")]
    Unreadable(TransportError),

    #[error("Response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_response(
    body: Result<Bytes, TransportError>,
    expected: Option<ExpectedResponse>,
) -> Result<ApiCallResult, ParseError> {
    let body = body.map_err(ParseError::Unreadable)?;

    match expected {
        Some(ExpectedResponse::Data) => Ok(ApiCallResult::Data(body)),
        Some(ExpectedResponse::Json) => {
            let json = serde_json::from_slice::<Value>(&body)?;
            Ok(from_json_value(json, body))
        }
        None => match serde_json::from_slice::<Value>(&body) {
            Ok(json) => Ok(from_json_value(json, body)),
            Err(_) => Ok(ApiCallResult::Data(body)),
        },
    }
}

fn from_json_value(json: Value, body: Bytes) -> ApiCallResult {
    match json {
        Value::Object(dictionary) => ApiCallResult::Dictionary(dictionary),
        Value::Array(array) => ApiCallResult::Array(array),
        _ => ApiCallResult::Data(body),
    }
}
