//! Outbound HTTPS calls to account providers.
//!
//! [`AccountApiCall`] performs one request/response exchange per call and normalizes the body
//! into an [`ApiCallResult`]. It keeps no state between calls besides its default host, so a
//! single instance can be reused and shared.

pub mod query;
pub mod response;
pub mod transport;

use bytes::Bytes;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use response::{ApiCallResult, ApiResponse, ExpectedResponse};
pub use transport::{OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError};

use query::path_with_parameters;
use response::{ParseError, parse_response};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCallBody {
    String(String),
    Data(Bytes),
}

/// Extra knobs forwarded to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOption {
    Timeout(Duration),
    Port(u16),
}

#[derive(Error, Debug)]
pub enum ApiCallError {
    #[error("No host given for the call and no default host configured")]
    MissingHost,

    #[error("Cannot build request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header `{0}`")]
    InvalidHeader(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to read response body: {0}")]
    UnreadableBody(TransportError),

    #[error("Failed to parse response body: {0}")]
    UnparseableBody(serde_json::Error),

    #[error("Unexpected status code {0}")]
    UnexpectedStatus(StatusCode),
}

impl From<ParseError> for ApiCallError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Unreadable(e) => ApiCallError::UnreadableBody(e),
            ParseError::Json(e) => ApiCallError::UnparseableBody(e),
        }
    }
}

/// Description of a single call. Built with [`ApiRequest::new`] and the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    base_url: Option<String>,
    path: String,
    additional_headers: Vec<(String, String)>,
    additional_options: Vec<RequestOption>,
    url_parameters: Option<String>,
    body: Option<ApiCallBody>,
    return_result_when_non_200: bool,
    expected_success_body: Option<ExpectedResponse>,
    expected_failure_body: Option<ExpectedResponse>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            base_url: None,
            path: path.into(),
            additional_headers: Vec::new(),
            additional_options: Vec::new(),
            url_parameters: None,
            body: None,
            return_result_when_non_200: true,
            expected_success_body: None,
            expected_failure_body: None,
        }
    }

    /// Host for this call only, given without scheme (`oauth2.example.com`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_option(mut self, option: RequestOption) -> Self {
        self.additional_options.push(option);
        self
    }

    /// Raw query string. It gets percent-escaped when the url is built.
    #[must_use]
    pub fn with_url_parameters(mut self, url_parameters: impl Into<String>) -> Self {
        self.url_parameters = Some(url_parameters.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: ApiCallBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn return_result_when_non_200(mut self, value: bool) -> Self {
        self.return_result_when_non_200 = value;
        self
    }

    #[must_use]
    pub fn expected_success_body(mut self, expected: ExpectedResponse) -> Self {
        self.expected_success_body = Some(expected);
        self
    }

    #[must_use]
    pub fn expected_failure_body(mut self, expected: ExpectedResponse) -> Self {
        self.expected_failure_body = Some(expected);
        self
    }
}

#[derive(Clone)]
pub struct AccountApiCall {
    /// Host used when a request doesn't carry its own.
    pub base_url: Option<String>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for AccountApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountApiCall")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Default for AccountApiCall {
    fn default() -> Self {
        AccountApiCall::new()
    }
}

impl AccountApiCall {
    pub fn new() -> AccountApiCall {
        AccountApiCall::with_transport(Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> AccountApiCall {
        AccountApiCall {
            base_url: None,
            transport,
        }
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Performs the call. Any failure, including an unparseable success body, comes back as
    /// [`ApiResponse::none`]; use [`AccountApiCall::try_api_call`] to learn what went wrong.
    pub async fn api_call(&self, request: ApiRequest) -> ApiResponse {
        match self.try_api_call(request).await {
            Ok(response) => response,
            Err(ApiCallError::UnexpectedStatus(status)) => {
                log::debug!("Call finished with status {}, result not requested", status);
                ApiResponse::none()
            }
            Err(e) => {
                log::error!("API call failed: {}", e);
                ApiResponse::none()
            }
        }
    }

    pub async fn try_api_call(&self, request: ApiRequest) -> Result<ApiResponse, ApiCallError> {
        let outbound = self.build_request(&request)?;
        let response = self.transport.send(outbound).await?;

        if response.status == StatusCode::OK {
            let result = parse_response(response.body, request.expected_success_body)?;

            return Ok(ApiResponse {
                result: Some(result),
                status: Some(response.status),
                headers: Some(response.headers),
            });
        }

        if !request.return_result_when_non_200 {
            return Err(ApiCallError::UnexpectedStatus(response.status));
        }

        match parse_response(response.body, request.expected_failure_body) {
            Ok(result) => Ok(ApiResponse {
                result: Some(result),
                status: Some(response.status),
                headers: Some(response.headers),
            }),
            Err(_) => Ok(ApiResponse {
                result: None,
                status: Some(response.status),
                headers: None,
            }),
        }
    }

    fn build_request(&self, request: &ApiRequest) -> Result<OutboundRequest, ApiCallError> {
        let host = request
            .base_url
            .as_deref()
            .or(self.base_url.as_deref())
            .ok_or(ApiCallError::MissingHost)?;

        let path = path_with_parameters(&request.path, request.url_parameters.as_deref());
        let mut url = Url::parse(&format!("https://{}{}", host, path))?;

        let mut timeout = None;
        for option in &request.additional_options {
            match option {
                RequestOption::Timeout(duration) => timeout = Some(*duration),
                RequestOption::Port(port) => url
                    .set_port(Some(*port))
                    .map_err(|_| ApiCallError::InvalidUrl(url::ParseError::InvalidPort))?,
            }
        }

        Ok(OutboundRequest {
            method: request.method.to_owned(),
            url,
            headers: build_headers(&request.additional_headers)?,
            body: request.body.to_owned(),
            timeout,
        })
    }
}

fn build_headers(additional_headers: &[(String, String)]) -> Result<HeaderMap, ApiCallError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    for (name, value) in additional_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ApiCallError::InvalidHeader(name.to_owned()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ApiCallError::InvalidHeader(name.to_owned()))?;

        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
