use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::ApiCallBody;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transport failed: {0}")]
    Other(String),
}

/// A fully resolved request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<ApiCallBody>,
    pub timeout: Option<Duration>,
}

/// What came back from the provider. The body is read eagerly, reading it may fail on its own.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Result<Bytes, TransportError>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request exactly once. `Err` means no response object was produced at all.
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> ReqwestTransport {
        ReqwestTransport {
            client: Client::new(),
        }
    }

    pub fn from(client: Client) -> ReqwestTransport {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        log::debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            Some(ApiCallBody::String(body)) => builder.body(body),
            Some(ApiCallBody::Data(body)) => builder.body(body),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().to_owned();
        let body = response.bytes().await.map_err(TransportError::from);

        log::debug!("Response status: {}", status);

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
