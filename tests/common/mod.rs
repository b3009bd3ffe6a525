use async_trait::async_trait;
use server_account::api_call::{
    AccountApiCall, OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError,
};
use std::net::TcpListener;
use std::sync::Arc;
use url::Url;
use wiremock::MockServer;

/// Sends every request to the mock server, whatever host the engine resolved.
pub struct LocalTransport {
    target: Url,
    inner: ReqwestTransport,
}

impl LocalTransport {
    pub fn new(server: &MockServer) -> LocalTransport {
        LocalTransport::to(Url::parse(&server.uri()).unwrap())
    }

    pub fn to(target: Url) -> LocalTransport {
        LocalTransport {
            target,
            inner: ReqwestTransport::new(),
        }
    }
}

/// A local url nothing listens on.
pub fn closed_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap()
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, mut request: OutboundRequest) -> Result<RawResponse, TransportError> {
        request.url.set_scheme(self.target.scheme()).unwrap();
        request.url.set_host(self.target.host_str()).unwrap();
        request.url.set_port(self.target.port()).unwrap();

        self.inner.send(request).await
    }
}

pub fn local_api_call(server: &MockServer) -> AccountApiCall {
    AccountApiCall::with_transport(Arc::new(LocalTransport::new(server))).base_url("provider.test")
}
