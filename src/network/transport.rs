use std::collections::BTreeMap;

use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::{config::ServerConfig, network::endpoint::RequestMethod};

/// A fully assembled request, ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: RequestMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Status and raw body of a response. Status interpretation is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    /// The peer answered with something that is not an HTTP response.
    #[error("no HTTP response: {0}")]
    NoResponse(String),
    #[error("operation was cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connection(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

pub trait Transport {
    async fn execute(
        &self,
        request: TransportRequest,
        cancellation_token: CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ServerConfig) -> Result<Self, TransportError> {
        log::debug!(
            "Creating HTTP transport with request timeout {:?} and resource timeout {:?}",
            config.request_timeout,
            config.resource_timeout
        );
        let client = reqwest::Client::builder()
            .read_timeout(config.request_timeout)
            .timeout(config.resource_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn round_trip(
        &self,
        request: reqwest::Request,
    ) -> Result<TransportResponse, TransportError> {
        let response = self.client.execute(request).await?;
        log::trace!("Received response: {:?}", response);
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: TransportRequest,
        cancellation_token: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let request = builder.build()?;

        log::trace!("Sending request: {:?}", request);

        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::info!("Cancellation requested, aborting request.");
                Err(TransportError::Cancelled)
            }
            result = self.round_trip(request) => result,
        }
    }
}
