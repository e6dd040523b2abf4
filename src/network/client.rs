use tokio_util::sync::CancellationToken;

use crate::network::{
    endpoint::EndpointDescription,
    transport::{Transport, TransportError, TransportRequest, TransportResponse},
    types::{RequestError, ResponseModel},
};

/// Issues calls described by an [`EndpointDescription`] and maps every outcome to a value.
pub trait HttpClient {
    async fn send_request<T: ResponseModel>(
        &self,
        endpoint: &EndpointDescription,
        decode: bool,
        cancellation_token: CancellationToken,
    ) -> Result<Option<T>, RequestError>;
}

pub struct RequestExecutor<TTransport: Transport> {
    transport: TTransport,
    include_port: bool,
}

impl<TTransport: Transport> RequestExecutor<TTransport> {
    pub fn new(transport: TTransport, include_port: bool) -> Self {
        Self {
            transport,
            include_port,
        }
    }

    pub fn transport(&self) -> &TTransport {
        &self.transport
    }

    fn build_request(
        &self,
        endpoint: &EndpointDescription,
    ) -> Result<TransportRequest, RequestError> {
        let url = endpoint.url(self.include_port)?;
        Ok(TransportRequest {
            method: endpoint.method,
            url,
            headers: endpoint.header.clone(),
            body: endpoint.body_bytes(),
        })
    }
}

impl<TTransport: Transport> HttpClient for RequestExecutor<TTransport> {
    async fn send_request<T: ResponseModel>(
        &self,
        endpoint: &EndpointDescription,
        decode: bool,
        cancellation_token: CancellationToken,
    ) -> Result<Option<T>, RequestError> {
        let request = self.build_request(endpoint).inspect_err(|_| {
            log::error!(
                "Could not assemble URL for {} {}://{}{}",
                endpoint.method,
                endpoint.scheme,
                endpoint.host,
                endpoint.path
            )
        })?;
        log::debug!("{} {}", request.method, request.url);

        match self.transport.execute(request, cancellation_token).await {
            Ok(response) => map_response(response, decode),
            Err(TransportError::NoResponse(reason)) => {
                log::warn!("No HTTP response: {}", reason);
                Err(RequestError::NoResponse)
            }
            Err(e) => {
                log::warn!("Request to {} failed: {}", endpoint.path, e);
                Err(RequestError::Unknown)
            }
        }
    }
}

/// Map a status code (and, for 2xx, the body) to the typed outcome.
fn map_response<T: ResponseModel>(
    response: TransportResponse,
    decode: bool,
) -> Result<Option<T>, RequestError> {
    match response.status {
        200..=299 if decode => serde_json::from_slice::<T>(&response.body)
            .map(Some)
            .map_err(|e| {
                log::warn!("Failed to decode response body: {}", e);
                RequestError::Decode
            }),
        200..=299 => Ok(T::from_status_code(response.status)),
        401 => Err(RequestError::Unauthorized),
        404 => Err(RequestError::UserError),
        500..=599 => Err(RequestError::Server),
        other => {
            log::warn!("Unexpected response status {}", other);
            Err(RequestError::UnexpectedStatusCode)
        }
    }
}
