// HTTP seam between the client and the network
use crate::client::{ApiError, ClientError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError>;

    /// POST an XML document.
    async fn post(&self, url: &Url, body: String) -> Result<HttpResponse, ApiError>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;
        Ok(Self { http })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, ApiError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;
        Ok(HttpResponse { status, body })
    }
}

// The query string carries the developer key, so it is kept out of messages.
fn network_error(error: reqwest::Error) -> ApiError {
    ApiError::Network(error.without_url().to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;
        Self::read(response).await
    }

    async fn post(&self, url: &Url, body: String) -> Result<HttpResponse, ApiError> {
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await
            .map_err(network_error)?;
        Self::read(response).await
    }
}


#[cfg(test)]
mod tests {
    use super::mock_transport::MockTransport;
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("http://api.test/v1{}", path)).unwrap()
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(Duration::from_millis(500)).is_ok());
    }

    #[tokio::test]
    async fn test_mock_transport_serves_queue_then_repeats_last() {
        let transport = MockTransport::new()
            .with_response("/job", 500, "")
            .with_response("/job", 200, "<Job/>");

        assert_eq!(transport.get(&url("/job")).await.unwrap().status, 500);
        assert_eq!(transport.get(&url("/job")).await.unwrap().status, 200);
        assert_eq!(transport.get(&url("/job")).await.unwrap().status, 200);
        assert_eq!(transport.get(&url("/other")).await.unwrap().status, 404);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::new().with_response("/application/submit", 200, "");
        transport
            .post(&url("/application/submit"), "<RequestApplication/>".to_string())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].body.as_deref(), Some("<RequestApplication/>"));
    }
}
