//! REST API container client.
//!
//! The API endpoint is stateless, so `connect`/`disconnect` only log. The
//! health probe issues a GET against the configured health path, bounded by
//! the endpoint's connection timeout. One `reqwest::Client` (and its
//! connection pool) lives for the whole life of the `ApiClient`.

use async_trait::async_trait;
use berth_core::{Availability, ConnectionError, DisconnectionError, ServiceClient, ServiceEndpoint};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Path probed by `ApiClient::probe` unless overridden.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Errors from typed requests made through [`ApiClient::get_json`].
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Client for a REST API container.
#[derive(Debug)]
pub struct ApiClient {
    endpoint: ServiceEndpoint,
    health_path: String,
    http: reqwest::Client,
}

impl ApiClient {
    #[must_use]
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self::with_http_client(endpoint, reqwest::Client::new())
    }

    /// Uses `http` for every request. Clients built from one
    /// `reqwest::Client` share its connection pool.
    #[must_use]
    pub fn with_http_client(endpoint: ServiceEndpoint, http: reqwest::Client) -> Self {
        Self {
            endpoint,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            http,
        }
    }

    #[must_use]
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = normalize_path(&path.into());
        self
    }

    #[must_use]
    pub fn health_path(&self) -> &str {
        &self.health_path
    }

    /// `scheme://host:port`, defaulting the scheme to `http`.
    #[must_use]
    pub fn base_url(&self) -> String {
        let url = self.endpoint.url().trim_end_matches('/');
        if url.contains("://") {
            format!("{url}:{}", self.endpoint.port())
        } else {
            format!("http://{url}:{}", self.endpoint.port())
        }
    }

    /// Full URL for `path` on this endpoint.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), normalize_path(path))
    }

    /// GET `path` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent within the connection
    /// timeout, the response status is not a success, or the body does not
    /// decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let url = self.url_for(path);
        debug!(service = %self.endpoint.name(), url = %url, "making request");

        let response = self
            .request(&url)
            .send()
            .await
            .map_err(|source| RequestError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| RequestError::Decode { url, source })
    }

    /// GET request bounded by the current connection timeout.
    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.get(url).timeout(self.endpoint.connection_timeout())
    }
}

#[async_trait]
impl ServiceClient for ApiClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<(), ConnectionError> {
        info!(
            service = %self.endpoint.name(),
            address = %self.endpoint.address(),
            "connecting to API service"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DisconnectionError> {
        info!(service = %self.endpoint.name(), "disconnecting from API service");
        Ok(())
    }

    async fn probe(&self) -> Availability {
        let url = self.url_for(&self.health_path);
        debug!(service = %self.endpoint.name(), url = %url, "checking availability");

        match self.request(&url).send().await {
            Ok(response) if response.status().is_success() => Availability::Available,
            Ok(response) => {
                Availability::unavailable(format!("health endpoint returned {}", response.status()))
            }
            Err(e) => Availability::unavailable(e),
        }
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn client(port: u16) -> ApiClient {
        ApiClient::new(
            ServiceEndpoint::new("api", "127.0.0.1", port)
                .unwrap()
                .with_connection_timeout_ms(1_000),
        )
    }

    #[test]
    fn base_url_defaults_to_http() {
        let api = client(8080);
        assert_eq!(api.base_url(), "http://127.0.0.1:8080");
        assert_eq!(api.url_for("status"), "http://127.0.0.1:8080/status");
    }

    #[test]
    fn base_url_keeps_explicit_scheme() {
        let api = ApiClient::new(ServiceEndpoint::new("api", "https://example.com/", 443).unwrap())
            .with_health_path("ping");
        assert_eq!(api.base_url(), "https://example.com:443");
        assert_eq!(api.health_path(), "/ping");
    }

    #[tokio::test]
    async fn connect_and_disconnect_are_stateless() {
        let api = client(closed_port().await);
        api.connect().await.unwrap();
        api.disconnect().await.unwrap();
        api.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn probe_succeeds_against_live_health_endpoint() {
        let port = serve(Router::new().route("/health", get(|| async { StatusCode::OK }))).await;
        assert!(client(port).is_service_available().await);
    }

    #[tokio::test]
    async fn probe_reports_error_status_as_unavailable() {
        let port = serve(Router::new().route(
            "/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let availability = client(port).probe().await;
        assert!(!availability.is_available());
        assert!(availability.reason().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn probe_against_closed_port_is_false_not_error() {
        let port = closed_port().await;
        assert!(!client(port).is_service_available().await);
    }

    #[derive(Debug, Deserialize)]
    struct Version {
        version: String,
    }

    #[tokio::test]
    async fn get_json_decodes_body() {
        let port = serve(Router::new().route(
            "/version",
            get(|| async { Json(json!({ "version": "1.0.0" })) }),
        ))
        .await;

        let version: Version = client(port).get_json("/version").await.unwrap();
        assert_eq!(version.version, "1.0.0");
    }

    #[tokio::test]
    async fn get_json_reports_status_errors() {
        let port = serve(Router::new()).await;

        let err = client(port).get_json::<Version>("/missing").await.unwrap_err();
        assert!(matches!(err, RequestError::Status { status: 404, .. }));
    }
    #[tokio::test]
    async fn probe_honors_timeout_changed_after_construction() {
        let port = serve(Router::new().route(
            "/health",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                StatusCode::OK
            }),
        ))
        .await;

        let api = client(port);
        assert!(api.is_service_available().await);

        api.set_connection_timeout(50);
        let availability = api.probe().await;
        assert!(!availability.is_available());
    }

    #[tokio::test]
    async fn clients_can_share_one_http_pool() {
        let port = serve(Router::new().route("/health", get(|| async { StatusCode::OK }))).await;
        let http = reqwest::Client::new();
        let endpoint = |name: &str| {
            ServiceEndpoint::new(name, "127.0.0.1", port)
                .unwrap()
                .with_connection_timeout_ms(1_000)
        };

        let first = ApiClient::with_http_client(endpoint("first"), http.clone());
        let second = ApiClient::with_http_client(endpoint("second"), http);

        assert!(first.is_service_available().await);
        assert!(second.is_service_available().await);
        assert!(first.is_service_available().await);
    }
}
