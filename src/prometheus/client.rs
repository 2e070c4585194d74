use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::types::{AlertsData, ApiEnvelope, ConfigData};
use super::{AlertInstance, QueryData, RemoteError};

/// Basic-auth credentials for the monitoring server
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Connection settings, fixed at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub basic_auth: Option<BasicAuth>,
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            basic_auth: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::new("http://localhost:9090")
    }
}

/// Client for the monitoring server's reload and query endpoints
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http_client: reqwest::Client,
    settings: Arc<ClientSettings>,
}

impl PrometheusClient {
    pub fn new(settings: ClientSettings) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            settings: Arc::new(settings),
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// `POST /-/reload`
    pub async fn reload(&self) -> Result<(), RemoteError> {
        self.send(self.request(Method::POST, "/-/reload")).await?;
        tracing::info!(url = %self.settings.base_url, "Prometheus configuration reloaded");
        Ok(())
    }

    /// Configuration currently loaded by the server (`GET /api/v1/status/config`)
    pub async fn fetch_config(&self) -> Result<String, RemoteError> {
        let data: ConfigData = self
            .api(self.request(Method::GET, "/api/v1/status/config"))
            .await?;
        Ok(data.yaml)
    }

    /// Active alerts (`GET /api/v1/alerts`)
    pub async fn fetch_alerts(&self) -> Result<Vec<AlertInstance>, RemoteError> {
        let data: AlertsData = self.api(self.request(Method::GET, "/api/v1/alerts")).await?;
        Ok(data.alerts)
    }

    /// Instant query (`GET /api/v1/query`)
    pub async fn query(&self, expr: &str, time: Option<&str>) -> Result<QueryData, RemoteError> {
        let mut params = vec![("query", expr)];
        if let Some(time) = time {
            params.push(("time", time));
        }
        self.api(self.request(Method::GET, "/api/v1/query").query(&params))
            .await
    }

    /// Range query (`GET /api/v1/query_range`)
    pub async fn query_range(
        &self,
        expr: &str,
        start: &str,
        end: &str,
        step: &str,
    ) -> Result<QueryData, RemoteError> {
        let params = [("query", expr), ("start", start), ("end", end), ("step", step)];
        self.api(self.request(Method::GET, "/api/v1/query_range").query(&params))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.settings.base_url.trim_end_matches('/'), path);
        let request = self.http_client.request(method, url);

        match &self.settings.basic_auth {
            Some(auth) => request.basic_auth(&auth.username, auth.password.as_ref()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Prometheus request failed");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn api<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        let envelope: ApiEnvelope<T> = response.json().await.map_err(classify)?;
        envelope.into_data()
    }
}

fn classify(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else {
        RemoteError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_fake(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fake_prometheus() -> Router {
        Router::new()
            .route(
                "/-/reload",
                post(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("Basic YWRtaW46c2VjcmV0") => (StatusCode::OK, ""),
                        _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
                    }
                }),
            )
            .route(
                "/api/v1/status/config",
                get(|| async {
                    Json(serde_json::json!({
                        "status": "success",
                        "data": {"yaml": "global:\n  scrape_interval: 15s\n"}
                    }))
                }),
            )
            .route(
                "/api/v1/alerts",
                get(|| async {
                    Json(serde_json::json!({
                        "status": "success",
                        "data": {"alerts": [
                            {"labels": {"alertname": "Down"}, "annotations": {}, "state": "pending"}
                        ]}
                    }))
                }),
            )
            .route(
                "/api/v1/query",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(serde_json::json!({
                        "status": "success",
                        "data": {"resultType": "vector", "result": [params]}
                    }))
                }),
            )
            .route(
                "/api/v1/query_range",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({
                            "status": "error",
                            "errorType": "bad_data",
                            "error": "end timestamp must not be before start time"
                        })),
                    )
                }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
    }

    #[tokio::test]
    async fn test_reload_with_credentials() {
        let base = spawn_fake(fake_prometheus()).await;

        let client = PrometheusClient::new(
            ClientSettings::new(&base).with_basic_auth("admin", Some("secret".to_string())),
        )
        .unwrap();
        client.reload().await.unwrap();

        let anonymous = PrometheusClient::new(ClientSettings::new(&base)).unwrap();
        let err = anonymous.reload().await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Status {
                status: 401,
                body: "unauthorized".to_string()
            }
        );
        assert_eq!(err.status_code(), Some(401));
    }

    #[tokio::test]
    async fn test_fetch_config_and_alerts() {
        let base = spawn_fake(fake_prometheus()).await;
        let client = PrometheusClient::new(ClientSettings::new(format!("{}/", base))).unwrap();

        let yaml = client.fetch_config().await.unwrap();
        assert!(yaml.starts_with("global:"));

        let alerts = client.fetch_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_name(), Some("Down"));
        assert!(!alerts[0].is_firing());
    }

    #[tokio::test]
    async fn test_query_parameters_are_encoded() {
        let base = spawn_fake(fake_prometheus()).await;
        let client = PrometheusClient::new(ClientSettings::new(&base)).unwrap();

        let expr = r#"sum(rate(http_requests_total{code=~"5..", path="/a&b"}[5m])) > 0"#;
        let data = client.query(expr, Some("1700000000")).await.unwrap();
        assert_eq!(data.result_type, "vector");
        assert_eq!(data.result[0]["query"], expr);
        assert_eq!(data.result[0]["time"], "1700000000");
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let base = spawn_fake(fake_prometheus()).await;
        let client = PrometheusClient::new(ClientSettings::new(&base)).unwrap();

        let err = client
            .query_range("up", "2", "1", "15s")
            .await
            .unwrap_err();
        match err {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("bad_data"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_bounded() {
        let base = spawn_fake(fake_prometheus()).await;
        let client = PrometheusClient::new(
            ClientSettings::new(&base).with_timeout(Duration::from_millis(200)),
        )
        .unwrap();

        let err = client
            .send(client.request(Method::GET, "/slow"))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Timeout);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PrometheusClient::new(ClientSettings::new(format!("http://{}", addr))).unwrap();
        assert!(matches!(client.reload().await, Err(RemoteError::Network(_))));
    }

    #[test]
    fn test_password_is_redacted() {
        let settings = ClientSettings::default().with_basic_auth("admin", Some("secret".to_string()));
        let debug = format!("{:?}", settings);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("secret"));
    }
}
