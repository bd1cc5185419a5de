use super::sigv4::{self, Credentials};
use crate::models::{
    CheckSpec, ElasticsearchParams, HttpGetParams, MysqlParams, PostgresParams, Probe, ProbeKind,
    RedisParams, S3Params, check::DEFAULT_PROBE_TIMEOUT,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Not run, e.g. an unsupported check type
    Skipped,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub details: Option<serde_json::Value>,
}

impl HealthCheckResult {
    pub fn healthy(name: String, duration_ms: u64) -> Self {
        Self {
            name,
            status: HealthStatus::Healthy,
            message: None,
            checked_at: Utc::now(),
            duration_ms,
            details: None,
        }
    }

    pub fn unhealthy(name: String, message: String, duration_ms: u64) -> Self {
        Self {
            name,
            status: HealthStatus::Unhealthy,
            message: Some(message),
            checked_at: Utc::now(),
            duration_ms,
            details: None,
        }
    }

    pub fn skipped(name: String, message: String) -> Self {
        Self {
            name,
            status: HealthStatus::Skipped,
            message: Some(message),
            checked_at: Utc::now(),
            duration_ms: 0,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Why a single probe failed
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeError {
    Timeout(Duration),
    Connection(String),
    UnexpectedStatus(u16),
    InvalidConfig(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Timeout(limit) => write!(f, "Timed out after {:?}", limit),
            ProbeError::Connection(msg) => write!(f, "Connection failed: {}", msg),
            ProbeError::UnexpectedStatus(code) => write!(f, "Status code {}", code),
            ProbeError::InvalidConfig(msg) => write!(f, "Invalid check configuration: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// A dependency probe that runs once
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Name of the health check
    fn name(&self) -> &str;

    fn kind(&self) -> ProbeKind;

    /// Perform the health check. Never panics or returns an error; failures
    /// are reported through the result.
    async fn check(&self) -> HealthCheckResult;

    /// Upper bound for the whole probe
    fn timeout(&self) -> Duration {
        DEFAULT_PROBE_TIMEOUT
    }
}

/// Build the probe for a parsed check
pub fn build_health_check(spec: &CheckSpec) -> Box<dyn HealthCheck> {
    let name = spec.name.clone();
    match &spec.probe {
        Probe::Postgres(params) => Box::new(PostgresHealthCheck::new(name, params.clone())),
        Probe::Mysql(params) => Box::new(MysqlHealthCheck::new(name, params.clone())),
        Probe::Redis(params) => Box::new(RedisHealthCheck::new(name, params.clone())),
        Probe::Elasticsearch(params) => {
            Box::new(ElasticsearchHealthCheck::new(name, params.clone()))
        }
        Probe::S3(params) => Box::new(S3HealthCheck::new(name, params.clone())),
        Probe::HttpGet(params) => Box::new(HttpGetHealthCheck::new(name, params.clone())),
    }
}

/// Run a probe future under `limit`, logging and folding the outcome into a
/// result
async fn run_probe<F>(name: &str, kind: ProbeKind, limit: Duration, probe: F) -> HealthCheckResult
where
    F: Future<Output = Result<(), ProbeError>> + Send,
{
    info!("Checking {}: {}...", kind.label(), name);
    let start = Instant::now();

    let outcome = match timeout(limit, probe).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ProbeError::Timeout(limit)),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => {
            info!("  -> {} check SUCCESS.", kind.label());
            HealthCheckResult::healthy(name.to_string(), duration_ms)
        }
        Err(e) => {
            error!("  -> {} check FAILURE: {}", kind.label(), e);
            HealthCheckResult::unhealthy(name.to_string(), e.to_string(), duration_ms)
        }
    }
}

fn http_client(limit: Duration) -> Result<reqwest::Client, ProbeError> {
    reqwest::Client::builder()
        .timeout(limit)
        .build()
        .map_err(|e| ProbeError::InvalidConfig(format!("HTTP client: {}", e)))
}

fn connection_error<E: std::fmt::Display>(e: E) -> ProbeError {
    ProbeError::Connection(e.to_string())
}

/// Opens and closes a PostgreSQL connection
pub struct PostgresHealthCheck {
    name: String,
    params: PostgresParams,
}

impl PostgresHealthCheck {
    pub fn new(name: String, params: PostgresParams) -> Self {
        Self { name, params }
    }

    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.params.host)
            .port(self.params.port)
            .username(&self.params.user)
            .database(&self.params.dbname);

        match &self.params.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[async_trait]
impl HealthCheck for PostgresHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Postgres
    }

    async fn check(&self) -> HealthCheckResult {
        let options = self.connect_options();
        run_probe(&self.name, self.kind(), self.timeout(), async move {
            let conn = options.connect().await.map_err(connection_error)?;
            conn.close().await.map_err(connection_error)
        })
        .await
    }
}

/// Opens and closes a MySQL connection
pub struct MysqlHealthCheck {
    name: String,
    params: MysqlParams,
}

impl MysqlHealthCheck {
    pub fn new(name: String, params: MysqlParams) -> Self {
        Self { name, params }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.params.host)
            .port(self.params.port)
            .username(&self.params.user)
            .database(&self.params.database);

        match &self.params.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[async_trait]
impl HealthCheck for MysqlHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Mysql
    }

    async fn check(&self) -> HealthCheckResult {
        let options = self.connect_options();
        run_probe(&self.name, self.kind(), self.timeout(), async move {
            let conn = options.connect().await.map_err(connection_error)?;
            conn.close().await.map_err(connection_error)
        })
        .await
    }
}

/// Sends PING to a Redis server
pub struct RedisHealthCheck {
    name: String,
    params: RedisParams,
}

impl RedisHealthCheck {
    pub fn new(name: String, params: RedisParams) -> Self {
        Self { name, params }
    }

    fn connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.params.host.clone(), self.params.port),
            redis: redis::RedisConnectionInfo {
                db: self.params.db.unwrap_or(0),
                password: self.params.password.clone(),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl HealthCheck for RedisHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Redis
    }

    async fn check(&self) -> HealthCheckResult {
        let info = self.connection_info();
        run_probe(&self.name, self.kind(), self.timeout(), async move {
            let client = redis::Client::open(info).map_err(connection_error)?;
            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(connection_error)?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| ProbeError::Connection(format!("Ping failed: {}", e)))?;
            Ok(())
        })
        .await
    }
}

/// Pings an Elasticsearch cluster with `HEAD /`
pub struct ElasticsearchHealthCheck {
    name: String,
    params: ElasticsearchParams,
}

impl ElasticsearchHealthCheck {
    pub fn new(name: String, params: ElasticsearchParams) -> Self {
        Self { name, params }
    }
}

#[async_trait]
impl HealthCheck for ElasticsearchHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Elasticsearch
    }

    async fn check(&self) -> HealthCheckResult {
        let limit = self.timeout();
        let url = self.params.url.clone();
        run_probe(&self.name, self.kind(), limit, async move {
            let client = http_client(limit)?;
            let response = client.head(&url).send().await.map_err(connection_error)?;
            // A ping is truthy only for 2xx
            if response.status().is_success() {
                Ok(())
            } else {
                Err(ProbeError::UnexpectedStatus(response.status().as_u16()))
            }
        })
        .await
        .with_details(json!({ "url": self.params.url }))
    }
}

/// Checks a bucket exists and is reachable with `HEAD` on the bucket
pub struct S3HealthCheck {
    name: String,
    params: S3Params,
    credentials: Option<Credentials>,
}

impl S3HealthCheck {
    pub fn new(name: String, params: S3Params) -> Self {
        let credentials = Credentials::resolve(
            params.access_key_id.as_deref(),
            params.secret_access_key.as_deref(),
            params.session_token.as_deref(),
            |key| std::env::var(key).ok(),
        );
        Self {
            name,
            params,
            credentials,
        }
    }

    /// Path-style against a custom endpoint, virtual-hosted against AWS
    pub fn bucket_url(&self) -> Result<Url, ProbeError> {
        let raw = match &self.params.endpoint {
            Some(endpoint) => format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                self.params.bucket_name
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/",
                self.params.bucket_name, self.params.region
            ),
        };
        Url::parse(&raw).map_err(|e| ProbeError::InvalidConfig(format!("{}: {}", raw, e)))
    }
}

#[async_trait]
impl HealthCheck for S3HealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::S3
    }

    async fn check(&self) -> HealthCheckResult {
        let limit = self.timeout();
        let url = self.bucket_url();
        let details = json!({
            "bucket": self.params.bucket_name,
            "url": url.as_ref().map(Url::as_str).ok(),
            "signed": self.credentials.is_some(),
        });
        let region = self.params.region.clone();
        let credentials = self.credentials.clone();

        run_probe(&self.name, self.kind(), limit, async move {
            let url = url?;
            let client = http_client(limit)?;
            let mut request = client.head(url.clone());
            if let Some(credentials) = &credentials {
                for (header, value) in
                    sigv4::sign_empty_request("HEAD", &url, &region, "s3", credentials, Utc::now())
                {
                    request = request.header(header, value);
                }
            }

            let response = request.send().await.map_err(connection_error)?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(ProbeError::UnexpectedStatus(response.status().as_u16()))
            }
        })
        .await
        .with_details(details)
    }
}

/// Plain GET that must answer 200
pub struct HttpGetHealthCheck {
    name: String,
    params: HttpGetParams,
}

impl HttpGetHealthCheck {
    pub fn new(name: String, params: HttpGetParams) -> Self {
        Self { name, params }
    }
}

#[async_trait]
impl HealthCheck for HttpGetHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::HttpGet
    }

    async fn check(&self) -> HealthCheckResult {
        let limit = self.timeout();
        let url = self.params.url.clone();
        run_probe(&self.name, self.kind(), limit, async move {
            let client = http_client(limit)?;
            let response = client.get(&url).send().await.map_err(connection_error)?;
            match response.status() {
                StatusCode::OK => Ok(()),
                other => Err(ProbeError::UnexpectedStatus(other.as_u16())),
            }
        })
        .await
        .with_details(json!({ "url": self.params.url }))
    }

    fn timeout(&self) -> Duration {
        self.params.timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Nothing listens on port 1; connections are refused immediately
    const UNREACHABLE_HOST: &str = "127.0.0.1";
    const UNREACHABLE_PORT: u16 = 1;

    fn http_get(url: String) -> HttpGetHealthCheck {
        HttpGetHealthCheck::new(
            "upstream".to_string(),
            HttpGetParams {
                url,
                timeout: Some(2.0),
            },
        )
    }

    fn s3_params(endpoint: String, bucket: &str) -> S3Params {
        S3Params {
            region: "us-east-1".to_string(),
            bucket_name: bucket.to_string(),
            endpoint: Some(endpoint),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            session_token: None,
        }
    }

    #[test]
    fn test_health_check_result() {
        let result = HealthCheckResult::healthy("test".to_string(), 100);
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.duration_ms, 100);
        assert!(result.is_healthy());

        let result = HealthCheckResult::unhealthy("test".to_string(), "error".to_string(), 300);
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.message.as_deref(), Some("error"));

        let result = HealthCheckResult::skipped("test".to_string(), "unknown".to_string());
        assert_eq!(result.status, HealthStatus::Skipped);
        assert!(!result.is_healthy());
    }

    #[tokio::test]
    async fn test_http_get_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = http_get(format!("{}/health", server.uri())).check().await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.name, "upstream");
    }

    #[tokio::test]
    async fn test_http_get_requires_exactly_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/created"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = http_get(format!("{}/created", server.uri())).check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.message.as_deref(), Some("Status code 204"));
    }

    #[tokio::test]
    async fn test_http_get_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let check = HttpGetHealthCheck::new(
            "slow".to_string(),
            HttpGetParams {
                url: server.uri(),
                timeout: Some(0.2),
            },
        );
        assert_eq!(check.timeout(), Duration::from_millis(200));

        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.duration_ms < 3000);
    }

    #[tokio::test]
    async fn test_http_get_connection_refused() {
        let result = http_get(format!("http://{}:{}/", UNREACHABLE_HOST, UNREACHABLE_PORT))
            .check()
            .await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_elasticsearch_ping() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let check = ElasticsearchHealthCheck::new(
            "search".to_string(),
            ElasticsearchParams { url: server.uri() },
        );
        assert_eq!(check.check().await.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_elasticsearch_ping_false() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let check = ElasticsearchHealthCheck::new(
            "search".to_string(),
            ElasticsearchParams { url: server.uri() },
        );
        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.message.as_deref(), Some("Status code 503"));
    }

    #[tokio::test]
    async fn test_s3_bucket_head_is_signed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/assets"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let check = S3HealthCheck::new("bucket".to_string(), s3_params(server.uri(), "assets"));
        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Healthy);
        let details = result.details.unwrap();
        assert_eq!(details["bucket"], "assets");
        assert_eq!(details["signed"], true);
    }

    #[tokio::test]
    async fn test_s3_missing_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let check = S3HealthCheck::new("bucket".to_string(), s3_params(server.uri(), "missing"));
        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.message.as_deref(), Some("Status code 404"));
    }

    #[test]
    fn test_s3_bucket_url() {
        let mut params = s3_params("http://minio:9000/".to_string(), "assets");
        let check = S3HealthCheck::new("bucket".to_string(), params.clone());
        assert_eq!(
            check.bucket_url().unwrap().as_str(),
            "http://minio:9000/assets"
        );

        params.endpoint = None;
        params.region = "eu-west-1".to_string();
        let check = S3HealthCheck::new("bucket".to_string(), params);
        assert_eq!(
            check.bucket_url().unwrap().as_str(),
            "https://assets.s3.eu-west-1.amazonaws.com/"
        );
    }

    #[tokio::test]
    async fn test_postgres_unreachable() {
        let check = PostgresHealthCheck::new(
            "db1".to_string(),
            PostgresParams {
                host: UNREACHABLE_HOST.to_string(),
                port: UNREACHABLE_PORT,
                user: "app".to_string(),
                password: Some("secret".to_string()),
                dbname: "app".to_string(),
            },
        );

        let result = check.check().await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.name, "db1");
    }

    #[tokio::test]
    async fn test_mysql_unreachable() {
        let check = MysqlHealthCheck::new(
            "db2".to_string(),
            MysqlParams {
                host: UNREACHABLE_HOST.to_string(),
                port: UNREACHABLE_PORT,
                user: "app".to_string(),
                password: None,
                database: "app".to_string(),
            },
        );

        assert_eq!(check.check().await.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_redis_unreachable() {
        let check = RedisHealthCheck::new(
            "cache".to_string(),
            RedisParams {
                host: UNREACHABLE_HOST.to_string(),
                port: UNREACHABLE_PORT,
                password: None,
                db: None,
            },
        );

        assert_eq!(check.check().await.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_build_health_check_dispatch() {
        for (probe, kind) in [
            (
                Probe::Redis(RedisParams {
                    host: "localhost".to_string(),
                    port: 6379,
                    password: None,
                    db: Some(2),
                }),
                ProbeKind::Redis,
            ),
            (
                Probe::HttpGet(HttpGetParams {
                    url: "http://localhost".to_string(),
                    timeout: Some(1.0),
                }),
                ProbeKind::HttpGet,
            ),
            (
                Probe::Elasticsearch(ElasticsearchParams {
                    url: "http://localhost:9200".to_string(),
                }),
                ProbeKind::Elasticsearch,
            ),
        ] {
            let spec = CheckSpec {
                name: "x".to_string(),
                probe,
            };
            let check = build_health_check(&spec);
            assert_eq!(check.kind(), kind);
            assert_eq!(check.name(), "x");
        }
    }
}
