use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Timeout applied to every probe that does not configure its own
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const UNNAMED_CHECK: &str = "<unnamed>";

/// The closed set of dependency probes a descriptor can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Postgres,
    Mysql,
    Redis,
    Elasticsearch,
    S3,
    HttpGet,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 6] = [
        ProbeKind::Postgres,
        ProbeKind::Mysql,
        ProbeKind::Redis,
        ProbeKind::Elasticsearch,
        ProbeKind::S3,
        ProbeKind::HttpGet,
    ];

    /// Resolve the `type` key of a descriptor
    pub fn parse(type_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == type_name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Postgres => "postgres",
            ProbeKind::Mysql => "mysql",
            ProbeKind::Redis => "redis",
            ProbeKind::Elasticsearch => "elasticsearch",
            ProbeKind::S3 => "s3",
            ProbeKind::HttpGet => "http_get",
        }
    }

    /// Human readable label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            ProbeKind::Postgres => "PostgreSQL",
            ProbeKind::Mysql => "MySQL",
            ProbeKind::Redis => "Redis",
            ProbeKind::Elasticsearch => "Elasticsearch",
            ProbeKind::S3 => "S3",
            ProbeKind::HttpGet => "HTTP GET",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for a PostgreSQL connectivity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresParams {
    pub host: String,
    #[serde(default = "default_postgres_port", deserialize_with = "port_number_or_string")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    pub dbname: String,
}

fn default_postgres_port() -> u16 {
    5432
}

/// Ports coming from env-provided documents are often quoted
fn port_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid port {:?}", text))),
    }
}

/// Connection parameters for a MySQL connectivity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MysqlParams {
    pub host: String,
    #[serde(default = "default_mysql_port", deserialize_with = "port_number_or_string")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
}

fn default_mysql_port() -> u16 {
    3306
}

/// Connection parameters for a Redis PING
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisParams {
    pub host: String,
    #[serde(default = "default_redis_port", deserialize_with = "port_number_or_string")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: Option<i64>,
}

fn default_redis_port() -> u16 {
    6379
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticsearchParams {
    pub url: String,
}

/// Bucket existence check against S3 or an S3 compatible store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Params {
    pub region: String,
    pub bucket_name: String,
    /// Custom endpoint (MinIO, LocalStack); switches to path-style addressing
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpGetParams {
    pub url: String,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl HttpGetParams {
    /// Configured timeout, falling back to the default for nonsensical values
    pub fn timeout(&self) -> Duration {
        match self.timeout {
            Some(secs) if secs > 0.0 => {
                Duration::try_from_secs_f64(secs).unwrap_or(DEFAULT_PROBE_TIMEOUT)
            }
            _ => DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// A probe together with its typed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Probe {
    Postgres(PostgresParams),
    Mysql(MysqlParams),
    Redis(RedisParams),
    Elasticsearch(ElasticsearchParams),
    S3(S3Params),
    HttpGet(HttpGetParams),
}

impl Probe {
    pub fn kind(&self) -> ProbeKind {
        match self {
            Probe::Postgres(_) => ProbeKind::Postgres,
            Probe::Mysql(_) => ProbeKind::Mysql,
            Probe::Redis(_) => ProbeKind::Redis,
            Probe::Elasticsearch(_) => ProbeKind::Elasticsearch,
            Probe::S3(_) => ProbeKind::S3,
            Probe::HttpGet(_) => ProbeKind::HttpGet,
        }
    }
}

/// A fully parsed, runnable check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSpec {
    pub name: String,
    pub probe: Probe,
}

impl CheckSpec {
    pub fn kind(&self) -> ProbeKind {
        self.probe.kind()
    }
}

/// One entry of a category list, classified before anything runs
#[derive(Debug, Clone, PartialEq)]
pub enum CheckDescriptor {
    /// Known type with valid parameters
    Probe(CheckSpec),
    /// Known type whose parameters could not be read; counts as a failed check
    Invalid {
        kind: ProbeKind,
        name: String,
        reason: String,
    },
    /// Missing or unsupported type; skipped
    Unknown {
        type_name: Option<String>,
        name: String,
    },
}

impl CheckDescriptor {
    pub fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED_CHECK)
            .to_string();

        let type_name = value.get("type").and_then(Value::as_str);
        let Some(kind) = type_name.and_then(ProbeKind::parse) else {
            return CheckDescriptor::Unknown {
                type_name: type_name.map(str::to_string),
                name,
            };
        };

        match serde_json::from_value::<Probe>(value.clone()) {
            Ok(probe) => CheckDescriptor::Probe(CheckSpec { name, probe }),
            Err(e) => CheckDescriptor::Invalid {
                kind,
                name,
                reason: e.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CheckDescriptor::Probe(spec) => &spec.name,
            CheckDescriptor::Invalid { name, .. } | CheckDescriptor::Unknown { name, .. } => name,
        }
    }

    /// The `type` key as written in the document, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            CheckDescriptor::Probe(spec) => Some(spec.kind().as_str()),
            CheckDescriptor::Invalid { kind, .. } => Some(kind.as_str()),
            CheckDescriptor::Unknown { type_name, .. } => type_name.as_deref(),
        }
    }
}
