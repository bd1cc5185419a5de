pub mod categories;
pub mod check;

pub use categories::{CRITICAL_CATEGORIES, CategoryConfig, HealthCheckConfig, is_critical_category};
pub use check::{
    CheckDescriptor, CheckSpec, ElasticsearchParams, HttpGetParams, MysqlParams, PostgresParams,
    Probe, ProbeKind, RedisParams, S3Params,
};
