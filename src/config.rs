use crate::models::HealthCheckConfig;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable holding the JSON health check document
pub const HEALTH_CHECK_CONFIG_ENV: &str = "HEALTH_CHECK_CONFIG";

/// Environment variable pointing at a JSON or YAML file with the same document
pub const HEALTH_CHECK_CONFIG_PATH_ENV: &str = "HEALTH_CHECK_CONFIG_PATH";

/// Reasons the health check document could not be obtained
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Missing,
    Io(String),
    Parse(String),
    NotAnObject,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing => write!(
                f,
                "neither {} nor {} is set",
                HEALTH_CHECK_CONFIG_ENV, HEALTH_CHECK_CONFIG_PATH_ENV
            ),
            ConfigError::Io(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse health check config: {}", msg),
            ConfigError::NotAnObject => {
                write!(f, "Health check config must be an object of categories")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a JSON health check document
pub fn parse_json(contents: &str) -> Result<HealthCheckConfig, ConfigError> {
    let document: Value =
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    from_document(document)
}

/// Parse a YAML health check document
pub fn parse_yaml(contents: &str) -> Result<HealthCheckConfig, ConfigError> {
    let document: Value =
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    from_document(document)
}

fn from_document(document: Value) -> Result<HealthCheckConfig, ConfigError> {
    match document {
        Value::Object(map) => Ok(HealthCheckConfig::from_map(&map)),
        _ => Err(ConfigError::NotAnObject),
    }
}

/// Load the document from a file; `.yaml`/`.yml` files are read as YAML
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HealthCheckConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading health check configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("'{}': {}", path.display(), e)))?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        parse_yaml(&contents)
    } else {
        parse_json(&contents)
    }
}

/// Resolve the document from the environment. The inline JSON variable wins
/// over the file path.
pub fn load_config_with<F>(lookup: F) -> Result<HealthCheckConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = if let Some(json) = lookup(HEALTH_CHECK_CONFIG_ENV) {
        parse_json(&json)
    } else if let Some(path) = lookup(HEALTH_CHECK_CONFIG_PATH_ENV) {
        load_config(path)
    } else {
        warn!(
            "{} environment variable not found. Skipping startup checks.",
            HEALTH_CHECK_CONFIG_ENV
        );
        return Err(ConfigError::Missing);
    }?;

    info!(
        "Health check configuration loaded with {} categor(ies), {} check(s)",
        config.categories.len(),
        config.total_checks()
    );
    for category in &config.categories {
        info!(
            "  Category '{}' ({}): {} check(s)",
            category.name,
            if category.is_critical() {
                "critical"
            } else {
                "non-critical"
            },
            category.checks.len()
        );
    }

    Ok(config)
}

/// Load the document from the process environment
pub fn load_config_from_env() -> Result<HealthCheckConfig, ConfigError> {
    load_config_with(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckDescriptor;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_from_inline_json() {
        let vars = env(&[(
            HEALTH_CHECK_CONFIG_ENV,
            r#"{"caching_checks":[{"type":"redis","name":"cache","host":"localhost"}]}"#,
        )]);

        let config = load_config_with(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.categories.len(), 1);
        assert!(config.categories[0].is_critical());
        assert!(matches!(
            config.categories[0].checks[0],
            CheckDescriptor::Probe(_)
        ));
    }

    #[test]
    fn test_missing_config() {
        let result = load_config_with(|_| None);
        assert_eq!(result, Err(ConfigError::Missing));
    }

    #[test]
    fn test_malformed_json() {
        let vars = env(&[(HEALTH_CHECK_CONFIG_ENV, "{\"database_checks\": [")]);
        let result = load_config_with(|k| vars.get(k).cloned());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert_eq!(parse_json("[1, 2, 3]"), Err(ConfigError::NotAnObject));
        assert_eq!(parse_json("null"), Err(ConfigError::NotAnObject));
    }

    #[test]
    fn test_empty_object_is_valid() {
        let config = parse_json("{}").unwrap();
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_load_yaml_file_from_path() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "other_checks:\n  - type: http_get\n    name: upstream\n    url: http://localhost:9/\n    timeout: 1\n"
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let vars = env(&[(HEALTH_CHECK_CONFIG_PATH_ENV, path.as_str())]);

        let config = load_config_with(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.categories[0].name, "other_checks");
        assert_eq!(config.categories[0].checks[0].name(), "upstream");
    }

    #[test]
    fn test_inline_json_wins_over_path() {
        let vars = env(&[
            (HEALTH_CHECK_CONFIG_ENV, "{}"),
            (HEALTH_CHECK_CONFIG_PATH_ENV, "/does/not/exist.json"),
        ]);

        let config = load_config_with(|k| vars.get(k).cloned()).unwrap();
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_unreadable_path() {
        let result = load_config("/does/not/exist.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
