use super::check::CheckDescriptor;
use serde_json::{Map, Value};
use tracing::warn;

/// Categories whose failures make the service not ready
pub const CRITICAL_CATEGORIES: [&str; 2] = ["database_checks", "caching_checks"];

pub fn is_critical_category(name: &str) -> bool {
    CRITICAL_CATEGORIES.contains(&name)
}

/// An ordered list of checks under one category name
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub name: String,
    pub checks: Vec<CheckDescriptor>,
}

impl CategoryConfig {
    pub fn is_critical(&self) -> bool {
        is_critical_category(&self.name)
    }
}

/// The parsed health check document, categories in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthCheckConfig {
    pub categories: Vec<CategoryConfig>,
}

impl HealthCheckConfig {
    /// Build from the top-level JSON object. Values that are not lists are
    /// skipped.
    pub fn from_map(document: &Map<String, Value>) -> Self {
        let mut categories = Vec::with_capacity(document.len());

        for (name, checks) in document {
            let Some(entries) = checks.as_array() else {
                warn!("Category '{}' is not a list of checks; skipping it", name);
                continue;
            };

            categories.push(CategoryConfig {
                name: name.clone(),
                checks: entries.iter().map(CheckDescriptor::from_value).collect(),
            });
        }

        Self { categories }
    }

    pub fn total_checks(&self) -> usize {
        self.categories.iter().map(|c| c.checks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_checks() == 0
    }
}
