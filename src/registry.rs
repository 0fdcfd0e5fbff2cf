//! Named data-source lookup.

use crate::config::{Config, DataSourceConfig};
use crate::error::ConsoleError;
use std::sync::Arc;

/// Data sources a console may execute against.
#[derive(Debug, Clone, Default)]
pub struct DataSourceRegistry {
    sources: Arc<Vec<DataSourceConfig>>,
}

impl DataSourceRegistry {
    pub fn new(sources: Vec<DataSourceConfig>) -> Self {
        Self {
            sources: Arc::new(sources),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_sources.clone())
    }

    /// Look up a data source by name, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> Result<&DataSourceConfig, ConsoleError> {
        let name = name.trim();
        let source = self
            .sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConsoleError::DataSourceNotFound(name.to_string()))?;

        if !source.enabled {
            return Err(ConsoleError::DataSourceDisabled(source.name.clone()));
        }
        Ok(source)
    }

    /// Names of the enabled data sources, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
