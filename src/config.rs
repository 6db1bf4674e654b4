use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix applied to every persisted store key
pub const DEFAULT_KEY_PREFIX: &str = "store_";

/// Route prefix used when a repository store navigates
pub const DEFAULT_ROUTE_PREFIX: &str = "/repos/";

/// Which persistence medium backs the stores
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map, lost on exit
    #[default]
    Memory,

    /// Single JSON file on disk
    File(PathBuf),
}

/// Store layer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub backend: StorageBackend,

    pub key_prefix: String,

    /// Upper bound on stored bytes (keys + values); `None` is unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<usize>,

    pub route_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            quota_bytes: None,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Load a configuration from JSON text
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(raw)?;
        StoreConfigBuilder::from(config).build()
    }

    /// Persisted key for a logical store key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Route for a repository name
    pub fn repository_route(&self, name: &str) -> String {
        format!("{}{}", self.route_prefix, name)
    }
}

/// Builder for constructing StoreConfig instances with a fluent API
///
/// # Example
/// ```
/// use branchstore::config::{StorageBackend, StoreConfigBuilder};
///
/// let config = StoreConfigBuilder::new()
///     .backend(StorageBackend::Memory)
///     .quota_bytes(5 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.storage_key("notifications"), "store_notifications");
/// ```
#[derive(Debug)]
pub struct StoreConfigBuilder {
    backend: StorageBackend,
    key_prefix: String,
    quota_bytes: Option<usize>,
    route_prefix: String,
}

impl StoreConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            backend: StorageBackend::Memory,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            quota_bytes: None,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }

    /// Set the storage backend
    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Use a JSON file at `path` as the storage backend
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.backend = StorageBackend::File(path.into());
        self
    }

    /// Set the prefix for persisted keys
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Limit the total size of stored data
    pub fn quota_bytes(mut self, quota: usize) -> Self {
        self.quota_bytes = Some(quota);
        self
    }

    /// Set the route prefix used for repository navigation
    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }

    /// Build the StoreConfig instance
    ///
    /// # Errors
    /// Returns `StoreError::BuilderError` if a field is missing or invalid
    pub fn build(self) -> StoreResult<StoreConfig> {
        if self.key_prefix.is_empty() {
            return Err(StoreError::BuilderError(
                "key_prefix must not be empty".to_string(),
            ));
        }

        if let StorageBackend::File(path) = &self.backend {
            if path.as_os_str().is_empty() {
                return Err(StoreError::BuilderError(
                    "file backend requires a path".to_string(),
                ));
            }
        }

        if self.quota_bytes == Some(0) {
            return Err(StoreError::BuilderError(
                "quota_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(StoreConfig {
            backend: self.backend,
            key_prefix: self.key_prefix,
            quota_bytes: self.quota_bytes,
            route_prefix: self.route_prefix,
        })
    }
}

impl Default for StoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<StoreConfig> for StoreConfigBuilder {
    fn from(config: StoreConfig) -> Self {
        Self {
            backend: config.backend,
            key_prefix: config.key_prefix,
            quota_bytes: config.quota_bytes,
            route_prefix: config.route_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = StoreConfigBuilder::new().build().unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.storage_key("selected_r1"), "store_selected_r1");
        assert_eq!(config.repository_route("api"), "/repos/api");
    }

    #[test]
    fn test_builder_rejects_empty_prefix() {
        let result = StoreConfigBuilder::new().key_prefix("").build();
        assert!(matches!(result, Err(StoreError::BuilderError(_))));
    }

    #[test]
    fn test_builder_rejects_empty_file_path() {
        let result = StoreConfigBuilder::new().file("").build();
        assert!(matches!(result, Err(StoreError::BuilderError(_))));
    }

    #[test]
    fn test_builder_rejects_zero_quota() {
        let result = StoreConfigBuilder::new().quota_bytes(0).build();
        assert!(matches!(result, Err(StoreError::BuilderError(_))));
    }

    #[test]
    fn test_config_from_json() {
        let config = StoreConfig::from_json(
            r#"{"backend":{"kind":"file","path":"/tmp/stores.json"},"keyPrefix":"app_","routePrefix":"/r/"}"#,
        )
        .unwrap();
        assert_eq!(
            config.backend,
            StorageBackend::File(PathBuf::from("/tmp/stores.json"))
        );
        assert_eq!(config.storage_key("x"), "app_x");
        assert_eq!(config.quota_bytes, None);
    }
}
