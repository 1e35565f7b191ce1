use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:19530";

/// Connection settings for a Milvus instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MilvusConfig {
    /// Milvus endpoint URL (e.g., `http://localhost:19530`).
    pub endpoint: String,
    /// Database every request is scoped to.
    pub database: String,
    /// Optional token for secured instances.
    pub api_key: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl MilvusConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            database: "default".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Reads `MILVUS_URI` (default `http://localhost:19530`), `MILVUS_TOKEN`
    /// and `MILVUS_DB_NAME`.
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("MILVUS_URI").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let mut config = Self::new(endpoint);
        if let Ok(token) = std::env::var("MILVUS_TOKEN") {
            if !token.is_empty() {
                config = config.with_api_key(token);
            }
        }
        if let Ok(database) = std::env::var("MILVUS_DB_NAME") {
            if !database.is_empty() {
                config = config.with_database(database);
            }
        }
        config
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the token for Zilliz Cloud or secured Milvus instances.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }
}
