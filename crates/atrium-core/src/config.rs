use serde::{Deserialize, Serialize};

/// Which data service implementation to bind to.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceBackend {
    /// Process-local store, nothing leaves the machine.
    #[default]
    Memory,
    /// Remote REST API at `base_url`.
    Http,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub backend: ServiceBackend,
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend: ServiceBackend::Memory,
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AtriumConfig {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}
