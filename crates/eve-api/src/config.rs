use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EndpointError, EndpointResult};
use crate::http::HttpBackendConfig;
use crate::memory::MockBackendConfig;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000/";
pub const SERVER_URL_ENV: &str = "EVE_SERVER_URL";

/// Where the root document lives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
}

impl ServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn from_env() -> Self {
        let url = std::env::var(SERVER_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Self::new(url)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

/// Registration of one named API: backend tag, backend settings and an optional decorating
/// service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub backend: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl EndpointConfig {
    pub fn new(kind: impl Into<String>, backend: Value) -> Self {
        Self {
            kind: kind.into(),
            backend,
            service: None,
        }
    }

    pub fn mock(config: MockBackendConfig) -> EndpointResult<Self> {
        Self::tagged("mock", &config)
    }

    pub fn http(config: HttpBackendConfig) -> EndpointResult<Self> {
        Self::tagged("http", &config)
    }

    fn tagged<T: Serialize>(kind: &str, config: &T) -> EndpointResult<Self> {
        let backend = serde_json::to_value(config).map_err(|err| {
            EndpointError::Configuration(format!("invalid {kind} backend settings: {err}"))
        })?;
        Ok(Self::new(kind, backend))
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Declarative configuration: the server plus every API registration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub apis: BTreeMap<String, EndpointConfig>,
}

impl ApiConfig {
    pub fn from_json_str(raw: &str) -> EndpointResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| EndpointError::Configuration(format!("invalid api config: {err}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> EndpointResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            EndpointError::Configuration(format!(
                "read {} failed: {err}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&raw)
    }
}
