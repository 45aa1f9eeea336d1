//! Endpoint configuration for the mock server.
//!
//! Defines the endpoint data model and the loader that turns raw
//! configuration bytes into an ordered list of endpoint definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading endpoint configuration.
///
/// All of these are fatal at startup: the server must not begin
/// listening with a configuration it could not fully decode.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("endpoint {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

/// A single configured mock endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointDefinition {
    /// Request path, matched exactly (no wildcards, no query strings)
    pub url: String,

    /// HTTP verb, matched case-sensitively
    pub method: String,

    /// Canned response returned on a match
    pub response: ResponseSpec,

    /// Milliseconds to hold the connection open after the response is
    /// written; `0` means no delay
    #[serde(default)]
    pub delay: u64,
}

impl EndpointDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("url cannot be empty".to_string());
        }
        if self.method.is_empty() {
            return Err("method cannot be empty".to_string());
        }
        self.response.validate()
    }
}

/// The canned answer for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseSpec {
    /// HTTP status code, used verbatim
    pub status: u16,

    /// Response headers; values may be strings, numbers, or booleans and
    /// are rendered to their string form before being set
    #[serde(default)]
    pub headers: HashMap<String, Value>,

    /// Optional structured body, serialized as JSON when present
    #[serde(default)]
    pub body: Option<Value>,
}

impl ResponseSpec {
    fn validate(&self) -> Result<(), String> {
        if !(100..=599).contains(&self.status) {
            return Err(format!("invalid status code: {}", self.status));
        }
        for (name, value) in &self.headers {
            if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                return Err(format!(
                    "header {name:?} must be a string, number, or boolean"
                ));
            }
        }
        Ok(())
    }
}

/// Decode a JSON configuration from raw bytes.
///
/// The input is an ordered array of endpoint definitions. A single
/// malformed record fails the whole load. Order is preserved; it matters
/// only for the last-registration-wins tie-break on duplicate routes.
pub fn load(bytes: &[u8]) -> Result<Vec<EndpointDefinition>, ConfigError> {
    let endpoints: Vec<EndpointDefinition> = serde_json::from_slice(bytes)?;
    validate(&endpoints)?;
    Ok(endpoints)
}

/// Decode a YAML configuration from raw bytes.
pub fn load_yaml(bytes: &[u8]) -> Result<Vec<EndpointDefinition>, ConfigError> {
    let endpoints: Vec<EndpointDefinition> = serde_yaml::from_slice(bytes)?;
    validate(&endpoints)?;
    Ok(endpoints)
}

/// Load endpoint definitions from a file, picking the format by extension
/// (`.yaml`/`.yml` is parsed as YAML, everything else as JSON).
pub fn from_file(path: &Path) -> Result<Vec<EndpointDefinition>, ConfigError> {
    let bytes = std::fs::read(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_yaml(&bytes),
        _ => load(&bytes),
    }
}

fn validate(endpoints: &[EndpointDefinition]) -> Result<(), ConfigError> {
    for (i, endpoint) in endpoints.iter().enumerate() {
        endpoint
            .validate()
            .map_err(|reason| ConfigError::Invalid { index: i, reason })?;
    }
    Ok(())
}
