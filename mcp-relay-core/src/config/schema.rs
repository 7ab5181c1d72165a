//! Configuration schema type definitions.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::duration_format;

/// Fallback request timeout for servers that do not configure one.
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Root configuration structure.
///
/// # Example
/// ```yaml
/// servers:
///   - name: math-server
///     prefix: math
///     transport: stdio
///     command: /usr/local/bin/math-mcp-server
///
/// proxy:
///   connectionTimeout: 10s
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Downstream servers to connect at startup. May be empty.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Proxy-level settings.
    #[serde(default)]
    pub proxy: ProxySettings,
}

/// One downstream server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub name: String,

    /// Tool-name prefix; exposed tools are named `<prefix>_<tool>`.
    #[serde(default)]
    pub prefix: String,

    pub transport: Transport,

    /// Program to spawn (stdio transport).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables for the child process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Endpoint (http transport; accepted by the schema, not served).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Per-request timeout for this server.
    #[serde(
        default,
        deserialize_with = "duration_format::deserialize_option",
        serialize_with = "duration_format::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl ServerConfig {
    /// Minimal stdio entry, as built for dynamically added servers.
    pub fn stdio(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            prefix: name.clone(),
            name,
            transport: Transport::Stdio,
            command: Some(command.into()),
            args,
            env: HashMap::new(),
            url: None,
            auth: None,
            timeout: Some(timeout),
        }
    }

    /// Configured timeout, or the 30 second default.
    pub fn request_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_SERVER_TIMEOUT)
    }
}

/// Downstream transport kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http => write!(f, "http"),
        }
    }
}

/// Authentication settings for http servers. Schema surface only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Proxy-level settings with defaults applied through accessors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxySettings {
    #[serde(
        rename = "healthCheckInterval",
        default,
        deserialize_with = "duration_format::deserialize_option",
        serialize_with = "duration_format::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub health_check_interval: Option<Duration>,

    #[serde(
        rename = "connectionTimeout",
        default,
        deserialize_with = "duration_format::deserialize_option",
        serialize_with = "duration_format::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_timeout: Option<Duration>,

    #[serde(rename = "maxRetries", default)]
    pub max_retries: Option<u32>,
}

impl ProxySettings {
    pub fn health_check_interval(&self) -> Duration {
        self.health_check_interval
            .unwrap_or(Duration::from_secs(30))
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout.unwrap_or(Duration::from_secs(10))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(3)
    }
}
