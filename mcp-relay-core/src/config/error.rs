//! Configuration load and validation errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Parse(String),

    /// A `${VAR}` reference without a default named an unset variable.
    #[error("environment variable '{var}' is not set")]
    MissingEnvVar { var: String },

    #[error("server {index}: name is required")]
    MissingName { index: usize },

    #[error("duplicate server name: {0}")]
    DuplicateName(String),

    #[error("server '{server}': prefix is required")]
    MissingPrefix { server: String },

    #[error("duplicate server prefix: {0}")]
    DuplicatePrefix(String),

    #[error("server '{server}': command is required for stdio transport")]
    MissingCommand { server: String },

    #[error("server '{server}': url is required for http transport")]
    MissingUrl { server: String },
}
