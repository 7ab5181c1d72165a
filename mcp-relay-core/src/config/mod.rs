//! YAML configuration for the proxy: server entries and proxy settings.
//!
//! Loading applies `${VAR}` environment expansion to the raw file before
//! parsing, then validates uniqueness and transport requirements. An empty
//! or server-less file is valid; a dynamic proxy can start with zero servers
//! and grow through `server_add`.

pub mod duration_format;
mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, substitute_env_vars};
pub use schema::{AuthConfig, ProxyConfig, ProxySettings, ServerConfig, Transport};
