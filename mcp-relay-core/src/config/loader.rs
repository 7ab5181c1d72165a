//! Configuration loading, environment expansion, and validation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::error::ConfigError;
use super::schema::{ProxyConfig, Transport};

// The pattern is a compile-time literal; test_env_var_pattern_compiles
// exercises it.
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("BUG: ENV_VAR_PATTERN regex is invalid")
});

/// Load, expand, and validate the proxy configuration from a file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&contents)
}

/// Load configuration from a YAML string.
///
/// An empty document yields the default (server-less) configuration, which a
/// dynamic proxy accepts.
pub fn load_config_from_str(contents: &str) -> Result<ProxyConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(ProxyConfig::default());
    }

    let expanded = substitute_env_vars(contents)?;

    let config: ProxyConfig =
        serde_saphyr::from_str(&expanded).map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config)?;
    Ok(config)
}

/// Substitute environment variables in the raw config text.
///
/// # Syntax
/// - `${VAR}` - required, errors if unset
/// - `${VAR:-default}` - optional with default
/// - `$VAR` - optional, expands to the empty string if unset
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures| {
        if let Some(name) = caps.get(1) {
            // Braced form, optionally with a default.
            match std::env::var(name.as_str()) {
                Ok(value) => value,
                Err(_) => match caps.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => {
                        if missing.is_none() {
                            missing = Some(name.as_str().to_string());
                        }
                        String::new()
                    }
                },
            }
        } else if let Some(name) = caps.get(3) {
            // Bare form: lenient, unset expands to empty.
            std::env::var(name.as_str()).unwrap_or_default()
        } else {
            String::new()
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnvVar { var });
    }

    Ok(result.into_owned())
}

/// Validate server uniqueness and per-transport requirements.
///
/// Timeout strings are validated during deserialization, so only structural
/// rules remain here.
fn validate(config: &ProxyConfig) -> Result<(), ConfigError> {
    let mut names: HashSet<&str> = HashSet::new();
    let mut prefixes: HashSet<&str> = HashSet::new();

    for (index, server) in config.servers.iter().enumerate() {
        if server.name.is_empty() {
            return Err(ConfigError::MissingName { index });
        }
        if !names.insert(&server.name) {
            return Err(ConfigError::DuplicateName(server.name.clone()));
        }

        if server.prefix.is_empty() {
            return Err(ConfigError::MissingPrefix {
                server: server.name.clone(),
            });
        }
        if !prefixes.insert(&server.prefix) {
            return Err(ConfigError::DuplicatePrefix(server.prefix.clone()));
        }

        match server.transport {
            Transport::Stdio => {
                if server.command.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::MissingCommand {
                        server: server.name.clone(),
                    });
                }
            }
            Transport::Http => {
                if server.url.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::MissingUrl {
                        server: server.name.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
