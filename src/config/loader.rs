//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

const ENV_PREFIX: &str = "GATEWAY_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without validating it.
pub fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load configuration: file (or defaults) → environment overrides → validation.
pub fn load_config<I>(path: Option<&Path>, vars: I) -> Result<GatewayConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, vars);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `GATEWAY_*` overrides.
///
/// `GATEWAY_BACKEND_<NAME>_URL` matches backend names case-insensitively with
/// `-` written as `_`. Unknown variables are ignored.
pub fn apply_env_overrides<I>(config: &mut GatewayConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        match name {
            "BIND_ADDRESS" => config.listener.bind_address = value,
            "IDENTITY_DOMAIN" => config.identity.domain = value,
            "IDENTITY_AUDIENCE" => config.identity.audience = Some(value),
            "LOG_LEVEL" => config.observability.log_level = value,
            _ => {
                let Some(backend) = name
                    .strip_prefix("BACKEND_")
                    .and_then(|rest| rest.strip_suffix("_URL"))
                else {
                    continue;
                };
                match config
                    .backends
                    .iter_mut()
                    .find(|b| b.name.to_ascii_uppercase().replace('-', "_") == backend)
                {
                    Some(target) => target.base_url = value,
                    None => tracing::warn!(variable = %key, "No backend matches override"),
                }
            }
        }
    }
}
