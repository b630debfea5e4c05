//! TOML helpers shared by [`crate::GuardPolicy`] and [`crate::legacy::RiskPolicy`].

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ConfigError;

pub(crate) fn from_toml_str<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    Ok(toml::from_str(content)?)
}

pub(crate) fn to_toml_string<T: Serialize>(value: &T) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(value)?)
}

pub(crate) fn read_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded policy config");
    from_toml_str(&content)
}
