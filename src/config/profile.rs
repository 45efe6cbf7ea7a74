// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linode profile file parser
//!
//! The profile file (by default `~/.config/linode.yaml`) is a map from
//! profile name to connection settings:
//!
//! ```yaml
//! default:
//!   linode_api_token: abc123
//! staging:
//!   linode_api_url: https://api.staging.linode.com
//!   linode_api_version: v4beta
//! ```
//!
//! Profiles inherit unset keys from `default`, which in turn falls back to the
//! public API URL and version. Profile names are case-insensitive.
//!
//! # Example
//!
//! ```no_run
//! use linode_api_rs::config::LinodeConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LinodeConfig::load_with_env()?;
//! let profile = config.resolve("staging")?;
//! println!("Using {}/{}", profile.api_url, profile.api_version);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::{DEFAULT_API_HOST, DEFAULT_API_VERSION};
use crate::error::{LinodeError, Result};

/// Environment variable overriding the profile file path.
pub const ENV_LINODE_CONFIG: &str = "LINODE_CONFIG";
/// Environment variable selecting a profile.
pub const ENV_LINODE_PROFILE: &str = "LINODE_PROFILE";
/// Name of the profile others inherit from.
pub const DEFAULT_PROFILE: &str = "default";

/// The whole profile file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct LinodeConfig {
    /// Map of lower-cased profile names to their settings
    pub profiles: HashMap<String, ConfigProfile>,
}

/// Settings of a single profile. Unset keys are inherited.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linode_api_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linode_api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linode_api_version: Option<String>,
}

impl ConfigProfile {
    /// Keys set here win; unset keys come from `base`.
    #[must_use]
    pub fn overlay(&self, base: &ConfigProfile) -> ConfigProfile {
        ConfigProfile {
            linode_api_token: self
                .linode_api_token
                .clone()
                .or_else(|| base.linode_api_token.clone()),
            linode_api_url: self
                .linode_api_url
                .clone()
                .or_else(|| base.linode_api_url.clone()),
            linode_api_version: self
                .linode_api_version
                .clone()
                .or_else(|| base.linode_api_version.clone()),
        }
    }
}

/// A profile after inheritance, with every key present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub name: String,
    pub token: String,
    pub api_url: String,
    pub api_version: String,
}

impl LinodeConfig {
    /// Load the profile file from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The home directory cannot be determined
    /// - The file cannot be read
    /// - The file is malformed
    #[allow(clippy::result_large_err)]
    pub fn load_default() -> Result<Self> {
        Self::load_from_path(Self::default_path()?)
    }

    /// Load the profile file, respecting `LINODE_CONFIG`
    #[allow(clippy::result_large_err)]
    pub fn load_with_env() -> Result<Self> {
        Self::load_from_path(Self::config_path()?)
    }

    /// Load the profile file from a specific path
    #[allow(clippy::result_large_err)]
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            LinodeError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a profile file from a YAML string
    ///
    /// Profile names are folded to lower case. An empty document yields no
    /// profiles.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let raw: Option<HashMap<String, ConfigProfile>> = serde_yaml::from_str(yaml)
            .map_err(|e| LinodeError::Config(format!("Failed to parse config YAML: {}", e)))?;

        let profiles = raw
            .unwrap_or_default()
            .into_iter()
            .map(|(name, profile)| (name.to_lowercase(), profile))
            .collect();
        Ok(Self { profiles })
    }

    /// Default profile file path (`~/.config/linode.yaml`)
    #[allow(clippy::result_large_err)]
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LinodeError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".config").join("linode.yaml"))
    }

    /// Profile file path, respecting `LINODE_CONFIG`
    #[allow(clippy::result_large_err)]
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(ENV_LINODE_CONFIG) {
            Ok(PathBuf::from(env_path))
        } else {
            Self::default_path()
        }
    }

    /// Get a profile as written, without inheritance
    pub fn get_profile(&self, name: &str) -> Option<&ConfigProfile> {
        self.profiles.get(&name.to_lowercase())
    }

    /// List all profile names
    pub fn profile_names(&self) -> Vec<&String> {
        self.profiles.keys().collect()
    }

    /// Resolve a profile, filling unset keys from `default` and then from the
    /// public API defaults.
    ///
    /// # Errors
    ///
    /// Fails if the profile does not exist or the token, URL or version
    /// resolves empty.
    #[allow(clippy::result_large_err)]
    pub fn resolve(&self, name: &str) -> Result<ResolvedProfile> {
        let name = name.to_lowercase();
        let profile = self
            .profiles
            .get(&name)
            .ok_or_else(|| LinodeError::Config(format!("Profile {} does not exist", name)))?;
        let builtin = ConfigProfile {
            linode_api_token: None,
            linode_api_url: Some(DEFAULT_API_HOST.to_string()),
            linode_api_version: Some(DEFAULT_API_VERSION.to_string()),
        };
        let base = match self.profiles.get(DEFAULT_PROFILE) {
            Some(default) => default.overlay(&builtin),
            None => builtin,
        };
        let merged = profile.overlay(&base);

        let token = merged.linode_api_token.unwrap_or_default();
        let api_url = merged.linode_api_url.unwrap_or_default();
        let api_version = merged.linode_api_version.unwrap_or_default();

        for (key, value) in [
            ("linode_api_token", &token),
            ("linode_api_url", &api_url),
            ("linode_api_version", &api_version),
        ] {
            if value.trim().is_empty() {
                return Err(LinodeError::Config(format!(
                    "Unable to resolve {} for profile {}",
                    key, name
                )));
            }
        }

        Ok(ResolvedProfile {
            name,
            token,
            api_url,
            api_version,
        })
    }
}
