// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management for Linode clients
//!
//! This module provides the environment variable names the client honours and
//! a parser for the YAML profile file.
//!
//! # Environment Variables
//!
//! - `LINODE_TOKEN` - API token sent as a bearer token
//! - `LINODE_URL` - API host or base URL (default: `api.linode.com`)
//! - `LINODE_API_VERSION` - API version path segment (default: `v4`)
//! - `LINODE_CA` - Path to a PEM bundle of extra trusted root certificates
//! - `LINODE_DEBUG` - `1` or `true` logs every request and response
//! - `LINODE_CONFIG` - Path to the profile file (default: `~/.config/linode.yaml`)
//! - `LINODE_PROFILE` - Profile to use (default: `default`)
//!
//! # Example
//!
//! ```no_run
//! use linode_api_rs::{LinodeClient, LinodeClientConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LinodeClient::new(LinodeClientConfig::from_env())?;
//! # Ok(())
//! # }
//! ```

mod profile;

pub use profile::{
    ConfigProfile, LinodeConfig, ResolvedProfile, DEFAULT_PROFILE, ENV_LINODE_CONFIG,
    ENV_LINODE_PROFILE,
};

/// Environment variable holding the API token.
pub const ENV_LINODE_TOKEN: &str = "LINODE_TOKEN";
/// Environment variable overriding the API host or base URL.
pub const ENV_LINODE_URL: &str = "LINODE_URL";
/// Environment variable overriding the API version.
pub const ENV_LINODE_API_VERSION: &str = "LINODE_API_VERSION";
/// Environment variable naming a PEM file of extra root certificates.
pub const ENV_LINODE_CA: &str = "LINODE_CA";
/// Environment variable enabling debug logging of every exchange.
pub const ENV_LINODE_DEBUG: &str = "LINODE_DEBUG";

/// Interpret a boolean-ish environment value.
pub(crate) fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
