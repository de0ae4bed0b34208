// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/propcare/propcare.toml`, then `~/.config/propcare/propcare.toml`,
//! then `./propcare.toml`, then `PROPCARE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PropcareConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/propcare/propcare.toml";
pub(crate) const LOCAL_CONFIG: &str = "propcare.toml";

/// Sections recognised by the env provider, in matching order.
const ENV_SECTIONS: &[&str] = &[
    "logging", "server", "storage", "openai", "triage", "notify", "worker", "email",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("propcare/propcare.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/propcare/propcare.toml`
/// 3. `~/.config/propcare/propcare.toml`
/// 4. `./propcare.toml`
/// 5. `PROPCARE_*` environment variables
pub fn load_config() -> Result<PropcareConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PropcareConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PropcareConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PropcareConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PropcareConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PropcareConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `PROPCARE_OPENAI_API_KEY` must become `openai.api_key`.
pub fn env_provider() -> Env {
    Env::prefixed("PROPCARE_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section)
            && let Some(field) = rest.strip_prefix('_')
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}
