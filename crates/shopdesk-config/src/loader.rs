// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/shopdesk/shopdesk.toml`, `~/.config/shopdesk/shopdesk.toml`,
//! `./shopdesk.toml`, then `SHOPDESK_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ShopdeskConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/shopdesk/shopdesk.toml";
pub(crate) const LOCAL_CONFIG: &str = "shopdesk.toml";

/// Section names that environment variables map onto.
///
/// Ordered so that no entry is a prefix of a later one.
const ENV_SECTIONS: [&str; 10] = [
    "server",
    "query",
    "rate_limit",
    "circuit_breaker",
    "cache",
    "llm",
    "storage",
    "store",
    "analytics",
    "gateway",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shopdesk").join("shopdesk.toml"))
}

/// The full figment for the standard file hierarchy plus env overrides.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ShopdeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<ShopdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ShopdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShopdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShopdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShopdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `SHOPDESK_RATE_LIMIT_REQUESTS_PER_MINUTE` maps to `rate_limit.requests_per_minute`.
///
/// Only the leading section name is turned into a dot; key names keep their
/// underscores.
fn env_provider() -> Env {
    Env::prefixed("SHOPDESK_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key
}
