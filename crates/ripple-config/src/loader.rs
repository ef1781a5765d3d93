// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ripple.toml` > `~/.config/ripple/ripple.toml` > `/etc/ripple/ripple.toml`
//! with environment variable overrides via `RIPPLE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RippleConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ripple/ripple.toml` (system-wide)
/// 3. `~/.config/ripple/ripple.toml` (user XDG config)
/// 4. `./ripple.toml` (local directory)
/// 5. `RIPPLE_*` environment variables
pub fn load_config() -> Result<RippleConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<RippleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RippleConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RippleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RippleConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RippleConfig::default()))
        .merge(Toml::file("/etc/ripple/ripple.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ripple/ripple.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ripple.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `RIPPLE_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `max_retries` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("RIPPLE_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("client_", "client.", 1)
            .replacen("reconnect_", "reconnect.", 1)
            .replacen("protocol_", "protocol.", 1);
        mapped.into()
    })
}
