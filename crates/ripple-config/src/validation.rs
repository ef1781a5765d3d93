// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes and the ordering of backoff bounds.

use crate::diagnostic::ConfigError;
use crate::model::RippleConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RippleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.client.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("client.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.client.agent_id.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "client.agent_id must not be empty".to_string(),
        });
    }

    if config.reconnect.base_delay_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "reconnect.base_delay_ms must be greater than 0".to_string(),
        });
    }

    if config.reconnect.max_delay_ms < config.reconnect.base_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "reconnect.max_delay_ms ({}) must be at least reconnect.base_delay_ms ({})",
                config.reconnect.max_delay_ms, config.reconnect.base_delay_ms
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
