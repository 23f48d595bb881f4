//! Environment-driven mill configuration.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use ricemill_stock::{SackPolicy, SackSize};
use ricemill_trade::OverpaymentPolicy;

pub const DEFAULT_SACK_KG_VAR: &str = "RICEMILL_DEFAULT_SACK_KG";
pub const SACK_SIZES_VAR: &str = "RICEMILL_SACK_SIZES";
pub const OVERPAYMENT_VAR: &str = "RICEMILL_OVERPAYMENT";
pub const MAX_CONFLICT_RETRIES_VAR: &str = "RICEMILL_MAX_CONFLICT_RETRIES";
pub const LOG_VAR: &str = "RICEMILL_LOG";

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var}: default sack size {default} is not in the allowed sizes")]
    DefaultNotAllowed { var: &'static str, default: SackSize },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MillConfig {
    pub sack_policy: SackPolicy,
    pub overpayment_policy: OverpaymentPolicy,
    /// How often `StockService` reloads and retries after losing an append race.
    pub max_conflict_retries: u32,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for MillConfig {
    fn default() -> Self {
        Self {
            sack_policy: SackPolicy::standard(),
            overpayment_policy: OverpaymentPolicy::default(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl MillConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_size = match get(DEFAULT_SACK_KG_VAR) {
            Some(raw) => parse_sack_size(DEFAULT_SACK_KG_VAR, &raw)?,
            None => SackSize::default(),
        };

        let allowed = match get(SACK_SIZES_VAR) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| parse_sack_size(SACK_SIZES_VAR, part))
                .collect::<Result<Vec<_>, _>>()?,
            None => SackSize::STANDARD.to_vec(),
        };

        let sack_policy =
            SackPolicy::new(default_size, allowed).map_err(|_| ConfigError::DefaultNotAllowed {
                var: SACK_SIZES_VAR,
                default: default_size,
            })?;

        let overpayment_policy = match get(OVERPAYMENT_VAR) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "allow" => OverpaymentPolicy::Allow,
                "reject" => OverpaymentPolicy::Reject,
                _ => {
                    return Err(ConfigError::invalid(
                        OVERPAYMENT_VAR,
                        &raw,
                        "expected `allow` or `reject`",
                    ));
                }
            },
            None => OverpaymentPolicy::default(),
        };

        let max_conflict_retries = match get(MAX_CONFLICT_RETRIES_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::invalid(MAX_CONFLICT_RETRIES_VAR, &raw, e.to_string()))?,
            None => DEFAULT_MAX_CONFLICT_RETRIES,
        };

        let log_filter = get(LOG_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            sack_policy,
            overpayment_policy,
            max_conflict_retries,
            log_filter,
        })
    }
}

fn parse_sack_size(var: &'static str, raw: &str) -> Result<SackSize, ConfigError> {
    let kg = Decimal::from_str(raw.trim())
        .map_err(|e| ConfigError::invalid(var, raw, e.to_string()))?;
    SackSize::new(kg).map_err(|e| ConfigError::invalid(var, raw, e.to_string()))
}
