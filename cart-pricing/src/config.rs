use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SETTLE_MS: u64 = 400;
pub const MIN_SETTLE_MS: u64 = 300;
pub const MAX_SETTLE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Quiet period after the last linked-field edit before a recalculation is issued.
    pub settle_window: Duration,
    pub catalog_path: Option<PathBuf>,
    pub log_recalculations: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            settle_window: Duration::from_millis(DEFAULT_SETTLE_MS),
            catalog_path: None,
            log_recalculations: false,
        }
    }
}

pub fn load_pricing_config() -> Result<PricingConfig> {
    let settle_window = env::var("PRICING_SETTLE_MS")
        .ok()
        .map(|value| parse_settle_ms(&value))
        .transpose()
        .context("Failed to parse PRICING_SETTLE_MS")?
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_SETTLE_MS));

    let catalog_path = env::var("PRICING_CATALOG_PATH")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .map(PathBuf::from);

    let log_recalculations = bool_from_env("PRICING_LOG_RECALC").unwrap_or(false);

    Ok(PricingConfig { settle_window, catalog_path, log_recalculations })
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Milliseconds, clamped into the supported settle range.
fn parse_settle_ms(value: &str) -> Result<u64> {
    let ms = value
        .trim()
        .parse::<u64>()
        .map_err(|err| anyhow!("Invalid settle window '{}': {err}", value.trim()))?;
    let clamped = ms.clamp(MIN_SETTLE_MS, MAX_SETTLE_MS);
    if clamped != ms {
        tracing::warn!(requested_ms = ms, applied_ms = clamped, "Settle window outside supported range; clamped");
    }
    Ok(clamped)
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
