//! Configuration for the single-breakeven engine.
//!
//! Loaded from TOML. Every field has a default so a config file only needs
//! the symbol. The engine starts disabled with notifications off.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::PositionSide;

/// Which live price the breakeven is corrected against when the basket
/// holds both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustToPrice {
    /// No spread correction.
    Off,
    Ask,
    #[default]
    Bid,
}

/// Side restriction for eligible positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SideFilter {
    #[default]
    All,
    Buy,
    Sell,
}

impl SideFilter {
    pub fn admits(self, side: PositionSide) -> bool {
        match self {
            SideFilter::All => true,
            SideFilter::Buy => side == PositionSide::Long,
            SideFilter::Sell => side == PositionSide::Short,
        }
    }
}

/// Position eligibility filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    pub side: SideFilter,
    /// Exact label match when set.
    pub label: Option<String>,
    /// Substring match against the position comment when set.
    pub comment: Option<String>,
}

/// Alert and email delivery options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub send_alert: bool,
    pub send_email: bool,
    pub email_address: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            send_alert: false,
            send_email: false,
            email_address: "email@example.com".to_string(),
        }
    }
}

impl NotifyConfig {
    /// True when at least one delivery channel would fire.
    pub fn is_active(&self) -> bool {
        self.enabled && (self.send_alert || self.send_email)
    }
}

/// Complete engine configuration for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakevenConfig {
    pub symbol: String,
    /// Basket profit (account currency) required before any level is moved.
    pub profit_to_trigger: f64,
    /// Profit (account currency) the breakeven level keeps locked in.
    pub additional_profit: f64,
    pub adjust_to_price: AdjustToPrice,
    pub delay_between_adjustments_secs: u64,
    pub adjust_for_swaps_commission: bool,
    /// Initial state of the enable toggle.
    pub enabled: bool,
    pub filter: FilterConfig,
    pub notify: NotifyConfig,
}

impl Default for BreakevenConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            profit_to_trigger: 100.0,
            additional_profit: 0.0,
            adjust_to_price: AdjustToPrice::Bid,
            delay_between_adjustments_secs: 60,
            adjust_for_swaps_commission: false,
            enabled: false,
            filter: FilterConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl BreakevenConfig {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if !self.profit_to_trigger.is_finite() || self.profit_to_trigger < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "profit_to_trigger must be a non-negative number, got {}",
                self.profit_to_trigger
            )));
        }
        if !self.additional_profit.is_finite() || self.additional_profit < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "additional_profit must be a non-negative number, got {}",
                self.additional_profit
            )));
        }
        if self.notify.enabled
            && self.notify.send_email
            && self.notify.email_address.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "notify.email_address is required when send_email is on".into(),
            ));
        }
        Ok(())
    }

    pub fn delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.delay_between_adjustments_secs.min(u32::MAX as u64) as i64)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = BreakevenConfig::from_toml(r#"symbol = "EURUSD""#).unwrap();
        assert_eq!(cfg.profit_to_trigger, 100.0);
        assert_eq!(cfg.additional_profit, 0.0);
        assert_eq!(cfg.adjust_to_price, AdjustToPrice::Bid);
        assert_eq!(cfg.delay_between_adjustments_secs, 60);
        assert!(!cfg.enabled);
        assert_eq!(cfg.filter.side, SideFilter::All);
        assert!(!cfg.notify.is_active());
    }

    #[test]
    fn full_config_parses() {
        let cfg = BreakevenConfig::from_toml(
            r#"
            symbol = "GBPUSD"
            profit_to_trigger = 250.0
            additional_profit = 20.0
            adjust_to_price = "ask"
            delay_between_adjustments_secs = 5
            adjust_for_swaps_commission = true
            enabled = true

            [filter]
            side = "sell"
            label = "grid"
            comment = "batch-2"

            [notify]
            enabled = true
            send_alert = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.adjust_to_price, AdjustToPrice::Ask);
        assert_eq!(cfg.filter.side, SideFilter::Sell);
        assert_eq!(cfg.filter.label.as_deref(), Some("grid"));
        assert_eq!(cfg.delay(), chrono::Duration::seconds(5));
        assert!(cfg.notify.is_active());
    }

    #[test]
    fn rejects_empty_symbol() {
        let err = BreakevenConfig::from_toml("profit_to_trigger = 5.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_cushion() {
        let err = BreakevenConfig::from_toml(
            r#"
            symbol = "EURUSD"
            additional_profit = -1.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("additional_profit"));
    }

    #[test]
    fn rejects_email_without_address() {
        let err = BreakevenConfig::from_toml(
            r#"
            symbol = "EURUSD"
            [notify]
            enabled = true
            send_email = true
            email_address = ""
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("email_address"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = BreakevenConfig::from_toml("symbol = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("be.toml");
        std::fs::write(&path, "symbol = \"USDJPY\"\nenabled = true\n").unwrap();
        let cfg = BreakevenConfig::from_file(&path).unwrap();
        assert_eq!(cfg.symbol, "USDJPY");
        assert!(cfg.enabled);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BreakevenConfig::from_file(Path::new("/nonexistent/be.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn side_filter_admits() {
        assert!(SideFilter::All.admits(PositionSide::Short));
        assert!(SideFilter::Buy.admits(PositionSide::Long));
        assert!(!SideFilter::Buy.admits(PositionSide::Short));
        assert!(!SideFilter::Sell.admits(PositionSide::Long));
    }
}
