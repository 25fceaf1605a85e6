use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit in which the broker quotes its minimum stop/target distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MinDistanceUnit {
    /// Distance in pips, converted to price with `pip_size`.
    #[default]
    Pips,
    /// Distance as a percentage of the live price.
    Percent,
}

/// Most decimal digits a price can be rounded to in an `f64`.
pub const MAX_DIGITS: u32 = 15;

/// Live quote and symbol economics for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentQuote {
    pub bid: f64,
    pub ask: f64,
    pub pip_size: f64,
    /// Account-currency P/L per unit of volume per pip.
    pub pip_value: f64,
    #[serde(default)]
    pub min_stop_distance: f64,
    #[serde(default)]
    pub min_target_distance: f64,
    #[serde(default)]
    pub min_distance_unit: MinDistanceUnit,
    pub tick_size: f64,
    pub digits: u32,
}

impl InstrumentQuote {
    /// Current spread expressed in pips.
    pub fn spread_pips(&self) -> f64 {
        (self.ask - self.bid) / self.pip_size
    }

    /// Round a price to the symbol's digit precision.
    ///
    /// Ties go to the even digit, which is how the platform rounds levels.
    pub fn round_price(&self, price: f64) -> f64 {
        let scale = 10f64.powi(self.digits as i32);
        (price * scale).round_ties_even() / scale
    }

    /// True when two prices are indistinguishable at half a tick.
    pub fn same_level(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tick_size / 2.0
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        let fields = [
            self.bid,
            self.ask,
            self.pip_size,
            self.pip_value,
            self.min_stop_distance,
            self.min_target_distance,
            self.tick_size,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(QuoteError::NonFinite);
        }
        if self.bid <= 0.0 || self.ask <= 0.0 {
            return Err(QuoteError::NonPositivePrice { bid: self.bid, ask: self.ask });
        }
        if self.bid > self.ask {
            return Err(QuoteError::Crossed { bid: self.bid, ask: self.ask });
        }
        if self.pip_size <= 0.0 {
            return Err(QuoteError::InvalidPipSize(self.pip_size));
        }
        if self.pip_value <= 0.0 {
            return Err(QuoteError::InvalidPipValue(self.pip_value));
        }
        if self.tick_size <= 0.0 {
            return Err(QuoteError::InvalidTickSize(self.tick_size));
        }
        if self.digits > MAX_DIGITS {
            return Err(QuoteError::InvalidDigits(self.digits));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("Quote contains non-finite values")]
    NonFinite,

    #[error("Bid {bid} / ask {ask} must both be positive")]
    NonPositivePrice { bid: f64, ask: f64 },

    #[error("Bid {bid} is above ask {ask}")]
    Crossed { bid: f64, ask: f64 },

    #[error("Pip size {0} must be positive")]
    InvalidPipSize(f64),

    #[error("Pip value {0} must be positive")]
    InvalidPipValue(f64),

    #[error("Tick size {0} must be positive")]
    InvalidTickSize(f64),

    #[error("Digits {0} must be at most 15")]
    InvalidDigits(u32),
}
