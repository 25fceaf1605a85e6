use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-assigned position identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn label(self) -> &'static str {
        match self {
            PositionSide::Long => "Buy",
            PositionSide::Short => "Sell",
        }
    }
}

/// Open position as reported by the platform.
///
/// The core only ever reads these. Stop and target changes go through the
/// dispatcher and show up in the next snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: f64,
    /// Volume in units (not lots).
    pub volume: f64,
    /// Floating profit in account currency, excluding swap and commission.
    pub gross_profit: f64,
    #[serde(default)]
    pub swap: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub current_stop: Option<f64>,
    #[serde(default)]
    pub current_target: Option<f64>,
}

impl Position {
    pub fn new_long(id: u64, symbol: impl Into<String>, entry_price: f64, volume: f64) -> Self {
        Self::new(id, symbol, PositionSide::Long, entry_price, volume)
    }

    pub fn new_short(id: u64, symbol: impl Into<String>, entry_price: f64, volume: f64) -> Self {
        Self::new(id, symbol, PositionSide::Short, entry_price, volume)
    }

    fn new(
        id: u64,
        symbol: impl Into<String>,
        side: PositionSide,
        entry_price: f64,
        volume: f64,
    ) -> Self {
        Self {
            id: PositionId(id),
            symbol: symbol.into(),
            side,
            entry_price,
            volume,
            gross_profit: 0.0,
            swap: 0.0,
            commission: 0.0,
            label: String::new(),
            comment: String::new(),
            current_stop: None,
            current_target: None,
        }
    }

    pub fn with_profit(mut self, gross_profit: f64) -> Self {
        self.gross_profit = gross_profit;
        self
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Swap plus commission, both signed as the platform reports them.
    pub fn carrying_costs(&self) -> f64 {
        self.swap + self.commission
    }

    /// Current stop, with an unset stop read as 0.
    pub fn stop_or_zero(&self) -> f64 {
        self.current_stop.unwrap_or(0.0)
    }

    /// Current target, with an unset target read as 0.
    pub fn target_or_zero(&self) -> f64 {
        self.current_target.unwrap_or(0.0)
    }
}
