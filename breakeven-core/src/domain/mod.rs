//! Domain types: platform positions and the live instrument quote.

pub mod position;
pub mod quote;

pub use position::{Position, PositionId, PositionSide};
pub use quote::{InstrumentQuote, MinDistanceUnit, QuoteError};

/// Which protective level an adjustment touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Stop,
    Target,
}

impl LevelKind {
    /// Human-readable name used in logs and notifications.
    pub fn display_name(self) -> &'static str {
        match self {
            LevelKind::Stop => "Stop-loss",
            LevelKind::Target => "Take-profit",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            LevelKind::Stop => "SL",
            LevelKind::Target => "TP",
        }
    }
}
