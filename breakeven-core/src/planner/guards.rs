//! Broker minimum-distance guards and the stop/target decision table.

use serde::{Deserialize, Serialize};

use crate::domain::{InstrumentQuote, LevelKind, MinDistanceUnit, PositionSide};

/// Closest legal stop/target levels on each side of the live quote.
///
/// Named after the price they are measured from and the level they guard:
/// `ask_stop` is the lowest stop a short may hold, `bid_stop` the highest
/// stop a long may hold, and likewise for targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardLevels {
    pub ask_stop: f64,
    pub bid_stop: f64,
    pub ask_target: f64,
    pub bid_target: f64,
}

impl GuardLevels {
    pub fn from_quote(quote: &InstrumentQuote) -> Self {
        let stop = quote.min_stop_distance;
        let target = quote.min_target_distance;
        match quote.min_distance_unit {
            MinDistanceUnit::Pips => Self {
                ask_stop: quote.ask + stop * quote.pip_size,
                bid_stop: quote.bid - stop * quote.pip_size,
                ask_target: quote.ask + target * quote.pip_size,
                bid_target: quote.bid - target * quote.pip_size,
            },
            // Every level sits above its reference price, bid-side ones included.
            MinDistanceUnit::Percent => Self {
                ask_stop: quote.ask * (1.0 + stop / 100.0),
                bid_stop: quote.bid * (1.0 + stop / 100.0),
                ask_target: quote.ask * (1.0 + target / 100.0),
                bid_target: quote.bid * (1.0 + target / 100.0),
            },
        }
    }
}

/// Decide which level, if any, a candidate price can become for a position.
///
/// | side  | candidate            | level  |
/// |-------|----------------------|--------|
/// | Long  | `< bid_stop`         | Stop   |
/// | Long  | `> ask_target`       | Target |
/// | Short | `> ask_stop`         | Stop   |
/// | Short | `< bid_target`       | Target |
///
/// Anything else is too close to the market to be placed.
pub fn classify_level(
    side: PositionSide,
    candidate: f64,
    guards: &GuardLevels,
) -> Option<LevelKind> {
    match side {
        PositionSide::Long if candidate < guards.bid_stop => Some(LevelKind::Stop),
        PositionSide::Long if candidate > guards.ask_target => Some(LevelKind::Target),
        PositionSide::Short if candidate > guards.ask_stop => Some(LevelKind::Stop),
        PositionSide::Short if candidate < guards.bid_target => Some(LevelKind::Target),
        _ => None,
    }
}
