//! Collaborator interfaces between the engine and the trading platform.
//!
//! The engine reads a [`MarketSnapshot`] through [`PositionSource`], sends
//! level changes through [`UpdateDispatcher`] and reports each applied change
//! to an [`AdjustmentListener`]. Nothing here blocks or retries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{InstrumentQuote, LevelKind, Position, PositionId};

/// Everything one evaluation reads, fetched up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub positions: Vec<Position>,
    pub quote: InstrumentQuote,
}

impl MarketSnapshot {
    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("symbol '{0}' is not available on this platform")]
    UnknownSymbol(String),
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// Broker-side rejection of a single level change.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum DispatchError {
    #[error("position #{0} not found")]
    PositionNotFound(PositionId),
    #[error("invalid {} price {price}", kind.short_name())]
    InvalidPrice { kind: LevelKind, price: f64 },
    #[error("{} {price} is inside the minimum distance (limit {limit})", kind.short_name())]
    TooClose {
        kind: LevelKind,
        price: f64,
        limit: f64,
    },
    #[error("rejected by broker: {0}")]
    Rejected(String),
}

/// Source of open positions and the live quote.
pub trait PositionSource {
    fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, SourceError>;
}

/// Executes stop/target changes. Each call is independent of the others.
pub trait UpdateDispatcher {
    fn request_stop_update(&mut self, id: PositionId, price: f64) -> Result<(), DispatchError>;

    fn request_target_update(&mut self, id: PositionId, price: f64) -> Result<(), DispatchError>;

    fn request_update(
        &mut self,
        id: PositionId,
        kind: LevelKind,
        price: f64,
    ) -> Result<(), DispatchError> {
        match kind {
            LevelKind::Stop => self.request_stop_update(id, price),
            LevelKind::Target => self.request_target_update(id, price),
        }
    }
}

/// Emitted once per successfully dispatched change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentApplied {
    pub position_id: PositionId,
    pub kind: LevelKind,
    pub price: f64,
    pub symbol: String,
}

pub trait AdjustmentListener {
    fn on_adjustment_applied(&mut self, event: &AdjustmentApplied);
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoListener;

impl AdjustmentListener for NoListener {
    fn on_adjustment_applied(&mut self, _event: &AdjustmentApplied) {}
}

/// Collects events, mostly useful in tests and reports.
impl AdjustmentListener for Vec<AdjustmentApplied> {
    fn on_adjustment_applied(&mut self, event: &AdjustmentApplied) {
        self.push(event.clone());
    }
}
