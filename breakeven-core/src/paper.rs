//! Paper trading platform.
//!
//! Holds positions for a single symbol in memory, re-marks their profit from
//! each new bid/ask, closes them when a stop or target is crossed, and accepts
//! or rejects level changes the way a broker would: unknown positions,
//! non-positive prices and levels inside the minimum distance are refused.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{InstrumentQuote, LevelKind, Position, PositionId, PositionSide};
use crate::engine::{DispatchError, MarketSnapshot, PositionSource, SourceError, UpdateDispatcher};
use crate::planner::GuardLevels;

/// A position the paper broker closed on a stop or target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub id: PositionId,
    pub side: PositionSide,
    pub volume: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub closed_by: LevelKind,
    /// Realized profit including swap and commission.
    pub profit: f64,
}

#[derive(Debug, Clone)]
pub struct PaperBroker {
    symbol: String,
    quote: InstrumentQuote,
    positions: Vec<Position>,
    closed: Vec<ClosedPosition>,
    forced_rejections: HashMap<PositionId, String>,
}

impl PaperBroker {
    pub fn new(
        symbol: impl Into<String>,
        quote: InstrumentQuote,
        positions: Vec<Position>,
    ) -> Self {
        let symbol = symbol.into();
        let positions = positions.into_iter().filter(|p| p.symbol == symbol).collect();
        Self {
            symbol,
            quote,
            positions,
            closed: Vec::new(),
            forced_rejections: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quote(&self) -> &InstrumentQuote {
        &self.quote
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn closed(&self) -> &[ClosedPosition] {
        &self.closed
    }

    pub fn realized_profit(&self) -> f64 {
        self.closed.iter().map(|c| c.profit).sum()
    }

    /// Floating profit of the open positions, swap and commission included.
    pub fn floating_profit(&self) -> f64 {
        self.positions
            .iter()
            .map(|p| p.gross_profit + p.carrying_costs())
            .sum()
    }

    /// Refuse every level change for `id` until cleared.
    pub fn reject_updates_for(&mut self, id: PositionId, reason: impl Into<String>) {
        self.forced_rejections.insert(id, reason.into());
    }

    pub fn clear_rejections(&mut self) {
        self.forced_rejections.clear();
    }

    /// Move the market, re-mark every position and close those whose stop or
    /// target was crossed. Returns the positions closed by this move.
    pub fn mark(&mut self, bid: f64, ask: f64) -> Vec<ClosedPosition> {
        self.quote.bid = bid;
        self.quote.ask = ask;

        for pos in &mut self.positions {
            pos.gross_profit = mark_to_market(pos, &self.quote);
        }

        let mut closed_now = Vec::new();
        let quote = &self.quote;
        self.positions.retain(|pos| match crossed_level(pos, quote) {
            Some(kind) => {
                let exit_price = exit_price(pos, quote);
                let closed = ClosedPosition {
                    id: pos.id,
                    side: pos.side,
                    volume: pos.volume,
                    entry_price: pos.entry_price,
                    exit_price,
                    closed_by: kind,
                    profit: pos.gross_profit + pos.carrying_costs(),
                };
                tracing::info!(
                    position = %pos.id,
                    side = pos.side.label(),
                    closed_by = kind.short_name(),
                    exit_price,
                    profit = closed.profit,
                    "Paper position closed"
                );
                closed_now.push(closed);
                false
            }
            None => true,
        });

        self.closed.extend(closed_now.iter().cloned());
        closed_now
    }

    fn check_update(
        &self,
        id: PositionId,
        kind: LevelKind,
        price: f64,
    ) -> Result<usize, DispatchError> {
        if let Some(reason) = self.forced_rejections.get(&id) {
            return Err(DispatchError::Rejected(reason.clone()));
        }
        let index = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(DispatchError::PositionNotFound(id))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(DispatchError::InvalidPrice { kind, price });
        }

        let guards = GuardLevels::from_quote(&self.quote);
        let side = self.positions[index].side;
        let too_close = match (side, kind) {
            (PositionSide::Long, LevelKind::Stop) => {
                (price >= guards.bid_stop).then_some(guards.bid_stop)
            }
            (PositionSide::Long, LevelKind::Target) => {
                (price <= guards.ask_target).then_some(guards.ask_target)
            }
            (PositionSide::Short, LevelKind::Stop) => {
                (price <= guards.ask_stop).then_some(guards.ask_stop)
            }
            (PositionSide::Short, LevelKind::Target) => {
                (price >= guards.bid_target).then_some(guards.bid_target)
            }
        };
        if let Some(limit) = too_close {
            return Err(DispatchError::TooClose { kind, price, limit });
        }
        Ok(index)
    }
}

fn mark_to_market(pos: &Position, quote: &InstrumentQuote) -> f64 {
    let pips = match pos.side {
        PositionSide::Long => (quote.bid - pos.entry_price) / quote.pip_size,
        PositionSide::Short => (pos.entry_price - quote.ask) / quote.pip_size,
    };
    pips * quote.pip_value * pos.volume
}

/// Longs close on the bid, shorts on the ask.
fn exit_price(pos: &Position, quote: &InstrumentQuote) -> f64 {
    match pos.side {
        PositionSide::Long => quote.bid,
        PositionSide::Short => quote.ask,
    }
}

fn crossed_level(pos: &Position, quote: &InstrumentQuote) -> Option<LevelKind> {
    let price = exit_price(pos, quote);
    let (stop_hit, target_hit) = match pos.side {
        PositionSide::Long => (
            pos.current_stop.is_some_and(|s| price <= s),
            pos.current_target.is_some_and(|t| price >= t),
        ),
        PositionSide::Short => (
            pos.current_stop.is_some_and(|s| price >= s),
            pos.current_target.is_some_and(|t| price <= t),
        ),
    };
    if stop_hit {
        Some(LevelKind::Stop)
    } else if target_hit {
        Some(LevelKind::Target)
    } else {
        None
    }
}

impl PositionSource for PaperBroker {
    fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, SourceError> {
        if symbol != self.symbol {
            return Err(SourceError::UnknownSymbol(symbol.to_string()));
        }
        Ok(MarketSnapshot {
            positions: self.positions.clone(),
            quote: self.quote.clone(),
        })
    }
}

impl UpdateDispatcher for PaperBroker {
    fn request_stop_update(&mut self, id: PositionId, price: f64) -> Result<(), DispatchError> {
        let index = self.check_update(id, LevelKind::Stop, price)?;
        self.positions[index].current_stop = Some(price);
        Ok(())
    }

    fn request_target_update(&mut self, id: PositionId, price: f64) -> Result<(), DispatchError> {
        let index = self.check_update(id, LevelKind::Target, price)?;
        self.positions[index].current_target = Some(price);
        Ok(())
    }
}
