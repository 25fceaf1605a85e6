//! Basket aggregation: filter the snapshot, then fold it into per-side exposure.
//!
//! The fold needs two passes. The spread correction applied to one side's
//! profit depends on whether the opposite side is non-empty, which is only
//! known once every eligible position has been counted.

use serde::{Deserialize, Serialize};

use crate::config::{AdjustToPrice, BreakevenConfig, FilterConfig};
use crate::domain::{InstrumentQuote, Position, PositionSide};

/// Eligibility predicate: symbol, side, label and comment.
#[derive(Debug, Clone, Copy)]
pub struct PositionFilter<'a> {
    symbol: &'a str,
    filter: &'a FilterConfig,
}

impl<'a> PositionFilter<'a> {
    pub fn new(symbol: &'a str, filter: &'a FilterConfig) -> Self {
        Self { symbol, filter }
    }

    pub fn from_config(config: &'a BreakevenConfig) -> Self {
        Self::new(&config.symbol, &config.filter)
    }

    pub fn matches(&self, position: &Position) -> bool {
        if position.symbol != self.symbol {
            return false;
        }
        if let Some(label) = &self.filter.label {
            if &position.label != label {
                return false;
            }
        }
        if let Some(comment) = &self.filter.comment {
            if !position.comment.contains(comment.as_str()) {
                return false;
            }
        }
        self.filter.side.admits(position.side)
    }

    /// Eligible positions, in snapshot order.
    pub fn select<'p>(&self, positions: &'p [Position]) -> Vec<&'p Position> {
        positions.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Knobs that change how profit is folded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOptions {
    pub adjust_to_price: AdjustToPrice,
    pub include_swaps_commission: bool,
}

impl From<&BreakevenConfig> for AggregateOptions {
    fn from(config: &BreakevenConfig) -> Self {
        Self {
            adjust_to_price: config.adjust_to_price,
            include_swaps_commission: config.adjust_for_swaps_commission,
        }
    }
}

/// Long/short exposure of the eligible basket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasketSummary {
    pub long_count: usize,
    pub short_count: usize,
    pub long_volume: f64,
    pub short_volume: f64,
    /// Volume-weighted entry price, 0 when there are no longs.
    pub long_avg_price: f64,
    /// Volume-weighted entry price, 0 when there are no shorts.
    pub short_avg_price: f64,
    pub long_profit: f64,
    pub short_profit: f64,
    pub total_profit: f64,
    /// `long_volume - short_volume`
    pub net_volume: f64,
}

impl BasketSummary {
    pub fn position_count(&self) -> usize {
        self.long_count + self.short_count
    }

    pub fn is_empty(&self) -> bool {
        self.position_count() == 0
    }

    pub fn has_longs(&self) -> bool {
        self.long_count > 0
    }

    pub fn has_shorts(&self) -> bool {
        self.short_count > 0
    }
}

/// Fold already-filtered positions into a [`BasketSummary`].
pub fn aggregate(
    positions: &[&Position],
    quote: &InstrumentQuote,
    options: AggregateOptions,
) -> BasketSummary {
    let mut summary = BasketSummary::default();

    // Pass 1: counts and volume.
    for pos in positions {
        match pos.side {
            PositionSide::Long => {
                summary.long_count += 1;
                summary.long_volume += pos.volume;
            }
            PositionSide::Short => {
                summary.short_count += 1;
                summary.short_volume += pos.volume;
            }
        }
    }

    if summary.is_empty() {
        return summary;
    }

    let spread = quote.spread_pips();
    let charge_longs = summary.has_shorts() && options.adjust_to_price == AdjustToPrice::Ask;
    let charge_shorts = summary.has_longs() && options.adjust_to_price == AdjustToPrice::Bid;

    // Pass 2: weighted price and profit.
    let mut long_notional = 0.0;
    let mut short_notional = 0.0;
    for pos in positions {
        let mut profit = pos.gross_profit;
        if options.include_swaps_commission {
            profit += pos.carrying_costs();
        }
        match pos.side {
            PositionSide::Long => {
                long_notional += pos.entry_price * pos.volume;
                if charge_longs {
                    profit -= spread * pos.volume * quote.pip_value;
                }
                summary.long_profit += profit;
            }
            PositionSide::Short => {
                short_notional += pos.entry_price * pos.volume;
                if charge_shorts {
                    profit -= spread * pos.volume * quote.pip_value;
                }
                summary.short_profit += profit;
            }
        }
    }

    if summary.long_volume > 0.0 {
        summary.long_avg_price = long_notional / summary.long_volume;
    }
    if summary.short_volume > 0.0 {
        summary.short_avg_price = short_notional / summary.short_volume;
    }
    summary.net_volume = summary.long_volume - summary.short_volume;
    summary.total_profit = summary.long_profit + summary.short_profit;
    summary
}
