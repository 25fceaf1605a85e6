//! Single breakeven price for the whole basket.
//!
//! Converts the basket's profit above the cushion into a price distance using
//! the instrument's pip economics, then measures that distance from the
//! closing side of the live quote: bid for a net-long basket, ask for a
//! net-short one.

use serde::{Deserialize, Serialize};

use crate::basket::BasketSummary;
use crate::domain::InstrumentQuote;

/// Why no breakeven exists this cycle. These are steady states, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoBreakeven {
    InvalidQuote,
    EmptyBasket,
    /// Long and short volume cancel out.
    Hedged,
    InsufficientProfit,
    /// The computed level is at or below zero.
    NonPositiveLevel,
}

impl NoBreakeven {
    pub fn describe(self) -> &'static str {
        match self {
            NoBreakeven::InvalidQuote => "quote is unusable",
            NoBreakeven::EmptyBasket => "no eligible positions",
            NoBreakeven::Hedged => "basket is perfectly hedged",
            NoBreakeven::InsufficientProfit => "basket profit does not exceed the cushion",
            NoBreakeven::NonPositiveLevel => "breakeven level is not a valid price",
        }
    }
}

/// Candidate breakeven level, unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum BreakevenQuote {
    Level(f64),
    Unavailable(NoBreakeven),
}

impl BreakevenQuote {
    pub fn price(&self) -> Option<f64> {
        match self {
            BreakevenQuote::Level(p) => Some(*p),
            BreakevenQuote::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BreakevenQuote::Level(_))
    }
}

/// Compute the basket breakeven.
///
/// `cushion` is the profit (account currency) that must remain locked in;
/// the basket must already earn more than it.
pub fn calculate_breakeven(
    summary: &BasketSummary,
    quote: &InstrumentQuote,
    cushion: f64,
) -> BreakevenQuote {
    if quote.validate().is_err() {
        return BreakevenQuote::Unavailable(NoBreakeven::InvalidQuote);
    }
    if summary.is_empty() {
        return BreakevenQuote::Unavailable(NoBreakeven::EmptyBasket);
    }
    if summary.net_volume == 0.0 {
        return BreakevenQuote::Unavailable(NoBreakeven::Hedged);
    }
    if summary.total_profit <= 0.0 || summary.total_profit <= cushion {
        return BreakevenQuote::Unavailable(NoBreakeven::InsufficientProfit);
    }

    let pips = (summary.total_profit - cushion) / (summary.net_volume.abs() * quote.pip_value);
    let distance = pips * quote.pip_size;

    let level = if summary.net_volume > 0.0 {
        quote.bid - distance
    } else {
        quote.ask + distance
    };

    if level <= 0.0 || !level.is_finite() {
        return BreakevenQuote::Unavailable(NoBreakeven::NonPositiveLevel);
    }
    BreakevenQuote::Level(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MinDistanceUnit;

    fn quote() -> InstrumentQuote {
        InstrumentQuote {
            bid: 1.1050,
            ask: 1.1052,
            pip_size: 0.0001,
            pip_value: 10.0,
            min_stop_distance: 0.0,
            min_target_distance: 0.0,
            min_distance_unit: MinDistanceUnit::Pips,
            tick_size: 0.00001,
            digits: 5,
        }
    }

    fn summary(long_volume: f64, short_volume: f64, total_profit: f64) -> BasketSummary {
        BasketSummary {
            long_count: usize::from(long_volume > 0.0),
            short_count: usize::from(short_volume > 0.0),
            long_volume,
            short_volume,
            net_volume: long_volume - short_volume,
            total_profit,
            ..BasketSummary::default()
        }
    }

    #[test]
    fn net_long_measures_from_bid() {
        let be = calculate_breakeven(&summary(1.0, 0.0, 150.0), &quote(), 0.0);
        let price = be.price().unwrap();
        assert!((price - 1.1035).abs() < 1e-9);
    }

    #[test]
    fn net_short_measures_from_ask() {
        let be = calculate_breakeven(&summary(0.0, 2.0, 100.0), &quote(), 0.0);
        // 100 / (2 * 10) = 5 pips above ask
        assert!((be.price().unwrap() - 1.1057).abs() < 1e-9);
    }

    #[test]
    fn cushion_shrinks_the_distance() {
        let be = calculate_breakeven(&summary(1.0, 0.0, 150.0), &quote(), 50.0);
        assert!((be.price().unwrap() - 1.1040).abs() < 1e-9);
    }

    #[test]
    fn empty_hedged_and_unprofitable_baskets_have_no_level() {
        let q = quote();
        assert_eq!(
            calculate_breakeven(&BasketSummary::default(), &q, 0.0),
            BreakevenQuote::Unavailable(NoBreakeven::EmptyBasket)
        );
        assert_eq!(
            calculate_breakeven(&summary(1.0, 1.0, 500.0), &q, 0.0),
            BreakevenQuote::Unavailable(NoBreakeven::Hedged)
        );
        assert_eq!(
            calculate_breakeven(&summary(1.0, 0.0, -5.0), &q, 0.0),
            BreakevenQuote::Unavailable(NoBreakeven::InsufficientProfit)
        );
        assert_eq!(
            calculate_breakeven(&summary(1.0, 0.0, 30.0), &q, 30.0),
            BreakevenQuote::Unavailable(NoBreakeven::InsufficientProfit)
        );
    }

    #[test]
    fn invalid_quote_short_circuits() {
        let mut q = quote();
        q.bid = 0.0;
        assert_eq!(
            calculate_breakeven(&summary(1.0, 0.0, 150.0), &q, 0.0),
            BreakevenQuote::Unavailable(NoBreakeven::InvalidQuote)
        );
    }

    #[test]
    fn level_below_zero_is_rejected() {
        // 1_000_000 / (1 * 10) pips = 10.0 in price, far below the bid.
        let be = calculate_breakeven(&summary(1.0, 0.0, 1_000_000.0), &quote(), 0.0);
        assert_eq!(be, BreakevenQuote::Unavailable(NoBreakeven::NonPositiveLevel));
    }
}
