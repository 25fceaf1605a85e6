//! Adjustment planning: turn the basket breakeven into per-position decisions.
//!
//! For every eligible position the planner picks exactly one of:
//! - `SetStop`: the level sits on the losing side of the market for that side
//! - `SetTarget`: the level sits on the winning side of the market
//! - `NoAction`: no breakeven, trigger not met, too close to the market,
//!   or the position already holds the level
//!
//! The planner only classifies. Dispatch and its failures belong to the engine.

pub mod guards;

pub use guards::{classify_level, GuardLevels};

use serde::{Deserialize, Serialize};

use crate::basket::BasketSummary;
use crate::breakeven::{BreakevenQuote, NoBreakeven};
use crate::config::{AdjustToPrice, BreakevenConfig};
use crate::domain::{InstrumentQuote, LevelKind, Position, PositionId, PositionSide};

/// What to do with one position this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "price")]
pub enum AdjustmentAction {
    SetStop(f64),
    SetTarget(f64),
    NoAction,
}

impl AdjustmentAction {
    pub fn kind(&self) -> Option<LevelKind> {
        match self {
            AdjustmentAction::SetStop(_) => Some(LevelKind::Stop),
            AdjustmentAction::SetTarget(_) => Some(LevelKind::Target),
            AdjustmentAction::NoAction => None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            AdjustmentAction::SetStop(p) | AdjustmentAction::SetTarget(p) => Some(*p),
            AdjustmentAction::NoAction => None,
        }
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, AdjustmentAction::NoAction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    MoveToBreakeven,
    NoBreakeven(NoBreakeven),
    BelowTrigger,
    TooCloseToMarket,
    AlreadyAtLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentDecision {
    pub position_id: PositionId,
    pub side: PositionSide,
    pub action: AdjustmentAction,
    pub reason: DecisionReason,
}

impl AdjustmentDecision {
    fn no_action(position: &Position, reason: DecisionReason) -> Self {
        Self {
            position_id: position.id,
            side: position.side,
            action: AdjustmentAction::NoAction,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerSettings {
    pub adjust_to_price: AdjustToPrice,
    pub profit_to_trigger: f64,
}

impl From<&BreakevenConfig> for PlannerSettings {
    fn from(config: &BreakevenConfig) -> Self {
        Self {
            adjust_to_price: config.adjust_to_price,
            profit_to_trigger: config.profit_to_trigger,
        }
    }
}

/// True once the basket earns enough to lock a breakeven in.
pub fn trigger_met(summary: &BasketSummary, settings: &PlannerSettings) -> bool {
    summary.total_profit >= settings.profit_to_trigger
}

/// Candidate level for one side after the spread correction.
///
/// With both sides open, the opposite side closes against the other price,
/// so a long's exit is discounted by the spread when adjusting to ask, and a
/// short's exit is raised by the spread when adjusting to bid.
pub fn side_candidate(
    side: PositionSide,
    breakeven: f64,
    summary: &BasketSummary,
    quote: &InstrumentQuote,
    adjust_to_price: AdjustToPrice,
) -> f64 {
    let spread = quote.spread_pips() * quote.pip_size;
    match (side, adjust_to_price) {
        (PositionSide::Long, AdjustToPrice::Ask) if summary.has_shorts() => breakeven - spread,
        (PositionSide::Short, AdjustToPrice::Bid) if summary.has_longs() => breakeven + spread,
        _ => breakeven,
    }
}

/// Plan one decision per eligible position.
pub fn plan_adjustments(
    breakeven: &BreakevenQuote,
    positions: &[&Position],
    summary: &BasketSummary,
    quote: &InstrumentQuote,
    settings: PlannerSettings,
) -> Vec<AdjustmentDecision> {
    let level = match breakeven {
        BreakevenQuote::Level(level) => *level,
        BreakevenQuote::Unavailable(why) => {
            return positions
                .iter()
                .map(|p| AdjustmentDecision::no_action(p, DecisionReason::NoBreakeven(*why)))
                .collect();
        }
    };
    if !trigger_met(summary, &settings) {
        return positions
            .iter()
            .map(|p| AdjustmentDecision::no_action(p, DecisionReason::BelowTrigger))
            .collect();
    }

    let guards = GuardLevels::from_quote(quote);
    positions
        .iter()
        .map(|p| plan_position(p, level, summary, quote, &guards, settings.adjust_to_price))
        .collect()
}

fn plan_position(
    position: &Position,
    level: f64,
    summary: &BasketSummary,
    quote: &InstrumentQuote,
    guards: &GuardLevels,
    adjust_to_price: AdjustToPrice,
) -> AdjustmentDecision {
    let candidate = side_candidate(position.side, level, summary, quote, adjust_to_price);

    let Some(kind) = classify_level(position.side, candidate, guards) else {
        return AdjustmentDecision::no_action(position, DecisionReason::TooCloseToMarket);
    };

    let price = quote.round_price(candidate);
    let current = match kind {
        LevelKind::Stop => position.stop_or_zero(),
        LevelKind::Target => position.target_or_zero(),
    };
    if quote.same_level(price, current) {
        return AdjustmentDecision::no_action(position, DecisionReason::AlreadyAtLevel);
    }

    let action = match kind {
        LevelKind::Stop => AdjustmentAction::SetStop(price),
        LevelKind::Target => AdjustmentAction::SetTarget(price),
    };
    AdjustmentDecision {
        position_id: position.id,
        side: position.side,
        action,
        reason: DecisionReason::MoveToBreakeven,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::{aggregate, AggregateOptions};
    use crate::breakeven::calculate_breakeven;
    use crate::domain::MinDistanceUnit;

    fn quote() -> InstrumentQuote {
        InstrumentQuote {
            bid: 1.10500,
            ask: 1.10520,
            pip_size: 0.0001,
            pip_value: 10.0,
            min_stop_distance: 5.0,
            min_target_distance: 5.0,
            min_distance_unit: MinDistanceUnit::Pips,
            tick_size: 0.00001,
            digits: 5,
        }
    }

    fn settings(adjust_to_price: AdjustToPrice) -> PlannerSettings {
        PlannerSettings { adjust_to_price, profit_to_trigger: 100.0 }
    }

    fn summary_for(positions: &[&Position], adjust_to_price: AdjustToPrice) -> BasketSummary {
        aggregate(
            positions,
            &quote(),
            AggregateOptions { adjust_to_price, include_swaps_commission: false },
        )
    }

    #[test]
    fn unavailable_breakeven_means_no_action_everywhere() {
        let a = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(150.0);
        let b = Position::new_short(2, "EURUSD", 1.1, 1.0).with_profit(10.0);
        let positions = [&a, &b];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = BreakevenQuote::Unavailable(NoBreakeven::Hedged);

        let decisions =
            plan_adjustments(&be, &positions, &summary, &quote(), settings(AdjustToPrice::Off));
        assert_eq!(decisions.len(), 2);
        for d in decisions {
            assert_eq!(d.action, AdjustmentAction::NoAction);
            assert_eq!(d.reason, DecisionReason::NoBreakeven(NoBreakeven::Hedged));
        }
    }

    #[test]
    fn below_trigger_means_no_action() {
        let a = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(50.0);
        let positions = [&a];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = calculate_breakeven(&summary, &quote(), 0.0);
        assert!(be.is_available());

        let decisions =
            plan_adjustments(&be, &positions, &summary, &quote(), settings(AdjustToPrice::Off));
        assert_eq!(decisions[0].reason, DecisionReason::BelowTrigger);
    }

    #[test]
    fn long_level_below_market_becomes_stop() {
        let a = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(150.0);
        let positions = [&a];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = calculate_breakeven(&summary, &quote(), 0.0);

        let d =
            &plan_adjustments(&be, &positions, &summary, &quote(), settings(AdjustToPrice::Off))[0];
        assert_eq!(d.action.kind(), Some(LevelKind::Stop));
        assert!((d.action.price().unwrap() - 1.1035).abs() < 1e-9);
        assert_eq!(d.reason, DecisionReason::MoveToBreakeven);
    }

    #[test]
    fn long_level_above_market_becomes_target() {
        // Net short basket: the level sits above the ask, which is a target for the long.
        let long = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(-20.0);
        let short = Position::new_short(2, "EURUSD", 1.12, 3.0).with_profit(220.0);
        let positions = [&long, &short];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = calculate_breakeven(&summary, &quote(), 0.0);
        // 200 / (2 * 10) = 10 pips above ask
        assert!((be.price().unwrap() - 1.1062).abs() < 1e-9);

        let decisions =
            plan_adjustments(&be, &positions, &summary, &quote(), settings(AdjustToPrice::Off));
        assert_eq!(decisions[0].action, AdjustmentAction::SetTarget(1.1062));
        assert_eq!(decisions[1].action, AdjustmentAction::SetStop(1.1062));
    }

    #[test]
    fn level_inside_guard_band_is_too_close() {
        // 30 / 10 = 3 pips below bid, inside the 5 pip stop distance.
        let a = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(130.0);
        let positions = [&a];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = calculate_breakeven(&summary, &quote(), 100.0);

        let d = &plan_adjustments(
            &be,
            &positions,
            &summary,
            &quote(),
            PlannerSettings { adjust_to_price: AdjustToPrice::Off, profit_to_trigger: 0.0 },
        )[0];
        assert_eq!(d.action, AdjustmentAction::NoAction);
        assert_eq!(d.reason, DecisionReason::TooCloseToMarket);
    }

    #[test]
    fn existing_level_within_half_tick_is_left_alone() {
        let mut a = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(150.0);
        a.current_stop = Some(1.103_504);
        let positions = [&a];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = calculate_breakeven(&summary, &quote(), 0.0);

        let d =
            &plan_adjustments(&be, &positions, &summary, &quote(), settings(AdjustToPrice::Off))[0];
        assert_eq!(d.reason, DecisionReason::AlreadyAtLevel);
    }

    #[test]
    fn target_compare_ignores_the_stop() {
        let mut long = Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(-20.0);
        long.current_stop = Some(1.1062);
        let mut short = Position::new_short(2, "EURUSD", 1.12, 3.0).with_profit(220.0);
        short.current_target = Some(1.1062);
        let positions = [&long, &short];
        let summary = summary_for(&positions, AdjustToPrice::Off);
        let be = calculate_breakeven(&summary, &quote(), 0.0);

        let decisions =
            plan_adjustments(&be, &positions, &summary, &quote(), settings(AdjustToPrice::Off));
        // Long needs a target, its stop is irrelevant.
        assert_eq!(decisions[0].action, AdjustmentAction::SetTarget(1.1062));
        // Short needs a stop, its target is irrelevant.
        assert_eq!(decisions[1].action, AdjustmentAction::SetStop(1.1062));
    }

    #[test]
    fn side_candidate_applies_spread_only_with_opposite_side() {
        let q = quote();
        let both = BasketSummary { long_count: 1, short_count: 1, ..Default::default() };
        let longs_only = BasketSummary { long_count: 2, ..Default::default() };
        let shorts_only = BasketSummary { short_count: 2, ..Default::default() };
        let spread = 0.0002;

        let c = side_candidate(PositionSide::Long, 1.2, &both, &q, AdjustToPrice::Ask);
        assert!((c - (1.2 - spread)).abs() < 1e-12);
        let c = side_candidate(PositionSide::Long, 1.2, &longs_only, &q, AdjustToPrice::Ask);
        assert_eq!(c, 1.2);
        let c = side_candidate(PositionSide::Long, 1.2, &both, &q, AdjustToPrice::Bid);
        assert_eq!(c, 1.2);

        let c = side_candidate(PositionSide::Short, 1.2, &both, &q, AdjustToPrice::Bid);
        assert!((c - (1.2 + spread)).abs() < 1e-12);
        let c = side_candidate(PositionSide::Short, 1.2, &shorts_only, &q, AdjustToPrice::Bid);
        assert_eq!(c, 1.2);
        let c = side_candidate(PositionSide::Short, 1.2, &both, &q, AdjustToPrice::Off);
        assert_eq!(c, 1.2);
    }
}
