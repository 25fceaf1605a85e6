//! Evaluation engine: one tick of the single-breakeven loop.
//!
//! Each tick runs to completion:
//!
//! 1. Gate: enable toggle, then the throttle window
//! 2. Snapshot: positions and quote, fetched once
//! 3. Aggregate → breakeven → trigger check
//! 4. Plan one decision per eligible position
//! 5. Dispatch every change, notify on success, log on failure
//!
//! A rejected change is never retried within the tick. The next tick
//! recomputes from scratch and tries again if the level is still warranted.
//! The throttle is stamped only when a tick reaches step 4.

pub mod context;
pub mod platform;

pub use context::EvaluationContext;
pub use platform::{
    AdjustmentApplied, AdjustmentListener, DispatchError, MarketSnapshot, NoListener,
    PositionSource, SourceError, UpdateDispatcher,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::basket::{aggregate, AggregateOptions, BasketSummary, PositionFilter};
use crate::breakeven::{calculate_breakeven, BreakevenQuote, NoBreakeven};
use crate::config::BreakevenConfig;
use crate::domain::{LevelKind, PositionId, PositionSide};
use crate::planner::{plan_adjustments, trigger_met, AdjustmentDecision, PlannerSettings};

/// How a tick ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum EvaluationOutcome {
    Disabled,
    Throttled { next_allowed: DateTime<Utc> },
    SnapshotUnavailable { error: String },
    NoBreakeven { reason: NoBreakeven },
    BelowTrigger { total_profit: f64 },
    Evaluated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DispatchStatus {
    Applied,
    Rejected { error: DispatchError },
}

/// One dispatched change and what the broker said about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub position_id: PositionId,
    pub side: PositionSide,
    pub kind: LevelKind,
    pub price: f64,
    /// Level held before the change, unset read as 0.
    pub previous: f64,
    pub status: DispatchStatus,
}

impl DispatchRecord {
    pub fn is_applied(&self) -> bool {
        self.status == DispatchStatus::Applied
    }
}

/// Pure result of evaluating a snapshot, before any dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketPlan {
    pub summary: BasketSummary,
    pub breakeven: BreakevenQuote,
    pub trigger_met: bool,
    /// Empty when there is no breakeven or the trigger is not met.
    pub decisions: Vec<AdjustmentDecision>,
}

/// Everything a tick did, for logs, JSON output and journals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub at: DateTime<Utc>,
    pub symbol: String,
    pub outcome: EvaluationOutcome,
    pub plan: Option<BasketPlan>,
    pub dispatches: Vec<DispatchRecord>,
}

impl EvaluationReport {
    fn skipped(at: DateTime<Utc>, symbol: &str, outcome: EvaluationOutcome) -> Self {
        Self {
            at,
            symbol: symbol.to_string(),
            outcome,
            plan: None,
            dispatches: Vec::new(),
        }
    }

    pub fn breakeven(&self) -> Option<f64> {
        self.plan.as_ref().and_then(|p| p.breakeven.price())
    }

    pub fn applied_count(&self) -> usize {
        self.dispatches.iter().filter(|d| d.is_applied()).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.dispatches.len() - self.applied_count()
    }
}

/// Evaluate a snapshot without touching the platform.
pub fn plan_snapshot(config: &BreakevenConfig, snapshot: &MarketSnapshot) -> BasketPlan {
    let eligible = PositionFilter::from_config(config).select(&snapshot.positions);
    let summary = aggregate(&eligible, &snapshot.quote, AggregateOptions::from(config));
    let breakeven = calculate_breakeven(&summary, &snapshot.quote, config.additional_profit);
    let settings = PlannerSettings::from(config);
    let trigger_met = trigger_met(&summary, &settings);

    let decisions = if breakeven.is_available() && trigger_met {
        plan_adjustments(&breakeven, &eligible, &summary, &snapshot.quote, settings)
    } else {
        Vec::new()
    };

    BasketPlan {
        summary,
        breakeven,
        trigger_met,
        decisions,
    }
}

/// Single-breakeven engine for one instrument.
#[derive(Debug, Clone)]
pub struct BreakevenEngine {
    config: BreakevenConfig,
    context: EvaluationContext,
}

impl BreakevenEngine {
    pub fn new(config: BreakevenConfig, started_at: DateTime<Utc>) -> Self {
        let context = EvaluationContext::new(config.enabled, config.delay(), started_at);
        Self { config, context }
    }

    pub fn config(&self) -> &BreakevenConfig {
        &self.config
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// User command: flip the enable toggle. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        let enabled = self.context.toggle();
        tracing::info!(
            symbol = %self.config.symbol,
            enabled,
            "Single breakeven {}",
            if enabled { "enabled" } else { "disabled" }
        );
        enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.context.set_enabled(enabled);
    }

    /// Full tick against a live platform: gate, fetch, evaluate, dispatch.
    pub fn on_tick<P>(
        &mut self,
        now: DateTime<Utc>,
        platform: &mut P,
        listener: &mut dyn AdjustmentListener,
    ) -> EvaluationReport
    where
        P: PositionSource + UpdateDispatcher + ?Sized,
    {
        if let Some(outcome) = self.gate(now) {
            return EvaluationReport::skipped(now, &self.config.symbol, outcome);
        }
        let snapshot = match platform.snapshot(&self.config.symbol) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(symbol = %self.config.symbol, error = %err, "Snapshot unavailable");
                return EvaluationReport::skipped(
                    now,
                    &self.config.symbol,
                    EvaluationOutcome::SnapshotUnavailable { error: err.to_string() },
                );
            }
        };
        self.run(now, &snapshot, platform, listener)
    }

    /// Tick against an already-fetched snapshot.
    pub fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        snapshot: &MarketSnapshot,
        dispatcher: &mut dyn UpdateDispatcher,
        listener: &mut dyn AdjustmentListener,
    ) -> EvaluationReport {
        if let Some(outcome) = self.gate(now) {
            return EvaluationReport::skipped(now, &self.config.symbol, outcome);
        }
        self.run(now, snapshot, dispatcher, listener)
    }

    fn gate(&self, now: DateTime<Utc>) -> Option<EvaluationOutcome> {
        if !self.context.is_enabled() {
            return Some(EvaluationOutcome::Disabled);
        }
        if self.context.is_throttled(now) {
            tracing::debug!(
                symbol = %self.config.symbol,
                next_allowed = %self.context.next_allowed(),
                "Throttled"
            );
            return Some(EvaluationOutcome::Throttled {
                next_allowed: self.context.next_allowed(),
            });
        }
        None
    }

    fn run<D>(
        &mut self,
        now: DateTime<Utc>,
        snapshot: &MarketSnapshot,
        dispatcher: &mut D,
        listener: &mut dyn AdjustmentListener,
    ) -> EvaluationReport
    where
        D: UpdateDispatcher + ?Sized,
    {
        let symbol = self.config.symbol.clone();
        let plan = plan_snapshot(&self.config, snapshot);

        if let BreakevenQuote::Unavailable(reason) = plan.breakeven {
            tracing::debug!(symbol = %symbol, reason = reason.describe(), "No breakeven");
            return EvaluationReport {
                at: now,
                symbol,
                outcome: EvaluationOutcome::NoBreakeven { reason },
                plan: Some(plan),
                dispatches: Vec::new(),
            };
        }
        if !plan.trigger_met {
            tracing::debug!(
                symbol = %symbol,
                total_profit = plan.summary.total_profit,
                trigger = self.config.profit_to_trigger,
                "Basket profit below trigger"
            );
            return EvaluationReport {
                at: now,
                symbol,
                outcome: EvaluationOutcome::BelowTrigger {
                    total_profit: plan.summary.total_profit,
                },
                plan: Some(plan),
                dispatches: Vec::new(),
            };
        }

        let digits = snapshot.quote.digits as usize;
        let mut dispatches = Vec::new();
        for decision in &plan.decisions {
            let (Some(kind), Some(price)) = (decision.action.kind(), decision.action.price())
            else {
                continue;
            };
            let position = snapshot.position(decision.position_id);
            let previous = position
                .map(|p| match kind {
                    LevelKind::Stop => p.stop_or_zero(),
                    LevelKind::Target => p.target_or_zero(),
                })
                .unwrap_or(0.0);

            let status = match dispatcher.request_update(decision.position_id, kind, price) {
                Ok(()) => {
                    tracing::info!(
                        symbol = %symbol,
                        position = %decision.position_id,
                        side = decision.side.label(),
                        "Success setting collective breakeven: new {} = {:.*}",
                        kind.display_name().to_lowercase(),
                        digits,
                        price
                    );
                    listener.on_adjustment_applied(&AdjustmentApplied {
                        position_id: decision.position_id,
                        kind,
                        price,
                        symbol: symbol.clone(),
                    });
                    DispatchStatus::Applied
                }
                Err(error) => {
                    tracing::warn!(
                        symbol = %symbol,
                        position = %decision.position_id,
                        side = decision.side.label(),
                        error = %error,
                        open_price =
                            %format!("{:.*}", digits, position.map_or(0.0, |p| p.entry_price)),
                        old = %format!("{:.*}", digits, previous),
                        new = %format!("{:.*}", digits, price),
                        bid = snapshot.quote.bid,
                        ask = snapshot.quote.ask,
                        "Error setting collective breakeven ({})",
                        kind.short_name()
                    );
                    DispatchStatus::Rejected { error }
                }
            };
            dispatches.push(DispatchRecord {
                position_id: decision.position_id,
                side: decision.side,
                kind,
                price,
                previous,
                status,
            });
        }

        self.context.mark_adjusted(now);
        EvaluationReport {
            at: now,
            symbol,
            outcome: EvaluationOutcome::Evaluated,
            plan: Some(plan),
            dispatches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstrumentQuote, MinDistanceUnit, Position};
    use crate::planner::AdjustmentAction;
    use chrono::{Duration, TimeZone};

    struct Recorder {
        calls: Vec<(PositionId, LevelKind, f64)>,
        fail: bool,
    }

    impl UpdateDispatcher for Recorder {
        fn request_stop_update(&mut self, id: PositionId, price: f64) -> Result<(), DispatchError> {
            self.calls.push((id, LevelKind::Stop, price));
            if self.fail {
                Err(DispatchError::Rejected("requote".into()))
            } else {
                Ok(())
            }
        }

        fn request_target_update(
            &mut self,
            id: PositionId,
            price: f64,
        ) -> Result<(), DispatchError> {
            self.calls.push((id, LevelKind::Target, price));
            Ok(())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn snapshot(profit: f64) -> MarketSnapshot {
        MarketSnapshot {
            positions: vec![Position::new_long(1, "EURUSD", 1.1, 1.0).with_profit(profit)],
            quote: InstrumentQuote {
                bid: 1.1050,
                ask: 1.1052,
                pip_size: 0.0001,
                pip_value: 10.0,
                min_stop_distance: 0.0,
                min_target_distance: 0.0,
                min_distance_unit: MinDistanceUnit::Pips,
                tick_size: 0.00001,
                digits: 5,
            },
        }
    }

    fn engine() -> BreakevenEngine {
        let mut config = BreakevenConfig::for_symbol("EURUSD");
        config.enabled = true;
        config.adjust_to_price = crate::config::AdjustToPrice::Off;
        BreakevenEngine::new(config, t0())
    }

    #[test]
    fn disabled_engine_does_nothing() {
        let mut engine = engine();
        engine.set_enabled(false);
        let mut rec = Recorder { calls: vec![], fail: false };
        let report = engine.evaluate(t0(), &snapshot(150.0), &mut rec, &mut NoListener);
        assert_eq!(report.outcome, EvaluationOutcome::Disabled);
        assert!(rec.calls.is_empty());
    }

    #[test]
    fn plan_snapshot_is_pure() {
        let engine = engine();
        let snap = snapshot(150.0);
        let a = plan_snapshot(engine.config(), &snap);
        let b = plan_snapshot(engine.config(), &snap);
        assert_eq!(a, b);
        assert_eq!(a.decisions.len(), 1);
    }

    #[test]
    fn rejection_is_recorded_and_not_notified() {
        let mut engine = engine();
        let mut rec = Recorder { calls: vec![], fail: true };
        let mut events: Vec<AdjustmentApplied> = Vec::new();
        let report = engine.evaluate(t0(), &snapshot(150.0), &mut rec, &mut events);

        assert_eq!(report.outcome, EvaluationOutcome::Evaluated);
        assert_eq!(rec.calls.len(), 1);
        assert_eq!(report.rejected_count(), 1);
        assert!(events.is_empty());
        // The tick still counts as an adjustment for the throttle.
        assert_eq!(engine.context().last_adjustment(), t0());
    }

    #[test]
    fn non_positive_tick_size_never_dispatches() {
        let engine = engine();
        let mut snap = snapshot(150.0);
        let plan = plan_snapshot(engine.config(), &snap);
        assert_eq!(plan.decisions[0].action, AdjustmentAction::SetStop(1.1035));

        // Applying the level and planning again is a no-op on a valid quote.
        snap.positions[0].current_stop = Some(1.1035);
        let again = plan_snapshot(engine.config(), &snap);
        assert!(again.decisions[0].action.is_no_action());

        // A negative tick would defeat the half-tick comparison, so it has no breakeven.
        snap.quote.tick_size = -0.00001;
        let plan = plan_snapshot(engine.config(), &snap);
        assert_eq!(plan.breakeven, BreakevenQuote::Unavailable(NoBreakeven::InvalidQuote));
        assert!(plan.decisions.is_empty());
    }

    #[test]
    fn report_serializes_with_tagged_variants() {
        let mut engine = engine();
        let mut rec = Recorder { calls: vec![], fail: true };
        let report = engine.evaluate(t0(), &snapshot(150.0), &mut rec, &mut NoListener);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"]["outcome"], "evaluated");
        assert_eq!(value["plan"]["breakeven"]["kind"], "level");
        assert!((value["plan"]["breakeven"]["value"].as_f64().unwrap() - 1.1035).abs() < 1e-9);
        assert_eq!(value["plan"]["decisions"][0]["action"]["action"], "set_stop");
        assert_eq!(value["plan"]["decisions"][0]["action"]["price"], 1.1035);
        assert_eq!(value["dispatches"][0]["status"]["status"], "rejected");

        let back: EvaluationReport = serde_json::from_value(value).unwrap();
        assert_eq!(back.outcome, report.outcome);
        assert_eq!(back.dispatches[0].status, report.dispatches[0].status);
        assert_eq!(back.rejected_count(), 1);
    }

    #[test]
    fn skipped_outcomes_serialize_their_fields() {
        let throttled = EvaluationOutcome::Throttled { next_allowed: t0() };
        let value = serde_json::to_value(&throttled).unwrap();
        assert_eq!(value["outcome"], "throttled");
        assert_eq!(value["next_allowed"], "2025-03-03T09:00:00Z");

        let none = EvaluationOutcome::NoBreakeven { reason: NoBreakeven::Hedged };
        let value = serde_json::to_value(&none).unwrap();
        assert_eq!(value["reason"], "hedged");

        let missing = BreakevenQuote::Unavailable(NoBreakeven::EmptyBasket);
        let value = serde_json::to_value(missing).unwrap();
        assert_eq!(value["kind"], "unavailable");
        assert_eq!(value["value"], "empty_basket");
        assert_eq!(serde_json::from_value::<BreakevenQuote>(value).unwrap(), missing);
    }

    #[test]
    fn below_trigger_does_not_stamp_throttle() {
        let mut engine = engine();
        let mut rec = Recorder { calls: vec![], fail: false };
        let report = engine.evaluate(t0(), &snapshot(50.0), &mut rec, &mut NoListener);
        assert!(matches!(report.outcome, EvaluationOutcome::BelowTrigger { .. }));
        assert_eq!(engine.context().last_adjustment(), t0() - Duration::seconds(60));
    }
}
