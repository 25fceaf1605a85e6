//! Single Breakeven Core: collective breakeven management for a basket of positions.
//!
//! This crate holds the whole decision path:
//! - Domain types (positions, instrument quote, level kinds)
//! - Basket filtering and two-pass profit aggregation
//! - Breakeven price calculation with an optional profit cushion
//! - Per-position stop/target planning against broker minimum distances
//! - Evaluation engine with enable toggle, throttle and dispatch reporting
//! - Notifications and an in-memory paper broker

pub mod basket;
pub mod breakeven;
pub mod config;
pub mod domain;
pub mod engine;
pub mod notify;
pub mod paper;
pub mod planner;

pub use basket::{aggregate, AggregateOptions, BasketSummary, PositionFilter};
pub use breakeven::{calculate_breakeven, BreakevenQuote, NoBreakeven};
pub use config::{
    AdjustToPrice, BreakevenConfig, ConfigError, FilterConfig, NotifyConfig, SideFilter,
};
pub use domain::{InstrumentQuote, LevelKind, MinDistanceUnit, Position, PositionId, PositionSide};
pub use engine::{
    plan_snapshot, BasketPlan, BreakevenEngine, DispatchError, DispatchRecord, DispatchStatus,
    EvaluationOutcome, EvaluationReport, MarketSnapshot, PositionSource, SourceError,
    UpdateDispatcher,
};
pub use planner::{
    plan_adjustments, AdjustmentAction, AdjustmentDecision, DecisionReason, PlannerSettings,
};
