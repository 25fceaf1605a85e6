use chrono::{DateTime, Duration, Utc};

/// State carried from one evaluation to the next: the enable toggle and the
/// throttle timestamp.
///
/// One context per instrument. Mutated only through `&mut self`, so a host
/// that evaluates from several threads has to put the owning engine behind a
/// `Mutex`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    enabled: bool,
    delay: Duration,
    last_adjustment: DateTime<Utc>,
}

impl EvaluationContext {
    /// The throttle starts one full delay in the past so the first tick runs.
    pub fn new(enabled: bool, delay: Duration, started_at: DateTime<Utc>) -> Self {
        let last_adjustment = started_at
            .checked_sub_signed(delay)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            enabled,
            delay,
            last_adjustment,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip the enable toggle and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn last_adjustment(&self) -> DateTime<Utc> {
        self.last_adjustment
    }

    /// Earliest instant the next evaluation may run.
    pub fn next_allowed(&self) -> DateTime<Utc> {
        self.last_adjustment
            .checked_add_signed(self.delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_throttled(&self, now: DateTime<Utc>) -> bool {
        now < self.next_allowed()
    }

    pub fn mark_adjusted(&mut self, now: DateTime<Utc>) {
        self.last_adjustment = now;
    }
}
