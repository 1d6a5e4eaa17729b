//! Iteration and wall-clock budget for a single layout pass.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Bounds on how much work one layout pass may do.
///
/// A pass stops at whichever bound is hit first. Running out of budget is the
/// normal way a pass ends, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBudget {
    /// Maximum number of outer solver iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Wall-clock limit in milliseconds, measured from pass start.
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_time_limit_ms() -> u64 {
    3
}

impl Default for LayoutBudget {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            time_limit_ms: default_time_limit_ms(),
        }
    }
}

impl LayoutBudget {
    /// The limit has millisecond granularity; a partial millisecond rounds
    /// up so a non-zero limit never becomes zero.
    pub fn new(max_iterations: u32, time_limit: Duration) -> Self {
        let millis = time_limit.as_nanos().div_ceil(1_000_000);
        Self {
            max_iterations,
            time_limit_ms: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }

    /// A budget bounded only by iteration count (for deterministic runs).
    pub fn iterations_only(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            time_limit_ms: u64::MAX,
        }
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// Start the clock for a pass.
    pub fn start(&self) -> PassClock {
        PassClock {
            started: Instant::now(),
            budget: *self,
            iterations: 0,
        }
    }
}

/// Monotonic clock for one pass, sampled at the top of each iteration.
#[derive(Debug)]
pub struct PassClock {
    started: Instant,
    budget: LayoutBudget,
    iterations: u32,
}

impl PassClock {
    /// Whether another iteration may start. Counts it when it may.
    pub fn next_iteration(&mut self) -> bool {
        if self.iterations >= self.budget.max_iterations {
            return false;
        }
        if self.started.elapsed() >= self.budget.time_limit() {
            return false;
        }
        self.iterations += 1;
        true
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Summary of the most recent pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Outer iterations completed.
    pub iterations: u32,
    /// Wall-clock time of the whole pass.
    pub elapsed: Duration,
    /// Elements tracked by the registry after reconciliation.
    pub tracked: usize,
    /// Entries written to the position map.
    pub placed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_cap() {
        let mut clock = LayoutBudget::iterations_only(3).start();
        let mut ran = 0;
        while clock.next_iteration() {
            ran += 1;
        }
        assert_eq!(ran, 3);
        assert_eq!(clock.iterations(), 3);
    }

    #[test]
    fn test_zero_time_limit_runs_nothing() {
        let budget = LayoutBudget::new(10, Duration::ZERO);
        let mut clock = budget.start();
        assert!(!clock.next_iteration());
        assert_eq!(clock.iterations(), 0);
    }

    #[test]
    fn test_sub_millisecond_limit_rounds_up() {
        let budget = LayoutBudget::new(10, Duration::from_micros(500));
        assert_eq!(budget.time_limit_ms, 1);
        assert!(budget.start().next_iteration());

        let budget = LayoutBudget::new(10, Duration::from_millis(3));
        assert_eq!(budget.time_limit_ms, 3);
        let budget = LayoutBudget::new(10, Duration::from_micros(3001));
        assert_eq!(budget.time_limit_ms, 4);
    }

    #[test]
    fn test_defaults() {
        let budget = LayoutBudget::default();
        assert_eq!(budget.max_iterations, 10);
        assert_eq!(budget.time_limit(), Duration::from_millis(3));
    }
}
