/*!
 * Run-wide budget enforcement.
 *
 * The budget guard owns the only state mutated by more than one concurrently
 * running job. Every mutation goes through a single mutex so two jobs can
 * never both conclude that a ceiling has not yet been crossed.
 *
 * Ceilings are checked before dispatch, never enforced mid-call: an in-flight
 * remote call always completes, so the cost ceiling can overshoot by at most
 * one batch's actual spend.
 */

use parking_lot::Mutex;

/// Configured run-wide ceilings
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetLimits {
    /// Maximum number of strings dispatched across the whole run
    pub max_strings_total: Option<u64>,

    /// Maximum modeled cost in USD across the whole run
    pub max_cost: Option<f64>,
}

/// Point-in-time view of the budget counters
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetSnapshot {
    /// Strings dispatched to the model so far
    pub strings_dispatched: u64,

    /// Modeled cost accumulated so far, in USD
    pub cost: f64,
}

#[derive(Debug, Default)]
struct BudgetState {
    strings_dispatched: u64,
    cost: f64,
    aborted: bool,
}

/// Shared budget counters for one run
#[derive(Debug)]
pub struct RunBudget {
    limits: BudgetLimits,
    state: Mutex<BudgetState>,
}

impl RunBudget {
    /// Create a budget with the given ceilings
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(BudgetState::default()),
        }
    }

    /// Reserve up to `requested` strings for dispatch.
    ///
    /// Returns how many of them the global allowance still covers; a batch
    /// is trimmed to the granted count. Returns 0 once the allowance is
    /// spent, the cost ceiling is reached, or the run was aborted.
    pub fn take_strings(&self, requested: usize) -> usize {
        let mut state = self.state.lock();

        if state.aborted || self.cost_reached(&state) {
            return 0;
        }

        let granted = match self.limits.max_strings_total {
            Some(max) => {
                let remaining = max.saturating_sub(state.strings_dispatched);
                (requested as u64).min(remaining) as usize
            }
            None => requested,
        };

        state.strings_dispatched += granted as u64;
        granted
    }

    /// Record one batch's observed cost
    pub fn record_cost(&self, cost: f64) {
        let mut state = self.state.lock();
        state.cost += cost;
    }

    /// Whether a new batch may be dispatched at all
    pub fn may_dispatch(&self) -> bool {
        let state = self.state.lock();
        !state.aborted && !self.cost_reached(&state)
    }

    /// Stop all further dispatch across every job. In-flight calls complete.
    pub fn abort(&self) {
        self.state.lock().aborted = true;
    }

    /// Whether the run was aborted
    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    /// Current counter values
    pub fn snapshot(&self) -> BudgetSnapshot {
        let state = self.state.lock();
        BudgetSnapshot {
            strings_dispatched: state.strings_dispatched,
            cost: state.cost,
        }
    }

    fn cost_reached(&self, state: &BudgetState) -> bool {
        match self.limits.max_cost {
            Some(max) => state.cost >= max,
            None => false,
        }
    }
}
