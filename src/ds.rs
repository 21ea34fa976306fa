use crate::util::{finite_or_zero, near_max_indices};

/// A dense table of action values, one row of `n_actions` entries per state
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    /// Construct a table of zeros
    pub fn new(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// The action values of `state`, or an empty slice if `state` is out of range
    pub fn row(&self, state: usize) -> &[f64] {
        if state >= self.n_states {
            return &[];
        }
        let start = state * self.n_actions;
        &self.values[start..start + self.n_actions]
    }

    /// The value of `(state, action)`, with non-finite and missing entries read as 0
    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.row(state)
            .get(action)
            .copied()
            .map(finite_or_zero)
            .unwrap_or_default()
    }

    /// Overwrite the value of `(state, action)`
    ///
    /// **Returns** `false` and leaves the table unchanged if `value` is not finite
    /// or the pair is out of range.
    pub fn set(&mut self, state: usize, action: usize, value: f64) -> bool {
        if !value.is_finite() || state >= self.n_states || action >= self.n_actions {
            log::trace!("discarding update of ({state}, {action}) to {value}");
            return false;
        }
        self.values[state * self.n_actions + action] = value;
        true
    }

    /// Move `Q(state, action)` towards `target` with step size `alpha`
    ///
    /// The update is skipped unless both the target and the current value are finite.
    pub fn update(&mut self, state: usize, action: usize, target: f64, alpha: f64) -> bool {
        let Some(&current) = self.row(state).get(action) else {
            return false;
        };
        if !target.is_finite() || !current.is_finite() {
            log::trace!("discarding non-finite target {target} for ({state}, {action})");
            return false;
        }
        self.set(state, action, current + alpha * (target - current))
    }

    /// The largest finite value in the row of `state`, or 0 if there is none
    pub fn max(&self, state: usize) -> f64 {
        let max = self
            .row(state)
            .iter()
            .copied()
            .filter(|x| x.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        finite_or_zero(max)
    }

    /// The lowest-index action within tolerance of the row maximum, or `None` if the row
    /// holds no finite value
    pub fn greedy_action(&self, state: usize) -> Option<usize> {
        near_max_indices(self.row(state)).first().copied()
    }

    /// The greedy action of every state; rows without a finite value map to action 0
    pub fn greedy_policy(&self) -> Vec<usize> {
        (0..self.n_states)
            .map(|s| self.greedy_action(s).unwrap_or_default())
            .collect()
    }

    /// The state value implied by the table, `max_a Q(s, a)`, for every state
    pub fn state_values(&self) -> Vec<f64> {
        (0..self.n_states).map(|s| self.max(s)).collect()
    }
}
