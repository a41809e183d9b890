//! Weighted choice over a small table of options

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::{ScenarioError, ScenarioResult};

/// A fixed table of `(weight, option)` pairs.
///
/// Weights are relative and need not sum to one. Every random branch in the
/// generator (tier choice, scheduler interval bucket) goes through this one
/// primitive so each distribution can be tested on its own.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    options: Vec<T>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl<T> WeightedTable<T> {
    /// Build a table; fails on an empty table, negative or non-finite
    /// weights, or all-zero weights
    pub fn new(entries: Vec<(f64, T)>) -> ScenarioResult<Self> {
        if entries.iter().any(|(w, _)| !w.is_finite()) {
            return Err(ScenarioError::InvalidTable("non-finite weight".to_string()));
        }
        let (weights, options): (Vec<f64>, Vec<T>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(&weights)
            .map_err(|e| ScenarioError::InvalidTable(e.to_string()))?;
        Ok(Self { options, weights, index })
    }

    /// Pick one option
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.options[self.index.sample(rng)]
    }

    /// Probability of the option at `i` (weight / total weight)
    pub fn probability(&self, i: usize) -> f64 {
        let total: f64 = self.weights.iter().sum();
        self.weights.get(i).map(|w| w / total).unwrap_or(0.0)
    }

    /// Options in table order
    pub fn options(&self) -> &[T] {
        &self.options
    }
}
