//! Per-pair bounded sketches: one variant per pair classification.

use std::collections::HashMap;

use crate::stats::{BoundedFrequencyCounter, MomentAccumulator, OnlineCovariance, Reservoir};
use crate::types::Cell;

/// Seed base for pair-level reservoirs; per-stratum samplers offset from it.
pub(crate) const PAIR_SEED: u64 = 42;

/// Numeric-numeric scatter sample size.
const NN_SAMPLE_CAP: usize = 50;
/// Categorical-categorical composite counter cap.
const CC_COMBO_CAP: usize = 200;
/// Numeric-categorical per-group reservoir size.
const NC_SAMPLE_CAP: usize = 30;
/// Distinct groups tracked per numeric-categorical pair; later categories
/// are dropped with a pair-level warning.
pub(crate) const NC_GROUP_CAP: usize = 30;

// ============================================================================
// Numeric - Numeric
// ============================================================================

#[derive(Debug)]
pub struct NnSketch {
    pub cov: OnlineCovariance,
    /// Bounded (x, y) sample for scatter-pattern insight.
    pub scatter: Reservoir<(f64, f64)>,
}

impl NnSketch {
    pub fn new() -> Self {
        Self {
            cov: OnlineCovariance::new(),
            scatter: Reservoir::with_seed(NN_SAMPLE_CAP, PAIR_SEED),
        }
    }

    pub fn update(&mut self, a: &Cell, b: &Cell) {
        let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
            return;
        };
        self.cov.update(x, y);
        self.scatter.update((x, y));
    }

    pub fn estimated_bytes(&self) -> usize {
        self.cov.estimated_bytes() + self.scatter.estimated_bytes()
    }
}

// ============================================================================
// Categorical - Categorical
// ============================================================================

#[derive(Debug)]
pub struct CcSketch {
    /// Composite-key counter; the tuple key sidesteps delimiter collisions
    /// in category labels.
    pub combos: BoundedFrequencyCounter<(String, String)>,
}

impl CcSketch {
    pub fn new() -> Self {
        Self {
            combos: BoundedFrequencyCounter::new(CC_COMBO_CAP),
        }
    }

    pub fn update(&mut self, a: &Cell, b: &Cell) {
        let (Some(ka), Some(kb)) = (a.to_key(), b.to_key()) else {
            return;
        };
        self.combos.update((ka, kb));
    }

    /// Distinct row/column labels and the observed-count matrix.
    pub fn contingency(&self) -> (Vec<String>, Vec<String>, Vec<Vec<u64>>) {
        let mut rows: Vec<String> = Vec::new();
        let mut cols: Vec<String> = Vec::new();
        for ((a, b), _) in self.combos.iter() {
            if !rows.contains(a) {
                rows.push(a.clone());
            }
            if !cols.contains(b) {
                cols.push(b.clone());
            }
        }
        rows.sort();
        cols.sort();

        let mut matrix = vec![vec![0u64; cols.len()]; rows.len()];
        for ((a, b), count) in self.combos.iter() {
            let i = rows.iter().position(|r| r == a).unwrap_or(0);
            let j = cols.iter().position(|c| c == b).unwrap_or(0);
            matrix[i][j] = count;
        }
        (rows, cols, matrix)
    }

    pub fn estimated_bytes(&self) -> usize {
        self.combos.estimated_bytes(|(a, b)| a.len() + b.len())
    }
}

// ============================================================================
// Numeric - Categorical
// ============================================================================

#[derive(Debug)]
pub struct NcSketch {
    /// Per-category moments driving group stats and ANOVA.
    pub groups: HashMap<String, MomentAccumulator>,
    /// Per-category bounded samples, used only by the nonparametric test.
    pub samples: HashMap<String, Reservoir<f64>>,
    /// Insertion order, for deterministic reporting and seed offsets.
    pub group_order: Vec<String>,
    /// Categories dropped after the group cap was reached.
    pub overflowed: u64,
}

impl NcSketch {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            samples: HashMap::new(),
            group_order: Vec::new(),
            overflowed: 0,
        }
    }

    pub fn update(&mut self, numeric: &Cell, categorical: &Cell) {
        let (Some(v), Some(key)) = (numeric.as_f64(), categorical.to_key()) else {
            return;
        };
        if !self.groups.contains_key(&key) {
            if self.group_order.len() >= NC_GROUP_CAP {
                self.overflowed += 1;
                return;
            }
            // Deterministic per-stratum seed offset by arrival order.
            let offset = self.group_order.len() as u64;
            self.groups.insert(key.clone(), MomentAccumulator::new());
            self.samples
                .insert(key.clone(), Reservoir::with_seed(NC_SAMPLE_CAP, PAIR_SEED + offset));
            self.group_order.push(key.clone());
        }
        if let Some(moments) = self.groups.get_mut(&key) {
            moments.update(v);
        }
        if let Some(reservoir) = self.samples.get_mut(&key) {
            reservoir.update(v);
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        let per_group: usize = self
            .samples
            .values()
            .map(Reservoir::estimated_bytes)
            .sum::<usize>()
            + self.groups.len() * std::mem::size_of::<MomentAccumulator>();
        per_group + self.group_order.iter().map(|k| k.len() + 48).sum::<usize>()
    }
}
