//! FaLaw Kernel: Transfer Matrix
//!
//! 8×8 retention/transfer table. Row `i` says how element `i` distributes
//! its influence: the diagonal is what it keeps, the off-diagonals what it
//! passes on. Every row sums to 1 and keeps at least half for itself.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arithmetic::EPSILON;
use crate::config::MatrixSeed;
use crate::element::{Element, ELEMENT_COUNT};
use crate::error::{KernelError, KernelResult};
use crate::invariants::{try_check_row, try_validate_matrix};

/// Lower bound on every diagonal entry.
pub const MIN_SELF_RETENTION: f64 = 0.5;

pub type Row = [f64; ELEMENT_COUNT];
pub type Cells = [Row; ELEMENT_COUNT];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Cells", into = "Cells")]
pub struct TransferMatrix {
    cells: Cells,
}

impl TransferMatrix {
    /// Build from seed tables, repair every row, then validate.
    ///
    /// Fails with `Configuration` if the seed does not cover all eight
    /// elements or sets a diagonal through the outflow table.
    pub fn build(seed: &MatrixSeed) -> KernelResult<Self> {
        let mut cells = [[0.0; ELEMENT_COUNT]; ELEMENT_COUNT];

        for element in Element::ALL {
            let retention = seed.self_retention.get(&element).ok_or_else(|| {
                KernelError::Configuration(format!(
                    "self_retention table does not cover element {}",
                    element
                ))
            })?;
            cells[element.index()][element.index()] = *retention;
        }

        for (source, targets) in &seed.outflows {
            for (target, weight) in targets {
                if source == target {
                    return Err(KernelError::Configuration(format!(
                        "outflow table sets diagonal cell {} -> {}",
                        source, target
                    )));
                }
                cells[source.index()][target.index()] = *weight;
            }
        }

        for pair in &seed.symmetry {
            let forward = cells[pair.a.index()][pair.b.index()];
            if forward > 0.0 {
                cells[pair.b.index()][pair.a.index()] = forward * pair.factor;
            }
        }

        for element in Element::ALL {
            repair_row(element, &mut cells[element.index()]);
        }

        try_validate_matrix(&cells).map_err(KernelError::InvariantViolation)?;

        info!(
            min_retention = Element::ALL
                .iter()
                .map(|e| cells[e.index()][e.index()])
                .fold(f64::INFINITY, f64::min),
            "transfer matrix built"
        );

        Ok(Self { cells })
    }

    /// Take rows as given. Validates, never repairs.
    pub fn from_rows(cells: Cells) -> KernelResult<Self> {
        try_validate_matrix(&cells).map_err(KernelError::InvariantViolation)?;
        Ok(Self { cells })
    }

    pub fn get(&self, source: Element, target: Element) -> f64 {
        self.cells[source.index()][target.index()]
    }

    pub fn self_retention(&self, element: Element) -> f64 {
        self.get(element, element)
    }

    /// `1 − self_retention`.
    pub fn total_outflow(&self, element: Element) -> f64 {
        1.0 - self.self_retention(element)
    }

    pub fn row(&self, element: Element) -> Row {
        self.cells[element.index()]
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    /// Off-diagonal entries of `element`'s row, strongest first (ties by
    /// element index), at most `k`.
    pub fn dominant_outflows(&self, element: Element, k: usize) -> Vec<(Element, f64)> {
        let mut flows: Vec<(Element, f64)> = Element::ALL
            .iter()
            .filter(|t| **t != element)
            .map(|t| (*t, self.get(element, *t)))
            .collect();
        flows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        flows.truncate(k);
        flows
    }

    /// Balance of the two flows between `a` and `b`: the weaker over the
    /// stronger, in `[0, 1]`. Zero when either direction is empty.
    pub fn reciprocity(&self, a: Element, b: Element) -> f64 {
        let forward = self.get(a, b);
        let backward = self.get(b, a);
        let strongest = forward.max(backward);
        if strongest <= 0.0 {
            0.0
        } else {
            forward.min(backward) / strongest
        }
    }

    /// Shannon entropy of the row, in nats. Zero cells contribute nothing.
    pub fn row_entropy(&self, element: Element) -> f64 {
        self.cells[element.index()]
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| -p * p.ln())
            .sum()
    }

    /// Write one cell and rebalance the rest of the row.
    ///
    /// Off-diagonal: `value` must lie in `[0, 1 − diagonal]`; the other
    /// off-diagonals are rescaled proportionally to fill the remaining
    /// budget, or share it evenly if they are all zero. The diagonal is
    /// untouched.
    ///
    /// Diagonal: `value` must lie in `[0.5, 1]`; all off-diagonals are
    /// rescaled to `1 − value`.
    ///
    /// If the rebalanced row fails validation the old row is restored.
    pub fn set(&mut self, source: Element, target: Element, value: f64) -> KernelResult<()> {
        let s = source.index();
        let t = target.index();
        let previous = self.cells[s];

        if !value.is_finite() {
            return Err(KernelError::InputDomain(format!(
                "flow {} -> {} must be finite, got {}",
                source, target, value
            )));
        }

        let mut row = previous;
        if s == t {
            if !(MIN_SELF_RETENTION..=1.0).contains(&value) {
                return Err(KernelError::InputDomain(format!(
                    "self retention of {} must lie in [{}, 1], got {}",
                    source, MIN_SELF_RETENTION, value
                )));
            }
            row[s] = value;
            rescale_off_diagonal(&mut row, s, None, 1.0 - value);
        } else {
            let budget = 1.0 - row[s];
            if value < 0.0 || value > budget + EPSILON {
                return Err(KernelError::InputDomain(format!(
                    "flow {} -> {} must lie in [0, {}], got {}",
                    source, target, budget, value
                )));
            }
            row[t] = value;
            rescale_off_diagonal(&mut row, s, Some(t), (budget - value).max(0.0));
        }

        self.cells[s] = row;
        if let Err(msg) = try_check_row(source, &self.cells[s]) {
            self.cells[s] = previous;
            return Err(KernelError::InvariantViolation(msg));
        }

        debug!(%source, %target, value, "flow set and row rebalanced");
        Ok(())
    }
}

impl TryFrom<Cells> for TransferMatrix {
    type Error = KernelError;

    fn try_from(cells: Cells) -> KernelResult<Self> {
        Self::from_rows(cells)
    }
}

impl From<TransferMatrix> for Cells {
    fn from(matrix: TransferMatrix) -> Self {
        matrix.cells
    }
}

/// Clamp, top up a short diagonal, renormalize, and pin the diagonal if
/// renormalization pulled it back under the floor.
fn repair_row(element: Element, row: &mut Row) {
    let i = element.index();

    for v in row.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }

    if row[i] < MIN_SELF_RETENTION {
        let deficit = MIN_SELF_RETENTION - row[i];
        if let Some(j) = largest_off_diagonal(row, i) {
            row[j] = (row[j] - deficit).max(0.0);
        }
        row[i] = MIN_SELF_RETENTION;
        debug!(%element, deficit, "diagonal topped up");
    }

    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > EPSILON && sum > 0.0 {
        for v in row.iter_mut() {
            *v /= sum;
        }
        debug!(%element, sum, "row renormalized");
    }

    if row[i] < MIN_SELF_RETENTION {
        row[i] = MIN_SELF_RETENTION;
        rescale_off_diagonal(row, i, None, 1.0 - MIN_SELF_RETENTION);
    }
}

/// Index of the largest off-diagonal cell, lowest index on ties.
fn largest_off_diagonal(row: &Row, diag: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for j in 0..ELEMENT_COUNT {
        if j == diag {
            continue;
        }
        match best {
            Some(b) if row[j] <= row[b] => {}
            _ => best = Some(j),
        }
    }
    best
}

/// Scale every off-diagonal cell except `fixed` so they sum to `budget`.
/// If they are all zero, share the budget evenly among them.
fn rescale_off_diagonal(row: &mut Row, diag: usize, fixed: Option<usize>, budget: f64) {
    let free: Vec<usize> = (0..ELEMENT_COUNT)
        .filter(|j| *j != diag && Some(*j) != fixed)
        .collect();
    let current: f64 = free.iter().map(|j| row[*j]).sum();

    if current > 0.0 {
        let scale = budget / current;
        for j in &free {
            row[*j] *= scale;
        }
    } else if !free.is_empty() {
        let share = budget / free.len() as f64;
        for j in &free {
            row[*j] = share;
        }
    }
}
