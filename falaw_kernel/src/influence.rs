//! FaLaw Kernel: Influence Resolver
//!
//! Direct plus decayed multi-hop influence between elements. Powers
//! P¹..P⁵ of the transfer matrix are computed once at construction; the
//! resolver must be rebuilt whenever the matrix changes.

use serde::{Deserialize, Serialize};

use crate::config::InfluenceConfig;
use crate::element::{Element, ELEMENT_COUNT};
use crate::error::{KernelError, KernelResult};
use crate::matrix::{Cells, TransferMatrix};

/// Highest hop order the resolver caches.
pub const MAX_ORDER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderFlow {
    pub order: usize,
    /// `P^order[source][target]`.
    pub raw: f64,
    /// `raw · decay^(order − 1)`.
    pub weighted: f64,
}

/// Two-hop path `source -> mediator -> target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediatedPath {
    pub mediator: Element,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceResult {
    pub source: Element,
    pub target: Element,
    /// Normalized decayed sum, in `[0, 1]`.
    pub total: f64,
    pub direct: f64,
    pub by_order: Vec<OrderFlow>,
    pub max_order: usize,
    pub dominant_paths: Vec<MediatedPath>,
}

#[derive(Debug, Clone)]
pub struct InfluenceResolver {
    powers: Vec<Cells>,
    config: InfluenceConfig,
}

impl InfluenceResolver {
    /// Precompute P¹..P⁵. Rejects a config whose decay or default order
    /// is out of range.
    pub fn new(matrix: &TransferMatrix, config: &InfluenceConfig) -> KernelResult<Self> {
        config.validate()?;
        let base = *matrix.cells();
        let mut powers = Vec::with_capacity(MAX_ORDER);
        powers.push(base);
        for k in 1..MAX_ORDER {
            let next = multiply(&powers[k - 1], &base);
            powers.push(next);
        }
        Ok(Self {
            powers,
            config: config.clone(),
        })
    }

    /// `P^order`, for `order` in `1..=5`.
    pub fn power(&self, order: usize) -> KernelResult<&Cells> {
        check_order(order)?;
        Ok(&self.powers[order - 1])
    }

    pub fn direct(&self, source: Element, target: Element) -> f64 {
        self.powers[0][source.index()][target.index()]
    }

    /// Total influence at the configured default order.
    pub fn influence(&self, source: Element, target: Element) -> InfluenceResult {
        self.compute(source, target, self.config.default_max_order)
    }

    pub fn total_influence(
        &self,
        source: Element,
        target: Element,
        max_order: usize,
    ) -> KernelResult<InfluenceResult> {
        check_order(max_order)?;
        Ok(self.compute(source, target, max_order))
    }

    fn compute(&self, source: Element, target: Element, max_order: usize) -> InfluenceResult {
        let (s, t) = (source.index(), target.index());
        let mut by_order = Vec::with_capacity(max_order);
        let mut weight_sum = 0.0;
        let mut flow_sum = 0.0;

        for k in 1..=max_order {
            let weight = self.decay_weight(k);
            let raw = self.powers[k - 1][s][t];
            by_order.push(OrderFlow {
                order: k,
                raw,
                weighted: raw * weight,
            });
            weight_sum += weight;
            flow_sum += raw * weight;
        }

        InfluenceResult {
            source,
            target,
            total: flow_sum / weight_sum,
            direct: self.direct(source, target),
            by_order,
            max_order,
            dominant_paths: self.dominant_paths(source, target),
        }
    }

    fn decay_weight(&self, order: usize) -> f64 {
        if order == 1 {
            1.0
        } else {
            self.config.decay.powi(order as i32 - 1)
        }
    }

    /// Strongest single-mediator paths, descending (ties by mediator index).
    /// Empty when source and target coincide.
    pub fn dominant_paths(&self, source: Element, target: Element) -> Vec<MediatedPath> {
        if source == target {
            return Vec::new();
        }
        let threshold = self.config.path_threshold;
        let mut paths: Vec<MediatedPath> = Element::ALL
            .iter()
            .filter(|m| **m != source && **m != target)
            .filter_map(|m| {
                let first = self.direct(source, *m);
                let second = self.direct(*m, target);
                (first > threshold && second > threshold).then(|| MediatedPath {
                    mediator: *m,
                    strength: first * second,
                })
            })
            .collect();
        paths.sort_by(|a, b| {
            b.strength
                .total_cmp(&a.strength)
                .then(a.mediator.cmp(&b.mediator))
        });
        paths.truncate(self.config.max_paths);
        paths
    }

    /// Total influence for every ordered pair; the diagonal is left at 0.
    pub fn influence_matrix(&self, max_order: usize) -> KernelResult<Cells> {
        check_order(max_order)?;
        let mut out = [[0.0; ELEMENT_COUNT]; ELEMENT_COUNT];
        for s in Element::ALL {
            for t in Element::ALL {
                if s != t {
                    out[s.index()][t.index()] = self.compute(s, t, max_order).total;
                }
            }
        }
        Ok(out)
    }

    /// Elements `source` reaches most strongly, at most `k`.
    pub fn strongest_influences(
        &self,
        source: Element,
        k: usize,
        max_order: usize,
    ) -> KernelResult<Vec<(Element, f64)>> {
        check_order(max_order)?;
        let mut ranked: Vec<(Element, f64)> = Element::ALL
            .iter()
            .filter(|t| **t != source)
            .map(|t| (*t, self.compute(source, *t, max_order).total))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        Ok(ranked)
    }
}

fn check_order(order: usize) -> KernelResult<()> {
    if (1..=MAX_ORDER).contains(&order) {
        Ok(())
    } else {
        Err(KernelError::InputDomain(format!(
            "max_order must lie in 1..={}, got {}",
            MAX_ORDER, order
        )))
    }
}

fn multiply(a: &Cells, b: &Cells) -> Cells {
    let mut out = [[0.0; ELEMENT_COUNT]; ELEMENT_COUNT];
    for i in 0..ELEMENT_COUNT {
        for j in 0..ELEMENT_COUNT {
            out[i][j] = (0..ELEMENT_COUNT).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
