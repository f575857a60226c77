//! FaLaw Kernel: Possibility Projection
//!
//! Maps element intensities onto six derived dimensions through a fixed
//! per-element contribution table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arithmetic::clip_unit;
use crate::config::PossibilityConfig;
use crate::element::Element;
use crate::error::{KernelError, KernelResult};
use crate::intensity::ElementIntensityMap;

pub const DIMENSION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Stability,
    Flexibility,
    Diversity,
    Connectivity,
    Novelty,
    Efficiency,
}

impl Dimension {
    pub const ALL: [Dimension; DIMENSION_COUNT] = [
        Dimension::Stability,
        Dimension::Flexibility,
        Dimension::Diversity,
        Dimension::Connectivity,
        Dimension::Novelty,
        Dimension::Efficiency,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Stability => "stability",
            Dimension::Flexibility => "flexibility",
            Dimension::Diversity => "diversity",
            Dimension::Connectivity => "connectivity",
            Dimension::Novelty => "novelty",
            Dimension::Efficiency => "efficiency",
        }
    }

    pub fn from_name(name: &str) -> KernelResult<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.name() == name)
            .ok_or_else(|| KernelError::InputDomain(format!("unknown dimension {:?}", name)))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PossibilityVector {
    pub stability: f64,
    pub flexibility: f64,
    pub diversity: f64,
    pub connectivity: f64,
    pub novelty: f64,
    pub efficiency: f64,
}

impl PossibilityVector {
    pub fn from_array(v: [f64; DIMENSION_COUNT]) -> Self {
        Self {
            stability: v[0],
            flexibility: v[1],
            diversity: v[2],
            connectivity: v[3],
            novelty: v[4],
            efficiency: v[5],
        }
    }

    pub fn to_array(&self) -> [f64; DIMENSION_COUNT] {
        [
            self.stability,
            self.flexibility,
            self.diversity,
            self.connectivity,
            self.novelty,
            self.efficiency,
        ]
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        self.to_array()[dim.index()]
    }
}

/// One candidate element for raising a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpansionStep {
    pub element: Element,
    pub current_contribution: f64,
    pub max_contribution: f64,
    pub improvement: f64,
}

/// Borrowing view over the contribution table.
#[derive(Debug, Clone, Copy)]
pub struct PossibilityProjector<'a> {
    config: &'a PossibilityConfig,
}

impl<'a> PossibilityProjector<'a> {
    pub fn new(config: &'a PossibilityConfig) -> Self {
        Self { config }
    }

    fn contribution(&self, element: Element) -> [f64; DIMENSION_COUNT] {
        self.config
            .contributions
            .get(&element)
            .copied()
            .unwrap_or([0.0; DIMENSION_COUNT])
    }

    /// Intensity-weighted average of contribution vectors.
    pub fn project(&self, intensities: &ElementIntensityMap) -> PossibilityVector {
        let mut acc = [0.0; DIMENSION_COUNT];
        let mut total_weight = 0.0;
        for (element, intensity) in intensities.iter() {
            let c = self.contribution(element);
            for (slot, v) in acc.iter_mut().zip(c) {
                *slot += v * intensity;
            }
            total_weight += intensity;
        }
        if total_weight <= 0.0 {
            return PossibilityVector::default();
        }
        for slot in acc.iter_mut() {
            *slot = clip_unit(*slot / total_weight);
        }
        PossibilityVector::from_array(acc)
    }

    /// Mean contribution of all eight elements on `dim`.
    pub fn mean_contribution(&self, dim: Dimension) -> f64 {
        let total: f64 = Element::ALL
            .iter()
            .map(|e| self.contribution(*e)[dim.index()])
            .sum();
        total / Element::ALL.len() as f64
    }

    /// Relative headroom on `dim` against the table mean, in `[0, 1]`.
    pub fn expansion_potential(&self, intensities: &ElementIntensityMap, dim: Dimension) -> f64 {
        let reference = self.mean_contribution(dim);
        if reference == 0.0 {
            return 0.0;
        }
        let current = self.project(intensities).get(dim);
        clip_unit((reference - current) / reference)
    }

    /// Elements present in the map whose intensity could still raise `dim`,
    /// largest gain first (ties by element index).
    pub fn optimal_path(&self, intensities: &ElementIntensityMap, dim: Dimension) -> Vec<ExpansionStep> {
        let mut steps: Vec<ExpansionStep> = intensities
            .iter()
            .map(|(element, intensity)| {
                let max_contribution = self.contribution(element)[dim.index()];
                let current_contribution = max_contribution * intensity;
                ExpansionStep {
                    element,
                    current_contribution,
                    max_contribution,
                    improvement: max_contribution - current_contribution,
                }
            })
            .filter(|s| s.improvement > self.config.min_improvement)
            .collect();
        steps.sort_by(|a, b| {
            b.improvement
                .total_cmp(&a.improvement)
                .then(a.element.cmp(&b.element))
        });
        steps.truncate(self.config.max_path_len);
        steps
    }
}
