//! FaLaw Kernel: Tension
//!
//! Four independent imbalance axes and their weighted aggregate. The
//! dynamic and conflict axes depend only on the matrix; structural and
//! potential read the per-call intensities.

use serde::{Deserialize, Serialize};

use crate::arithmetic::{clip_unit, coefficient_of_variation, mean, sigmoid, std_dev};
use crate::config::TensionConfig;
use crate::element::Element;
use crate::intensity::ElementIntensityMap;
use crate::matrix::TransferMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl TensionLevel {
    /// Bin `value` against four increasing cut points.
    pub fn classify(value: f64, cut_points: &[f64; 4]) -> TensionLevel {
        const BINS: [TensionLevel; 4] = [
            TensionLevel::VeryLow,
            TensionLevel::Low,
            TensionLevel::Medium,
            TensionLevel::High,
        ];
        for (cut, level) in cut_points.iter().zip(BINS) {
            if value < *cut {
                return level;
            }
        }
        TensionLevel::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensionReading {
    pub value: f64,
    pub level: TensionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensionComponents {
    pub structural: TensionReading,
    pub dynamic: TensionReading,
    pub potential: TensionReading,
    pub conflict: TensionReading,
    pub aggregate: TensionReading,
}

impl TensionComponents {
    /// The four axes, without the aggregate.
    pub fn axes(&self) -> [TensionReading; 4] {
        [self.structural, self.dynamic, self.potential, self.conflict]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionReadiness {
    pub aggregate: f64,
    pub readiness: f64,
    /// How many of the four axes exceed the "high" cut point.
    pub components_above_high: usize,
}

/// Borrowing view over the matrix and tension constants.
#[derive(Debug, Clone, Copy)]
pub struct TensionEvaluator<'a> {
    matrix: &'a TransferMatrix,
    config: &'a TensionConfig,
}

impl<'a> TensionEvaluator<'a> {
    pub fn new(matrix: &'a TransferMatrix, config: &'a TensionConfig) -> Self {
        Self { matrix, config }
    }

    pub fn evaluate(&self, intensities: &ElementIntensityMap) -> TensionComponents {
        let structural = self.structural(intensities);
        let dynamic = self.dynamic();
        let potential = self.potential(intensities);
        let conflict = self.conflict();

        let w = &self.config.weights;
        let aggregate = clip_unit(
            w.structural * structural
                + w.dynamic * dynamic
                + w.potential * potential
                + w.conflict * conflict,
        );

        TensionComponents {
            structural: self.reading(structural),
            dynamic: self.reading(dynamic),
            potential: self.reading(potential),
            conflict: self.reading(conflict),
            aggregate: self.reading(aggregate),
        }
    }

    /// Coefficient of variation of the supplied intensities.
    pub fn structural(&self, intensities: &ElementIntensityMap) -> f64 {
        clip_unit(coefficient_of_variation(&intensities.values()))
    }

    /// Spread of per-element total outflow.
    pub fn dynamic(&self) -> f64 {
        let outflows: Vec<f64> = Element::ALL
            .iter()
            .map(|e| self.matrix.total_outflow(*e))
            .collect();
        clip_unit(std_dev(&outflows) / self.config.max_outflow_spread)
    }

    /// Unused headroom: `1 − mean(intensities)`, 0 for an empty map.
    pub fn potential(&self, intensities: &ElementIntensityMap) -> f64 {
        if intensities.is_empty() {
            return 0.0;
        }
        clip_unit(1.0 - intensities.mean())
    }

    /// Mean asymmetry over ordered pairs that flow both ways.
    pub fn conflict(&self) -> f64 {
        let floor = self.config.conflict_flow_floor;
        let mut asymmetries = Vec::new();
        for i in Element::ALL {
            for j in Element::ALL {
                if i == j {
                    continue;
                }
                let ij = self.matrix.get(i, j);
                let ji = self.matrix.get(j, i);
                if ij > floor && ji > floor {
                    asymmetries.push(1.0 - ij.min(ji) / ij.max(ji));
                }
            }
        }
        clip_unit(mean(&asymmetries))
    }

    pub fn level(&self, value: f64) -> TensionLevel {
        TensionLevel::classify(value, &self.config.cut_points)
    }

    fn reading(&self, value: f64) -> TensionReading {
        TensionReading {
            value,
            level: self.level(value),
        }
    }

    /// Continuous crisis signal in `(0, 1)`.
    pub fn readiness(&self, aggregate: f64) -> f64 {
        sigmoid(
            aggregate,
            self.config.readiness_steepness,
            self.config.readiness_midpoint,
        )
    }

    pub fn transition_readiness(&self, intensities: &ElementIntensityMap) -> TransitionReadiness {
        let components = self.evaluate(intensities);
        let high = self.config.cut_points[2];
        TransitionReadiness {
            aggregate: components.aggregate.value,
            readiness: self.readiness(components.aggregate.value),
            components_above_high: components
                .axes()
                .iter()
                .filter(|r| r.value > high)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::approx_eq;
    use crate::config::MatrixSeed;

    fn matrix() -> TransferMatrix {
        TransferMatrix::build(&MatrixSeed::default()).unwrap()
    }

    #[test]
    fn test_classify_bins() {
        let cuts = [0.2, 0.5, 0.7, 0.9];
        assert_eq!(TensionLevel::classify(0.0, &cuts), TensionLevel::VeryLow);
        assert_eq!(TensionLevel::classify(0.2, &cuts), TensionLevel::Low);
        assert_eq!(TensionLevel::classify(0.69, &cuts), TensionLevel::Medium);
        assert_eq!(TensionLevel::classify(0.7, &cuts), TensionLevel::High);
        assert_eq!(TensionLevel::classify(0.95, &cuts), TensionLevel::Critical);
    }

    #[test]
    fn test_equal_intensities_zero_structural() {
        let m = matrix();
        let config = TensionConfig::default();
        let eval = TensionEvaluator::new(&m, &config);
        let t = eval.evaluate(&ElementIntensityMap::uniform(0.5).unwrap());
        assert_eq!(t.structural.value, 0.0);
        assert!(approx_eq(t.potential.value, 0.5));
        assert!(matches!(
            t.aggregate.level,
            TensionLevel::VeryLow | TensionLevel::Low
        ));
    }

    #[test]
    fn test_empty_map() {
        let m = matrix();
        let config = TensionConfig::default();
        let eval = TensionEvaluator::new(&m, &config);
        let t = eval.evaluate(&ElementIntensityMap::new());
        assert_eq!(t.structural.value, 0.0);
        assert_eq!(t.potential.value, 0.0);
    }

    #[test]
    fn test_identity_matrix_has_no_dynamic_or_conflict() {
        let mut cells = [[0.0; 8]; 8];
        for (i, row) in cells.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        let m = TransferMatrix::from_rows(cells).unwrap();
        let config = TensionConfig::default();
        let eval = TensionEvaluator::new(&m, &config);
        assert_eq!(eval.dynamic(), 0.0);
        assert_eq!(eval.conflict(), 0.0);
    }

    #[test]
    fn test_symmetric_pair_has_no_conflict() {
        let mut cells = [[0.0; 8]; 8];
        for (i, row) in cells.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        cells[0] = [0.8, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        cells[1] = [0.2, 0.8, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let m = TransferMatrix::from_rows(cells).unwrap();
        let config = TensionConfig::default();
        assert_eq!(TensionEvaluator::new(&m, &config).conflict(), 0.0);
    }

    #[test]
    fn test_readiness_curve() {
        let m = matrix();
        let config = TensionConfig::default();
        let eval = TensionEvaluator::new(&m, &config);
        assert!(approx_eq(eval.readiness(0.6), 0.5));
        assert!(eval.readiness(0.9) > eval.readiness(0.3));
    }

    #[test]
    fn test_transition_readiness_counts_high_axes() {
        let m = matrix();
        let config = TensionConfig::default();
        let eval = TensionEvaluator::new(&m, &config);
        let low = ElementIntensityMap::try_from_pairs([
            (Element::Qian, 0.0),
            (Element::She, 0.0),
            (Element::Kun, 0.6),
        ])
        .unwrap();
        let r = eval.transition_readiness(&low);
        // structural and potential are both far above 0.7 here
        assert!(r.components_above_high >= 2);
        assert!(approx_eq(r.readiness, eval.readiness(r.aggregate)));
    }
}
