//! FaLaw Kernel: Configuration
//!
//! Every numeric constant the kernel uses, injected once at construction.
//! The kernel never reads files or the environment; the runtime decides
//! where a `KernelConfig` comes from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{KernelError, KernelResult};

// ── Matrix seed ─────────────────────────────────────────────────────

/// Supplementary reverse flow: if `R[a][b] > 0` then `R[b][a] = R[a][b] * factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymmetryFactor {
    pub a: Element,
    pub b: Element,
    pub factor: f64,
}

/// Seed tables for the 8×8 transfer matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MatrixSeed {
    /// Diagonal. Must cover all eight elements.
    pub self_retention: BTreeMap<Element, f64>,
    /// Sparse directed outflows, `source -> target -> weight`.
    pub outflows: BTreeMap<Element, BTreeMap<Element, f64>>,
    /// Applied in order after the outflow table.
    pub symmetry: Vec<SymmetryFactor>,
}

impl Default for MatrixSeed {
    fn default() -> Self {
        use Element::*;

        let self_retention = BTreeMap::from([
            (Qian, 0.70),
            (She, 0.65),
            (Xian, 0.75),
            (Li, 0.60),
            (Jie, 0.68),
            (San, 0.55),
            (Huan, 0.62),
            (Kun, 0.58),
        ]);

        let outflows = BTreeMap::from([
            (
                Qian,
                BTreeMap::from([(She, 0.12), (Jie, 0.08), (Huan, 0.07), (Xian, 0.03)]),
            ),
            (
                Xian,
                BTreeMap::from([(Li, 0.15), (She, 0.04), (San, 0.03), (Kun, 0.03)]),
            ),
            (
                Li,
                BTreeMap::from([(Xian, 0.12), (Qian, 0.10), (Huan, 0.08), (San, 0.10)]),
            ),
            (
                Kun,
                BTreeMap::from([(Qian, 0.15), (Xian, 0.12), (Jie, 0.08), (Huan, 0.07)]),
            ),
        ]);

        let symmetry = vec![
            SymmetryFactor { a: Qian, b: She, factor: 0.6 },
            SymmetryFactor { a: Xian, b: Li, factor: 0.8 },
            SymmetryFactor { a: San, b: Huan, factor: 0.7 },
            SymmetryFactor { a: Kun, b: Qian, factor: 0.3 },
        ];

        Self {
            self_retention,
            outflows,
            symmetry,
        }
    }
}

// ── Influence ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct InfluenceConfig {
    /// Per-hop decay; order k is weighted `decay^(k-1)`.
    pub decay: f64,
    pub default_max_order: usize,
    /// Both legs of a mediated path must exceed this.
    pub path_threshold: f64,
    pub max_paths: usize,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            decay: 0.7,
            default_max_order: 3,
            path_threshold: 0.01,
            max_paths: 3,
        }
    }
}

impl InfluenceConfig {
    /// Decay in `(0, 1]`, default order in `1..=MAX_ORDER`.
    pub fn validate(&self) -> KernelResult<()> {
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(config_err(format!(
                "influence decay must lie in (0, 1], got {}",
                self.decay
            )));
        }
        if !(1..=crate::influence::MAX_ORDER).contains(&self.default_max_order) {
            return Err(config_err(format!(
                "default_max_order must lie in 1..={}, got {}",
                crate::influence::MAX_ORDER,
                self.default_max_order
            )));
        }
        Ok(())
    }
}

// ── Tension ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TensionWeights {
    pub structural: f64,
    pub dynamic: f64,
    pub potential: f64,
    pub conflict: f64,
}

impl Default for TensionWeights {
    fn default() -> Self {
        Self {
            structural: 0.3,
            dynamic: 0.2,
            potential: 0.25,
            conflict: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TensionConfig {
    pub weights: TensionWeights,
    /// Lower bounds of low / medium / high / critical.
    pub cut_points: [f64; 4],
    /// Assumed maximum std of per-element outflow.
    pub max_outflow_spread: f64,
    /// Both directions must exceed this for a pair to count as conflicting.
    pub conflict_flow_floor: f64,
    pub readiness_steepness: f64,
    pub readiness_midpoint: f64,
}

impl Default for TensionConfig {
    fn default() -> Self {
        Self {
            weights: TensionWeights::default(),
            cut_points: [0.2, 0.5, 0.7, 0.9],
            max_outflow_spread: 0.5,
            conflict_flow_floor: 0.01,
            readiness_steepness: 10.0,
            readiness_midpoint: 0.6,
        }
    }
}

// ── Possibility ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PossibilityConfig {
    /// Per element: stability, flexibility, diversity, connectivity,
    /// novelty, efficiency. Must cover all eight elements.
    pub contributions: BTreeMap<Element, [f64; 6]>,
    pub min_improvement: f64,
    pub max_path_len: usize,
}

impl Default for PossibilityConfig {
    fn default() -> Self {
        use Element::*;

        let contributions = BTreeMap::from([
            (Qian, [0.8, 0.2, 0.1, 0.3, 0.1, 0.6]),
            (She, [0.3, 0.7, 0.6, 0.4, 0.8, 0.4]),
            (Xian, [0.6, 0.1, 0.2, 0.5, 0.3, 0.3]),
            (Li, [0.1, 0.9, 0.7, 0.2, 0.6, 0.2]),
            (Jie, [0.7, 0.4, 0.3, 0.6, 0.2, 0.5]),
            (San, [0.2, 0.8, 0.9, 0.7, 0.5, 0.3]),
            (Huan, [0.4, 0.6, 0.8, 0.9, 0.4, 0.7]),
            (Kun, [0.1, 0.9, 0.5, 0.3, 0.9, 0.2]),
        ]);

        Self {
            contributions,
            min_improvement: 0.01,
            max_path_len: 5,
        }
    }
}

// ── Excitation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExcitationConfig {
    pub base: f64,
    pub sensitivity: f64,
    pub adaptive_capacity: f64,
    pub resilience: f64,
    pub steepness: f64,
    pub floor: f64,
    pub ceiling: f64,
    /// Above this pressure the adaptation gain tapers off linearly.
    pub adaptation_knee: f64,
    /// Cap on the adaptation gain below the knee.
    pub adaptation_cap: f64,
}

impl Default for ExcitationConfig {
    fn default() -> Self {
        Self {
            base: 0.85,
            sensitivity: 0.80,
            adaptive_capacity: 0.69,
            resilience: 1.89,
            steepness: 10.0,
            floor: 0.05,
            ceiling: 1.2,
            adaptation_knee: 0.7,
            adaptation_cap: 0.3,
        }
    }
}

// ── Targets and elimination ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TargetConfig {
    pub base_factor: f64,
    pub clarity_per_target: f64,
    pub high_priority_multiplier: f64,
    pub low_priority_multiplier: f64,
    pub max_target_factor: f64,
    pub zero_target_base: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_factor: 0.5,
            clarity_per_target: 0.2,
            high_priority_multiplier: 1.0,
            low_priority_multiplier: 0.7,
            max_target_factor: 1.0,
            zero_target_base: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EliminationConfig {
    pub base_justification: f64,
    pub primal_gain_factor: f64,
    pub collective_bonus: f64,
    pub survival_multiplier: f64,
    pub threshold: f64,
    /// Matched case-insensitively as substrings of the reason text.
    pub survival_keywords: Vec<String>,
}

impl Default for EliminationConfig {
    fn default() -> Self {
        Self {
            base_justification: 0.8,
            primal_gain_factor: 0.3,
            collective_bonus: 0.4,
            survival_multiplier: 2.0,
            threshold: 0.6,
            survival_keywords: ["survival", "defense", "threat", "protect", "survive"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ── Regime ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RegimeConfig {
    /// Breach when cohesion is below this.
    pub cohesion_threshold: f64,
    /// Breach when target clarity is below this.
    pub target_clarity_threshold: f64,
    /// Breach when primal flow is below this.
    pub primal_flow_threshold: f64,
    /// Breach when fragmentation is above this.
    pub fragmentation_threshold: f64,
    pub min_conditions: usize,
    /// Urgency above which the assessment alone requires a transition.
    pub transition_urgency: f64,
    /// Urgency above which the radical strategies are preferred.
    pub radical_urgency: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            cohesion_threshold: 0.3,
            target_clarity_threshold: 0.2,
            primal_flow_threshold: 0.2,
            fragmentation_threshold: 0.5,
            min_conditions: 3,
            transition_urgency: 0.7,
            radical_urgency: 0.8,
        }
    }
}

// ── Root ────────────────────────────────────────────────────────────

/// The single configuration object handed to `FieldEngine::new`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct KernelConfig {
    pub matrix: MatrixSeed,
    pub influence: InfluenceConfig,
    pub tension: TensionConfig,
    pub possibility: PossibilityConfig,
    pub excitation: ExcitationConfig,
    pub target: TargetConfig,
    pub elimination: EliminationConfig,
    pub regime: RegimeConfig,
}

impl KernelConfig {
    /// Parse from JSON and validate.
    pub fn from_json(text: &str) -> KernelResult<Self> {
        let config: KernelConfig = serde_json::from_str(text)
            .map_err(|e| KernelError::Configuration(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on incomplete tables and nonsensical constants.
    pub fn validate(&self) -> KernelResult<()> {
        self.validate_matrix()?;
        self.validate_influence()?;
        self.validate_tension()?;
        self.validate_possibility()?;
        self.validate_scalars()?;
        Ok(())
    }

    fn validate_matrix(&self) -> KernelResult<()> {
        let seed = &self.matrix;
        for e in Element::ALL {
            match seed.self_retention.get(&e) {
                None => {
                    return Err(config_err(format!(
                        "self_retention table does not cover element {}",
                        e
                    )))
                }
                Some(v) if !v.is_finite() || *v < 0.0 || *v > 1.0 => {
                    return Err(config_err(format!(
                        "self_retention of {} must lie in [0, 1], got {}",
                        e, v
                    )))
                }
                Some(_) => {}
            }
        }
        for (source, targets) in &seed.outflows {
            for (target, w) in targets {
                if source == target {
                    return Err(config_err(format!(
                        "outflow table sets diagonal cell {} -> {}",
                        source, target
                    )));
                }
                if !w.is_finite() {
                    return Err(config_err(format!(
                        "outflow {} -> {} is not finite",
                        source, target
                    )));
                }
            }
        }
        for s in &seed.symmetry {
            if s.a == s.b || !s.factor.is_finite() || s.factor < 0.0 {
                return Err(config_err(format!(
                    "invalid symmetry factor {} <-> {} ({})",
                    s.a, s.b, s.factor
                )));
            }
        }
        Ok(())
    }

    fn validate_influence(&self) -> KernelResult<()> {
        self.influence.validate()
    }

    fn validate_tension(&self) -> KernelResult<()> {
        let c = &self.tension;
        let w = &c.weights;
        for (name, v) in [
            ("structural", w.structural),
            ("dynamic", w.dynamic),
            ("potential", w.potential),
            ("conflict", w.conflict),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(config_err(format!("tension weight {} must be >= 0, got {}", name, v)));
            }
        }
        let increasing = c.cut_points.windows(2).all(|p| p[0] < p[1]);
        let in_range = c.cut_points.iter().all(|v| *v > 0.0 && *v <= 1.0);
        if !increasing || !in_range {
            return Err(config_err(format!(
                "tension cut points must be strictly increasing in (0, 1], got {:?}",
                c.cut_points
            )));
        }
        if !(c.max_outflow_spread > 0.0) {
            return Err(config_err("max_outflow_spread must be > 0".to_string()));
        }
        Ok(())
    }

    fn validate_possibility(&self) -> KernelResult<()> {
        for e in Element::ALL {
            match self.possibility.contributions.get(&e) {
                None => {
                    return Err(config_err(format!(
                        "possibility contribution table does not cover element {}",
                        e
                    )))
                }
                Some(row) if row.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) => {
                    return Err(config_err(format!(
                        "possibility contributions of {} must lie in [0, 1]",
                        e
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn validate_scalars(&self) -> KernelResult<()> {
        let x = &self.excitation;
        let scalars = [
            ("excitation.base", x.base),
            ("excitation.sensitivity", x.sensitivity),
            ("excitation.adaptive_capacity", x.adaptive_capacity),
            ("excitation.resilience", x.resilience),
            ("excitation.steepness", x.steepness),
            ("target.base_factor", self.target.base_factor),
            ("target.clarity_per_target", self.target.clarity_per_target),
            ("target.zero_target_base", self.target.zero_target_base),
            ("elimination.base_justification", self.elimination.base_justification),
            ("elimination.threshold", self.elimination.threshold),
            ("regime.cohesion_threshold", self.regime.cohesion_threshold),
            ("regime.fragmentation_threshold", self.regime.fragmentation_threshold),
        ];
        if let Some((name, v)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(config_err(format!("{} is not finite ({})", name, v)));
        }
        if !(x.floor < x.ceiling) {
            return Err(config_err(format!(
                "excitation floor {} must be below ceiling {}",
                x.floor, x.ceiling
            )));
        }
        if !(x.adaptation_knee > 0.0 && x.adaptation_knee < 1.0) {
            return Err(config_err(format!(
                "adaptation_knee must lie in (0, 1), got {}",
                x.adaptation_knee
            )));
        }
        if !(1..=4).contains(&self.regime.min_conditions) {
            return Err(config_err(format!(
                "regime.min_conditions must lie in 1..=4, got {}",
                self.regime.min_conditions
            )));
        }
        Ok(())
    }
}

fn config_err(msg: String) -> KernelError {
    KernelError::Configuration(msg)
}
