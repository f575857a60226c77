//! FaLaw Kernel: Targets
//!
//! Target clarity, elimination justification, and the effects of joining,
//! sharing or losing targets.

use serde::{Deserialize, Serialize};

use crate::arithmetic::clip_unit;
use crate::config::{EliminationConfig, TargetConfig};
use crate::error::{ensure_unit, KernelResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetFactor {
    pub value: f64,
    pub clarity: f64,
    pub priority_multiplier: f64,
    pub n_targets: usize,
    pub has_high_priority: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EliminationComponents {
    pub base: f64,
    pub expected_gain: f64,
    pub gain_contribution: f64,
    pub collective_bonus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EliminationJustification {
    pub justified: bool,
    pub score: f64,
    pub threshold: f64,
    pub components: EliminationComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EternalTargetEffect {
    pub primal_boost: f64,
    pub cohesion_boost: f64,
    pub new_primal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetLossEffects {
    pub cohesion_loss: f64,
    pub fragmentation_gain: f64,
    pub realignment_risk: f64,
    pub new_cohesion: f64,
    pub new_fragmentation: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TargetEvaluator<'a> {
    target: &'a TargetConfig,
    elimination: &'a EliminationConfig,
}

impl<'a> TargetEvaluator<'a> {
    pub fn new(target: &'a TargetConfig, elimination: &'a EliminationConfig) -> Self {
        Self {
            target,
            elimination,
        }
    }

    pub fn target_factor(&self, n_targets: usize, has_high_priority: bool) -> TargetFactor {
        let c = self.target;
        if n_targets == 0 {
            return TargetFactor {
                value: c.zero_target_base,
                clarity: 0.0,
                priority_multiplier: 0.0,
                n_targets,
                has_high_priority,
            };
        }

        let clarity = n_targets as f64 * c.clarity_per_target;
        let priority_multiplier = if has_high_priority {
            c.high_priority_multiplier
        } else {
            c.low_priority_multiplier
        };
        TargetFactor {
            value: c.max_target_factor.min(c.base_factor + clarity * priority_multiplier),
            clarity,
            priority_multiplier,
            n_targets,
            has_high_priority,
        }
    }

    /// Score an elimination. A collective agent always earns half the
    /// collective bonus on top of any shared-benefit bonus.
    pub fn elimination_justification(
        &self,
        reason: &str,
        agent_primal: f64,
        target_primal: f64,
        agent_is_collective: bool,
        has_collective_benefit: bool,
    ) -> KernelResult<EliminationJustification> {
        let agent_primal = ensure_unit("agent_primal", agent_primal)?;
        let target_primal = ensure_unit("target_primal", target_primal)?;
        let c = self.elimination;

        let mut base = c.base_justification;
        if self.is_survival_reason(reason) {
            base *= c.survival_multiplier;
        }

        let expected_gain = 0.5 * agent_primal + 0.3 * target_primal;
        let gain_contribution = expected_gain * c.primal_gain_factor;

        let mut collective_bonus = if has_collective_benefit {
            c.collective_bonus
        } else {
            0.0
        };
        if agent_is_collective {
            collective_bonus += 0.5 * c.collective_bonus;
        }

        let score = base + gain_contribution + collective_bonus;
        Ok(EliminationJustification {
            justified: score > c.threshold,
            score,
            threshold: c.threshold,
            components: EliminationComponents {
                base,
                expected_gain,
                gain_contribution,
                collective_bonus,
            },
        })
    }

    pub fn is_survival_reason(&self, reason: &str) -> bool {
        let reason = reason.to_lowercase();
        self.elimination
            .survival_keywords
            .iter()
            .any(|kw| reason.contains(&kw.to_lowercase()))
    }

    /// Joining an eternal target: individuals gain primal strength,
    /// collectives gain less primal strength plus cohesion.
    pub fn eternal_target_effect(
        &self,
        is_collective: bool,
        current_primal: f64,
    ) -> KernelResult<EternalTargetEffect> {
        let current = ensure_unit("current_primal", current_primal)?;
        let (primal_boost, cohesion_boost) = if is_collective { (0.1, 0.15) } else { (0.25, 0.0) };
        Ok(EternalTargetEffect {
            primal_boost,
            cohesion_boost,
            new_primal: (current + primal_boost).min(1.0),
        })
    }

    /// Primal strength of an individual after taking part in a collective
    /// target.
    pub fn collective_participation(
        &self,
        individual_primal: f64,
        excitation_capacity: f64,
    ) -> KernelResult<f64> {
        let primal = ensure_unit("individual_primal", individual_primal)?;
        let capacity = ensure_unit("excitation_capacity", excitation_capacity)?;
        Ok((primal + 0.15 * capacity).min(1.0))
    }

    pub fn target_loss_effects(
        &self,
        n_lost: usize,
        cohesion: f64,
        fragmentation: f64,
    ) -> KernelResult<TargetLossEffects> {
        let cohesion = ensure_unit("cohesion", cohesion)?;
        let fragmentation = ensure_unit("fragmentation", fragmentation)?;
        let n = n_lost as f64;

        let cohesion_loss = cohesion * 0.1 * n;
        let fragmentation_gain = 0.1 * n;
        Ok(TargetLossEffects {
            cohesion_loss,
            fragmentation_gain,
            realignment_risk: (2.0 * fragmentation_gain).min(1.0),
            new_cohesion: clip_unit(cohesion - cohesion_loss),
            new_fragmentation: clip_unit(fragmentation + fragmentation_gain),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::approx_eq;
    use crate::error::KernelError;

    fn configs() -> (TargetConfig, EliminationConfig) {
        (TargetConfig::default(), EliminationConfig::default())
    }

    #[test]
    fn test_zero_targets_is_base() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        let f = eval.target_factor(0, false);
        assert_eq!(f.value, 0.8);
        assert_eq!(f.clarity, 0.0);
    }

    #[test]
    fn test_target_factor_formula() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        let low = eval.target_factor(1, false);
        assert!(approx_eq(low.value, 0.5 + 0.2 * 0.7));
        let high = eval.target_factor(2, true);
        assert!(approx_eq(high.value, 0.9));
        assert_eq!(eval.target_factor(10, true).value, 1.0);
    }

    #[test]
    fn test_survival_keyword_raises_score() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        let plain = eval
            .elimination_justification("resource dispute", 0.5, 0.5, false, false)
            .unwrap();
        let survival = eval
            .elimination_justification("needed for SURVIVAL", 0.5, 0.5, false, false)
            .unwrap();
        assert!(survival.score > plain.score);
        assert!(approx_eq(survival.components.base, 1.6));
        assert!(approx_eq(plain.components.expected_gain, 0.4));
        assert!(approx_eq(plain.components.gain_contribution, 0.12));
        assert!(plain.justified);
    }

    #[test]
    fn test_collective_bonus_parts() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        let both = eval
            .elimination_justification("x", 0.0, 0.0, true, true)
            .unwrap();
        assert!(approx_eq(both.components.collective_bonus, 0.6));
        let agent_only = eval
            .elimination_justification("x", 0.0, 0.0, true, false)
            .unwrap();
        assert!(approx_eq(agent_only.components.collective_bonus, 0.2));
    }

    #[test]
    fn test_elimination_rejects_bad_primal() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        assert!(matches!(
            eval.elimination_justification("x", 1.2, 0.0, false, false),
            Err(KernelError::InputDomain(_))
        ));
    }

    #[test]
    fn test_eternal_and_participation() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        let ind = eval.eternal_target_effect(false, 0.9).unwrap();
        assert_eq!(ind.new_primal, 1.0);
        let col = eval.eternal_target_effect(true, 0.5).unwrap();
        assert!(approx_eq(col.new_primal, 0.6));
        assert_eq!(col.cohesion_boost, 0.15);
        assert!(approx_eq(eval.collective_participation(0.5, 0.8).unwrap(), 0.62));
    }

    #[test]
    fn test_target_loss() {
        let (t, e) = configs();
        let eval = TargetEvaluator::new(&t, &e);
        let fx = eval.target_loss_effects(3, 0.5, 0.9).unwrap();
        assert!(approx_eq(fx.cohesion_loss, 0.15));
        assert!(approx_eq(fx.new_cohesion, 0.35));
        assert_eq!(fx.new_fragmentation, 1.0);
        assert!(approx_eq(fx.realignment_risk, 0.6));
    }
}
