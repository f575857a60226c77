//! Simulated entities: individuals, collectives and the shared environment.
//!
//! Entities carry state only. Excitation comes from the kernel's
//! `ExcitationFunction`; target effects from the kernel's `TargetEvaluator`.

use std::fmt;

use falaw_kernel::arithmetic::{clip, clip_unit, mean};
use falaw_kernel::error::KernelResult;
use falaw_kernel::excitation::ExcitationFunction;
use falaw_kernel::regime::StrategyTarget;
use falaw_kernel::target::TargetEvaluator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};

/// Primal strength at or below this level means extinction.
pub const EXTINCTION_THRESHOLD: f64 = 0.1;

/// Fraction of the per-step energy balance applied to primal strength.
pub const PRIMAL_RATE: f64 = 0.1;

// ---------------------------------------------------------------------------
// Life state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    Alive,
    Transitioning,
    PseudoAlive,
    Extinct,
}

impl LifeState {
    /// Extinct is terminal. Alive and pseudo-alive pass through
    /// transitioning; transitioning may settle anywhere.
    pub fn can_transition_to(self, next: LifeState) -> bool {
        use LifeState::*;
        matches!(
            (self, next),
            (Alive, Transitioning)
                | (Alive, Extinct)
                | (Transitioning, Alive)
                | (Transitioning, Extinct)
                | (Transitioning, PseudoAlive)
                | (PseudoAlive, Transitioning)
                | (PseudoAlive, Extinct)
        )
    }

    /// Everything but extinct still takes part in the simulation.
    pub fn is_alive(self) -> bool {
        self != LifeState::Extinct
    }
}

impl fmt::Display for LifeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifeState::Alive => "alive",
            LifeState::Transitioning => "transitioning",
            LifeState::PseudoAlive => "pseudo_alive",
            LifeState::Extinct => "extinct",
        };
        f.write_str(s)
    }
}

fn transition(entity: &str, state: &mut LifeState, next: LifeState) -> RuntimeResult<()> {
    if !state.can_transition_to(next) {
        return Err(RuntimeError::LifeTransition {
            entity: entity.to_string(),
            from: *state,
            to: next,
        });
    }
    debug!(entity, from = %state, to = %next, "life state changed");
    *state = next;
    Ok(())
}

/// Why and when an entity went extinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtinctionRecord {
    pub entity: String,
    pub step: u64,
    pub cause: ExtinctionCause,
    pub primal_at_extinction: f64,
    pub related: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtinctionCause {
    PrimalDepletion,
    Eliminated,
    MembersLost,
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub kind: String,
    pub content: String,
    pub high_priority: bool,
    pub active: bool,
}

impl Target {
    pub fn new(kind: &str, content: &str, high_priority: bool) -> Self {
        Self {
            kind: kind.to_string(),
            content: content.to_string(),
            high_priority,
            active: true,
        }
    }
}

impl From<&StrategyTarget> for Target {
    fn from(t: &StrategyTarget) -> Self {
        Target::new(&t.kind, &t.content, t.is_high_priority())
    }
}

fn active_targets(targets: &[Target]) -> (usize, bool) {
    let active = targets.iter().filter(|t| t.active);
    let (mut n, mut high) = (0, false);
    for t in active {
        n += 1;
        high |= t.high_priority;
    }
    (n, high)
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Environment {
    pub pressure_level: f64,
    pub resource_abundance: f64,
    pub stability: f64,
    pub chaos_potential: f64,
    pub novelty_potential: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            pressure_level: 0.3,
            resource_abundance: 0.7,
            stability: 0.6,
            chaos_potential: 0.2,
            novelty_potential: 0.4,
        }
    }
}

impl Environment {
    /// Pressure felt by something with the given resilience.
    pub fn apply_pressure(&self, resilience: f64) -> f64 {
        clip_unit(self.pressure_level * (1.0 - resilience))
    }

    pub fn is_changing(&self, threshold: f64) -> bool {
        self.chaos_potential + self.novelty_potential > threshold
    }

    /// One step of field degradation: stability drains into chaos and
    /// pressure rises.
    pub fn degrade(&mut self, rate: f64) {
        self.stability = clip_unit(self.stability - rate);
        self.chaos_potential = clip_unit(self.chaos_potential + rate);
        self.pressure_level = clip_unit(self.pressure_level + rate);
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        let fields = [
            ("pressure_level", self.pressure_level),
            ("resource_abundance", self.resource_abundance),
            ("stability", self.stability),
            ("chaos_potential", self.chaos_potential),
            ("novelty_potential", self.novelty_potential),
        ];
        for (name, v) in fields {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(RuntimeError::InvalidScenario(format!(
                    "environment.{} must lie in [0, 1], got {}",
                    name, v
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Individual
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub primal: f64,
    pub excitation_capacity: f64,
    pub resilience: f64,
    pub excitation: f64,
    pub life_state: LifeState,
    pub targets: Vec<Target>,
}

impl Individual {
    pub fn new(id: &str, primal: f64, excitation_capacity: f64, resilience: f64) -> Self {
        Self {
            id: id.to_string(),
            primal,
            excitation_capacity,
            resilience,
            excitation: 0.0,
            life_state: LifeState::Alive,
            targets: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life_state.is_alive()
    }

    pub fn active_targets(&self) -> (usize, bool) {
        active_targets(&self.targets)
    }

    pub fn transition_to(&mut self, next: LifeState) -> RuntimeResult<()> {
        transition(&self.id, &mut self.life_state, next)
    }

    /// Excite under the current environment. Primal strength moves by
    /// `PRIMAL_RATE · (excitation · capacity − pressure)`. Returns the
    /// pressure felt.
    pub fn excite(&mut self, f: &ExcitationFunction<'_>, env: &Environment) -> KernelResult<f64> {
        let pressure = env.apply_pressure(self.resilience);
        self.excitation = f.compute(pressure)?;
        let balance = self.excitation * self.excitation_capacity - pressure;
        self.primal = clip_unit(self.primal + PRIMAL_RATE * balance);
        Ok(pressure)
    }

    /// True when this step's energy balance was negative.
    pub fn is_starving(&self, env: &Environment) -> bool {
        self.excitation * self.excitation_capacity < env.apply_pressure(self.resilience)
    }

    /// Goes extinct when primal strength is depleted.
    pub fn check_survival(&mut self, step: u64) -> RuntimeResult<Option<ExtinctionRecord>> {
        if !self.is_alive() || self.primal > EXTINCTION_THRESHOLD {
            return Ok(None);
        }
        self.go_extinct(step, ExtinctionCause::PrimalDepletion, Vec::new())
            .map(Some)
    }

    pub fn go_extinct(
        &mut self,
        step: u64,
        cause: ExtinctionCause,
        related: Vec<String>,
    ) -> RuntimeResult<ExtinctionRecord> {
        self.transition_to(LifeState::Extinct)?;
        for t in &mut self.targets {
            t.active = false;
        }
        Ok(ExtinctionRecord {
            entity: self.id.clone(),
            step,
            cause,
            primal_at_extinction: self.primal,
            related,
        })
    }

    /// Join an eternal target.
    pub fn join_eternal_target(&mut self, targets: &TargetEvaluator<'_>, content: &str) -> KernelResult<()> {
        let effect = targets.eternal_target_effect(false, self.primal)?;
        self.primal = effect.new_primal;
        self.targets.push(Target::new("eternal", content, true));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collective
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collective {
    pub id: String,
    pub members: Vec<Individual>,
    pub primal: f64,
    pub cohesion: f64,
    pub fragmentation: f64,
    pub excitation: f64,
    pub life_state: LifeState,
    pub targets: Vec<Target>,
}

impl Collective {
    pub fn new(id: &str, members: Vec<Individual>, primal: f64, cohesion: f64, fragmentation: f64) -> Self {
        Self {
            id: id.to_string(),
            members,
            primal,
            cohesion,
            fragmentation,
            excitation: 0.0,
            life_state: LifeState::Alive,
            targets: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life_state.is_alive()
    }

    pub fn active_targets(&self) -> (usize, bool) {
        active_targets(&self.targets)
    }

    pub fn transition_to(&mut self, next: LifeState) -> RuntimeResult<()> {
        transition(&self.id, &mut self.life_state, next)
    }

    pub fn alive_members(&self) -> impl Iterator<Item = &Individual> + '_ {
        self.members.iter().filter(|m| m.is_alive())
    }

    pub fn average_primal(&self) -> f64 {
        mean(&self.alive_members().map(|m| m.primal).collect::<Vec<_>>())
    }

    /// Excite every living member, then the collective itself. The
    /// collective feels the pressure at its members' mean resilience and
    /// converts excitation into primal strength in proportion to cohesion.
    /// Member extinctions are returned.
    pub fn excite(
        &mut self,
        f: &ExcitationFunction<'_>,
        env: &Environment,
        step: u64,
    ) -> RuntimeResult<Vec<ExtinctionRecord>> {
        let mut records = Vec::new();
        for member in self.members.iter_mut().filter(|m| m.is_alive()) {
            member.excite(f, env)?;
            if let Some(r) = member.check_survival(step)? {
                records.push(r);
            }
        }

        let resilience = mean(&self.alive_members().map(|m| m.resilience).collect::<Vec<_>>());
        let pressure = env.apply_pressure(resilience);
        self.excitation = f.compute(pressure)?;
        let balance = self.excitation * self.cohesion - pressure;
        self.primal = clip_unit(self.primal + PRIMAL_RATE * balance);
        Ok(records)
    }

    /// Extinct once primal strength is depleted or no member is left.
    pub fn check_survival(&mut self, step: u64) -> RuntimeResult<Option<ExtinctionRecord>> {
        if !self.is_alive() {
            return Ok(None);
        }
        let cause = if self.alive_members().next().is_none() {
            ExtinctionCause::MembersLost
        } else if self.primal <= EXTINCTION_THRESHOLD {
            ExtinctionCause::PrimalDepletion
        } else {
            return Ok(None);
        };
        self.transition_to(LifeState::Extinct)?;
        for t in &mut self.targets {
            t.active = false;
        }
        Ok(Some(ExtinctionRecord {
            entity: self.id.clone(),
            step,
            cause,
            primal_at_extinction: self.primal,
            related: self.members.iter().map(|m| m.id.clone()).collect(),
        }))
    }

    /// Build a shared target; every living member takes part in it.
    pub fn construct_target(&mut self, targets: &TargetEvaluator<'_>, content: &str) -> KernelResult<()> {
        for member in self.members.iter_mut().filter(|m| m.is_alive()) {
            member.primal = targets.collective_participation(member.primal, member.excitation_capacity)?;
        }
        self.targets.push(Target::new("collective", content, false));
        Ok(())
    }

    /// Drop every active target. Cohesion and fragmentation take the loss.
    pub fn lose_targets(&mut self, targets: &TargetEvaluator<'_>) -> KernelResult<usize> {
        let (lost, _) = self.active_targets();
        if lost == 0 {
            return Ok(0);
        }
        let effects = targets.target_loss_effects(lost, self.cohesion, self.fragmentation)?;
        self.cohesion = effects.new_cohesion;
        self.fragmentation = effects.new_fragmentation;
        self.targets.retain(|t| !t.active);
        Ok(lost)
    }

    pub fn join_eternal_target(&mut self, targets: &TargetEvaluator<'_>, content: &str) -> KernelResult<()> {
        let effect = targets.eternal_target_effect(true, self.primal)?;
        self.primal = effect.new_primal;
        self.cohesion = clip(self.cohesion + effect.cohesion_boost, 0.0, 1.0);
        self.targets.push(Target::new("eternal", content, true));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Individual(Individual),
    Collective(Collective),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Individual(i) => &i.id,
            Entity::Collective(c) => &c.id,
        }
    }

    pub fn life_state(&self) -> LifeState {
        match self {
            Entity::Individual(i) => i.life_state,
            Entity::Collective(c) => c.life_state,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life_state().is_alive()
    }

    pub fn primal(&self) -> f64 {
        match self {
            Entity::Individual(i) => i.primal,
            Entity::Collective(c) => c.primal,
        }
    }

    pub fn excitation(&self) -> f64 {
        match self {
            Entity::Individual(i) => i.excitation,
            Entity::Collective(c) => c.excitation,
        }
    }

    pub fn targets(&self) -> &[Target] {
        match self {
            Entity::Individual(i) => &i.targets,
            Entity::Collective(c) => &c.targets,
        }
    }

    pub fn active_targets(&self) -> (usize, bool) {
        active_targets(self.targets())
    }

    pub fn transition_to(&mut self, next: LifeState) -> RuntimeResult<()> {
        match self {
            Entity::Individual(i) => i.transition_to(next),
            Entity::Collective(c) => c.transition_to(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use falaw_kernel::config::{EliminationConfig, ExcitationConfig, TargetConfig};

    #[test]
    fn test_extinct_is_terminal() {
        for next in [LifeState::Alive, LifeState::Transitioning, LifeState::PseudoAlive] {
            assert!(!LifeState::Extinct.can_transition_to(next));
        }
        assert!(LifeState::Alive.can_transition_to(LifeState::Extinct));
        assert!(!LifeState::Alive.can_transition_to(LifeState::PseudoAlive));
        assert!(LifeState::Transitioning.can_transition_to(LifeState::PseudoAlive));
    }

    #[test]
    fn test_extinct_individual_cannot_die_twice() {
        let mut i = Individual::new("a", 0.05, 0.7, 0.6);
        assert!(i.check_survival(1).unwrap().is_some());
        assert_eq!(i.life_state, LifeState::Extinct);
        assert!(matches!(
            i.go_extinct(2, ExtinctionCause::Eliminated, vec![]),
            Err(RuntimeError::LifeTransition { .. })
        ));
    }

    #[test]
    fn test_pressure_uses_resilience() {
        let env = Environment::default();
        assert!((env.apply_pressure(0.6) - 0.12).abs() < 1e-12);
        assert_eq!(env.apply_pressure(1.0), 0.0);
    }

    #[test]
    fn test_excite_without_capacity_drains_primal() {
        let config = ExcitationConfig::default();
        let f = ExcitationFunction::new(&config);
        let env = Environment {
            pressure_level: 0.5,
            ..Environment::default()
        };
        let mut i = Individual::new("a", 0.5, 0.0, 0.0);
        let pressure = i.excite(&f, &env).unwrap();
        assert!((pressure - 0.5).abs() < 1e-12);
        assert!((i.primal - 0.45).abs() < 1e-12);
        assert!(i.excitation >= 0.05);
        assert!(i.is_starving(&env));
    }

    #[test]
    fn test_collective_dies_without_members() {
        let mut member = Individual::new("m", 0.05, 0.7, 0.6);
        member.check_survival(0).unwrap();
        let mut c = Collective::new("c", vec![member], 0.6, 0.6, 0.2);
        let record = c.check_survival(3).unwrap().unwrap();
        assert_eq!(record.cause, ExtinctionCause::MembersLost);
        assert_eq!(record.related, vec!["m".to_string()]);
    }

    #[test]
    fn test_lose_targets_fragments_collective() {
        let tc = TargetConfig::default();
        let ec = EliminationConfig::default();
        let te = TargetEvaluator::new(&tc, &ec);
        let mut c = Collective::new("c", vec![Individual::new("m", 0.5, 0.7, 0.6)], 0.6, 0.6, 0.2);
        c.construct_target(&te, "grow").unwrap();
        assert!(c.members[0].primal > 0.5);
        assert_eq!(c.lose_targets(&te).unwrap(), 1);
        assert!(c.cohesion < 0.6);
        assert!(c.fragmentation > 0.2);
        assert!(c.targets.is_empty());
        assert_eq!(c.lose_targets(&te).unwrap(), 0);
    }

    #[test]
    fn test_eternal_target_boosts_collective_cohesion() {
        let tc = TargetConfig::default();
        let ec = EliminationConfig::default();
        let te = TargetEvaluator::new(&tc, &ec);
        let mut c = Collective::new("c", vec![], 0.6, 0.6, 0.2);
        c.join_eternal_target(&te, "continuity").unwrap();
        assert!((c.primal - 0.7).abs() < 1e-12);
        assert!((c.cohesion - 0.75).abs() < 1e-12);
        assert_eq!(c.active_targets(), (1, true));
    }
}
