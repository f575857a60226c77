//! Step-based simulation around one `FieldEngine`.
//!
//! Step order:
//!   1. settle entities left transitioning by the previous realignment
//!   2. degrade the environment (if the scenario asks for it)
//!   3. excite every living entity, then check survival
//!   4. at most one elimination (if the scenario enables it)
//!   5. observe the field, evaluate the regime, apply any realignment
//!   6. append the step event to the log
//!
//! Concurrency: `SharedSimulation` serializes access with a Mutex.

use std::sync::Mutex;

use falaw_kernel::arithmetic::{clip, clip_unit, mean};
use falaw_kernel::config::KernelConfig;
use falaw_kernel::element::Element;
use falaw_kernel::engine::FieldEngine;
use falaw_kernel::events::{RegimeActivity, RegimeEvent};
use falaw_kernel::hashing::{canonical_value, sha256_hex, to_bytes};
use falaw_kernel::intensity::ElementIntensityMap;
use falaw_kernel::possibility::PossibilityVector;
use falaw_kernel::regime::{FieldObservation, FieldState};
use falaw_kernel::tension::TensionComponents;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::entity::{
    Collective, Entity, Environment, ExtinctionCause, ExtinctionRecord, Individual, LifeState,
    Target,
};
use crate::error::RuntimeResult;
use crate::event_store::{Elimination, StepEvent, StepLog, STEP_SCHEMA_VERSION};
use crate::scenario::{EntitySpec, Phenomenon, Scenario};

/// Per-step environment drift under field degradation.
pub const DEGRADATION_RATE: f64 = 0.03;
/// Individuals one unit of resource abundance supports.
pub const CARRYING_CAPACITY: f64 = 10.0;
/// Share of the victim's primal strength the eliminator absorbs.
pub const ELIMINATION_GAIN: f64 = 0.3;
/// Below this primal strength an eliminator acts out of survival.
pub const SURVIVAL_PRIMAL: f64 = 0.3;
/// How far a realignment pulls primal strength toward the residue.
pub const REALIGNMENT_PULL: f64 = 0.5;
pub const INDIVIDUAL_PRIMAL_FLOOR: f64 = 0.1;
pub const COLLECTIVE_PRIMAL_FLOOR: f64 = 0.2;
/// Settled once this many regime events fall within the window.
pub const SETTLE_EVENTS: usize = 3;
pub const SETTLE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    AllExtinct,
    RegimeSettled,
    StepLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub steps_run: u64,
    pub termination: TerminationReason,
    pub entities_total: usize,
    pub entities_alive: usize,
    pub survivors: Vec<String>,
    pub total_primal: f64,
    pub avg_primal: f64,
    pub regime_events: usize,
    pub eliminations: usize,
    pub extinctions: usize,
    pub final_field: FieldState,
    pub final_tension: TensionComponents,
    pub possibility: PossibilityVector,
    pub regime_activity: RegimeActivity,
    pub kernel_fingerprint: String,
}

pub struct Simulation {
    scenario: Scenario,
    engine: FieldEngine,
    environment: Environment,
    entities: Vec<Entity>,
    log: StepLog,
}

impl Simulation {
    /// Build the engine and populate entities from the scenario.
    pub fn new(config: KernelConfig, scenario: Scenario) -> RuntimeResult<Self> {
        scenario.validate()?;
        let engine = FieldEngine::new(config)?;
        let mut sim = Self {
            environment: scenario.environment,
            scenario,
            engine,
            entities: Vec::new(),
            log: StepLog::new(),
        };
        sim.setup()?;
        info!(
            scenario = %sim.scenario.name,
            entities = sim.entities.len(),
            degradation = sim.scenario.field_degradation,
            "simulation ready"
        );
        Ok(sim)
    }

    fn setup(&mut self) -> RuntimeResult<()> {
        let specs = self.scenario.entities.clone();
        for spec in &specs {
            match spec {
                EntitySpec::Individual {
                    count,
                    primal_strength,
                    excitation_capacity,
                    resilience,
                    targets,
                } => {
                    for _ in 0..*count {
                        let id = format!("individual_{}", self.entities.len() + 1);
                        let mut i = Individual::new(&id, *primal_strength, *excitation_capacity, *resilience);
                        i.targets = targets.iter().map(|t| Target::new("initial", t, false)).collect();
                        self.entities.push(Entity::Individual(i));
                    }
                }
                EntitySpec::Collective {
                    count,
                    min_members,
                    collective_primal,
                    cohesion,
                    fragmentation,
                    targets,
                } => {
                    for _ in 0..*count {
                        let id = format!("collective_{}", self.entities.len() + 1);
                        let members = (0..*min_members)
                            .map(|m| Individual::new(&format!("{}_member_{}", id, m + 1), 0.5, 0.7, 0.6))
                            .collect();
                        let mut c = Collective::new(&id, members, *collective_primal, *cohesion, *fragmentation);
                        c.targets = targets.iter().map(|t| Target::new("collective", t, false)).collect();
                        self.entities.push(Entity::Collective(c));
                    }
                }
            }
        }

        let cooperation = self.scenario.has(Phenomenon::Cooperation);
        let eternal = self.scenario.has(Phenomenon::EternalTarget);
        let te = self.engine.target();
        for entity in &mut self.entities {
            match entity {
                Entity::Individual(i) if eternal => i.join_eternal_target(&te, "continuity")?,
                Entity::Collective(c) => {
                    if cooperation {
                        c.construct_target(&te, "shared_survival")?;
                    }
                    if eternal {
                        c.join_eternal_target(&te, "continuity")?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn engine(&self) -> &FieldEngine {
        &self.engine
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn step_log(&self) -> &StepLog {
        &self.log
    }

    pub fn steps_run(&self) -> u64 {
        self.log.last_sequence()
    }

    pub fn alive_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_alive()).count()
    }

    /// Run one step and record it.
    pub fn step(&mut self) -> RuntimeResult<StepEvent> {
        let sequence = self.log.last_sequence() + 1;

        for entity in self.entities.iter_mut() {
            if entity.life_state() == LifeState::Transitioning {
                entity.transition_to(LifeState::Alive)?;
            }
        }

        if self.scenario.field_degradation {
            self.environment.degrade(DEGRADATION_RATE);
        }

        let mut extinctions = Vec::new();
        let f = self.engine.excitation();
        let env = self.environment;
        for entity in self.entities.iter_mut().filter(|e| e.is_alive()) {
            match entity {
                Entity::Individual(i) => {
                    i.excite(&f, &env)?;
                    extinctions.extend(i.check_survival(sequence)?);
                }
                Entity::Collective(c) => {
                    extinctions.extend(c.excite(&f, &env, sequence)?);
                    extinctions.extend(c.check_survival(sequence)?);
                }
            }
        }

        let eliminations = if self.scenario.has(Phenomenon::Elimination) {
            self.eliminate(sequence, &mut extinctions)?
        } else {
            Vec::new()
        };

        let (observation, intensities) = self.observe()?;
        let tension = self.engine.tension().evaluate(&intensities);
        let regime = self.engine.evaluate_regime(&observation, &intensities)?;
        if let Some(event) = &regime {
            self.realign(event)?;
        }

        let event = StepEvent {
            schema_version: STEP_SCHEMA_VERSION,
            sequence,
            alive: self.alive_count(),
            total: self.entities.len(),
            field: observation.field,
            excitation: observation.excitation,
            intensities,
            tension_aggregate: tension.aggregate.value,
            tension_level: tension.aggregate.level,
            regime_sequence: regime.as_ref().map(|e| e.sequence),
            strategy: regime.as_ref().map(|e| e.strategy),
            eliminations,
            extinctions,
        };

        debug!(
            step = sequence,
            alive = event.alive,
            tension = event.tension_aggregate,
            regime = ?event.strategy,
            "step complete"
        );

        self.log.append(event.clone())?;
        Ok(event)
    }

    /// Step until a termination condition holds or `max_steps` (default:
    /// the scenario's step count) have run.
    pub fn run(&mut self, max_steps: Option<u64>) -> RuntimeResult<SimulationReport> {
        let limit = max_steps.unwrap_or(self.scenario.steps);
        let mut reason = TerminationReason::StepLimit;
        for _ in 0..limit {
            self.step()?;
            if let Some(r) = self.termination() {
                reason = r;
                break;
            }
        }
        let report = self.report(reason)?;
        info!(
            scenario = %report.scenario,
            steps = report.steps_run,
            termination = ?report.termination,
            alive = report.entities_alive,
            regime_events = report.regime_events,
            "simulation finished"
        );
        Ok(report)
    }

    /// No entity alive, or the regime fired often enough recently that the
    /// field counts as settled.
    pub fn termination(&self) -> Option<TerminationReason> {
        if self.log.is_empty() {
            return None;
        }
        if self.alive_count() == 0 {
            Some(TerminationReason::AllExtinct)
        } else if self.log.recent_regime_events(SETTLE_WINDOW) >= SETTLE_EVENTS {
            Some(TerminationReason::RegimeSettled)
        } else {
            None
        }
    }

    /// Field observation and element intensities for the current state.
    ///
    /// Cohesion and fragmentation average the environment with every
    /// living collective; primal flow, excitation and target clarity
    /// average the living entities.
    pub fn observe(&self) -> RuntimeResult<(FieldObservation, ElementIntensityMap)> {
        let alive: Vec<&Entity> = self.entities.iter().filter(|e| e.is_alive()).collect();
        let collectives: Vec<&Collective> = alive
            .iter()
            .filter_map(|e| match e {
                Entity::Collective(c) => Some(c),
                Entity::Individual(_) => None,
            })
            .collect();

        let env = &self.environment;
        let cohesion = mean(
            &std::iter::once(env.stability)
                .chain(collectives.iter().map(|c| c.cohesion))
                .collect::<Vec<_>>(),
        );
        let fragmentation = mean(
            &std::iter::once(env.chaos_potential)
                .chain(collectives.iter().map(|c| c.fragmentation))
                .collect::<Vec<_>>(),
        );
        let primal_flow = mean(&alive.iter().map(|e| e.primal()).collect::<Vec<_>>());
        let excitation = mean(&alive.iter().map(|e| e.excitation()).collect::<Vec<_>>());

        let te = self.engine.target();
        let target_clarity = clip_unit(mean(
            &alive
                .iter()
                .map(|e| {
                    let (n, high) = e.active_targets();
                    te.target_factor(n, high).clarity
                })
                .collect::<Vec<_>>(),
        ));
        let has_active_targets = alive.iter().any(|e| e.active_targets().0 > 0);

        let field = FieldState::new(
            clip_unit(cohesion),
            clip_unit(fragmentation),
            clip_unit(primal_flow),
            target_clarity,
        )?;
        let observation = FieldObservation {
            field,
            excitation,
            has_active_targets,
        };

        let ceiling = self.engine.config().excitation.ceiling;
        let intensities = ElementIntensityMap::try_from_pairs([
            (Element::Qian, target_clarity),
            (Element::She, clip_unit(excitation / ceiling)),
            (Element::Xian, field.cohesion),
            (Element::Li, field.fragmentation),
            (Element::Jie, env.stability),
            (Element::San, 1.0 - field.cohesion),
            (Element::Huan, env.resource_abundance),
            (Element::Kun, env.chaos_potential),
        ])?;
        Ok((observation, intensities))
    }

    /// One elimination per step at most. A starving individual acts first;
    /// otherwise the strongest acts while living individuals exceed what
    /// the environment's resources carry. The victim is the weakest other
    /// individual no stronger than the eliminator.
    fn eliminate(
        &mut self,
        step: u64,
        extinctions: &mut Vec<ExtinctionRecord>,
    ) -> RuntimeResult<Vec<Elimination>> {
        let env = self.environment;
        let living: Vec<(usize, f64, bool)> = self
            .entities
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| match e {
                Entity::Individual(i) if i.is_alive() => Some((idx, i.primal, i.is_starving(&env))),
                _ => None,
            })
            .collect();
        if living.len() < 2 {
            return Ok(Vec::new());
        }

        let capacity = (env.resource_abundance * CARRYING_CAPACITY).round() as usize;
        let agent = living.iter().find(|(_, _, starving)| *starving).or_else(|| {
            if living.len() > capacity {
                living.iter().min_by(|a, b| b.1.total_cmp(&a.1))
            } else {
                None
            }
        });
        let Some(&(a, agent_primal, _)) = agent else {
            return Ok(Vec::new());
        };
        let victim = living
            .iter()
            .filter(|(idx, primal, _)| *idx != a && *primal <= agent_primal)
            .min_by(|x, y| x.1.total_cmp(&y.1));
        let Some(&(v, victim_primal, _)) = victim else {
            return Ok(Vec::new());
        };

        let reason = if agent_primal < SURVIVAL_PRIMAL {
            "survival"
        } else {
            "resource competition"
        };
        let justification = self.engine.target().elimination_justification(
            reason,
            agent_primal,
            victim_primal,
            false,
            false,
        )?;
        if !justification.justified {
            return Ok(Vec::new());
        }

        let eliminator = self.entities[a].id().to_string();
        let eliminated = self.entities[v].id().to_string();
        if let Entity::Individual(victim) = &mut self.entities[v] {
            extinctions.push(victim.go_extinct(step, ExtinctionCause::Eliminated, vec![eliminator.clone()])?);
        }
        if let Entity::Individual(agent) = &mut self.entities[a] {
            agent.primal = clip_unit(agent.primal + ELIMINATION_GAIN * victim_primal);
            agent.targets.push(Target::new("elimination", &eliminated, false));
        }

        info!(
            step,
            %eliminator,
            %eliminated,
            reason,
            score = justification.score,
            "elimination"
        );
        Ok(vec![Elimination {
            eliminator,
            eliminated,
            reason: reason.to_string(),
            justification,
        }])
    }

    /// Apply a regime event: every living entity adopts the strategy's
    /// targets, collectives lose their old ones, primal strength moves
    /// toward the residue, and all living entities are transitioning
    /// until the next step.
    fn realign(&mut self, event: &RegimeEvent) -> RuntimeResult<()> {
        let residue = event.assessment.residue;
        let targets: Vec<Target> = event.outcome.targets.iter().map(Target::from).collect();
        let te = self.engine.target();

        for entity in self.entities.iter_mut().filter(|e| e.is_alive()) {
            match entity {
                Entity::Individual(i) => {
                    i.primal = clip(
                        i.primal + REALIGNMENT_PULL * (residue - i.primal),
                        INDIVIDUAL_PRIMAL_FLOOR,
                        1.0,
                    );
                    i.targets = targets.clone();
                }
                Entity::Collective(c) => {
                    c.lose_targets(&te)?;
                    c.primal = clip(
                        c.primal + REALIGNMENT_PULL * (residue - c.primal),
                        COLLECTIVE_PRIMAL_FLOOR,
                        1.0,
                    );
                    c.targets = targets.clone();
                }
            }
            entity.transition_to(LifeState::Transitioning)?;
        }
        Ok(())
    }

    pub fn report(&self, termination: TerminationReason) -> RuntimeResult<SimulationReport> {
        let (observation, intensities) = self.observe()?;
        let alive: Vec<&Entity> = self.entities.iter().filter(|e| e.is_alive()).collect();
        let total_primal: f64 = alive.iter().map(|e| e.primal()).sum();
        let events = self.log.events();

        Ok(SimulationReport {
            scenario: self.scenario.name.clone(),
            steps_run: self.steps_run(),
            termination,
            entities_total: self.entities.len(),
            entities_alive: alive.len(),
            survivors: alive.iter().map(|e| e.id().to_string()).collect(),
            total_primal,
            avg_primal: if alive.is_empty() {
                0.0
            } else {
                total_primal / alive.len() as f64
            },
            regime_events: self.engine.monitor().log().len(),
            eliminations: events.iter().map(|e| e.eliminations.len()).sum(),
            extinctions: events.iter().map(|e| e.extinctions.len()).sum(),
            final_field: observation.field,
            final_tension: self.engine.tension().evaluate(&intensities),
            possibility: self.engine.possibility().project(&intensities),
            regime_activity: self.engine.monitor().log().activity(SETTLE_WINDOW),
            kernel_fingerprint: self.engine.fingerprint(),
        })
    }

    /// SHA-256 over the kernel fingerprint, the step log and the entities.
    pub fn fingerprint(&self) -> String {
        let mut root = Map::new();
        root.insert(
            "kernel_fingerprint".to_string(),
            Value::String(self.engine.fingerprint()),
        );
        root.insert("scenario".to_string(), Value::String(self.scenario.name.clone()));
        root.insert(
            "steps".to_string(),
            Value::Array(self.log.events().iter().map(canonical_value).collect()),
        );
        root.insert("entities".to_string(), canonical_value(&self.entities));
        sha256_hex(&to_bytes(&Value::Object(root)))
    }
}

/// Thread-safe simulation handle using Mutex.
pub struct SharedSimulation {
    inner: Mutex<Simulation>,
}

impl SharedSimulation {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            inner: Mutex::new(simulation),
        }
    }

    /// Step under lock.
    pub fn step(&self) -> RuntimeResult<StepEvent> {
        let mut sim = self.inner.lock().expect("Simulation lock poisoned");
        sim.step()
    }

    pub fn run(&self, max_steps: Option<u64>) -> RuntimeResult<SimulationReport> {
        let mut sim = self.inner.lock().expect("Simulation lock poisoned");
        sim.run(max_steps)
    }

    pub fn fingerprint(&self) -> String {
        let sim = self.inner.lock().expect("Simulation lock poisoned");
        sim.fingerprint()
    }

    pub fn steps_run(&self) -> u64 {
        let sim = self.inner.lock().expect("Simulation lock poisoned");
        sim.steps_run()
    }

    pub fn into_inner(self) -> Simulation {
        self.inner.into_inner().expect("Simulation lock poisoned")
    }
}
