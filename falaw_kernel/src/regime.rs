//! FaLaw Kernel: Regime Monitor
//!
//! Crisis detection over a caller-supplied field state. On a trigger the
//! monitor classifies the crisis, picks one recovery strategy, executes it
//! and appends a `RegimeEvent` to its log.
//!
//! Pipeline per evaluation:
//!   1. residue from excitation and primal flow
//!   2. crisis classification and urgency
//!   3. threshold breaches; fire on `min_conditions` or assessment
//!   4. strategy selection and execution
//!   5. append to the log

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RegimeConfig;
use crate::error::{ensure_unit, KernelError, KernelResult};
use crate::events::{RegimeEvent, RegimeLog, SCHEMA_VERSION};
use crate::tension::TransitionReadiness;

// ---------------------------------------------------------------------------
// Field state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentationLevel {
    Intact,
    Cracking,
    Fragmenting,
    Dissolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub cohesion: f64,
    pub fragmentation: f64,
    pub primal_flow: f64,
    pub target_clarity: f64,
}

impl FieldState {
    pub fn new(
        cohesion: f64,
        fragmentation: f64,
        primal_flow: f64,
        target_clarity: f64,
    ) -> KernelResult<Self> {
        let state = Self {
            cohesion,
            fragmentation,
            primal_flow,
            target_clarity,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> KernelResult<()> {
        ensure_unit("cohesion", self.cohesion)?;
        ensure_unit("fragmentation", self.fragmentation)?;
        ensure_unit("primal_flow", self.primal_flow)?;
        ensure_unit("target_clarity", self.target_clarity)?;
        Ok(())
    }

    pub fn fragmentation_level(&self) -> FragmentationLevel {
        if self.fragmentation < 0.2 {
            FragmentationLevel::Intact
        } else if self.fragmentation < 0.5 {
            FragmentationLevel::Cracking
        } else if self.fragmentation < 0.8 {
            FragmentationLevel::Fragmenting
        } else {
            FragmentationLevel::Dissolving
        }
    }

    pub fn is_maintainable(&self) -> bool {
        self.cohesion > 0.3 && self.primal_flow > 0.2
    }
}

/// Everything the monitor reads about the world for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldObservation {
    pub field: FieldState,
    /// Current primal excitation of the observed entities; finite, `>= 0`.
    pub excitation: f64,
    pub has_active_targets: bool,
}

impl FieldObservation {
    pub fn validate(&self) -> KernelResult<()> {
        self.field.validate()?;
        if !self.excitation.is_finite() || self.excitation < 0.0 {
            return Err(KernelError::InputDomain(format!(
                "excitation must be finite and >= 0, got {}",
                self.excitation
            )));
        }
        Ok(())
    }

    /// `excitation · flow`, or `excitation · 0.3` when flow is below 0.1;
    /// capped at 1.
    pub fn residue(&self) -> f64 {
        let flow = if self.field.primal_flow < 0.1 {
            0.3
        } else {
            self.field.primal_flow
        };
        (self.excitation * flow).min(1.0)
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisType {
    Primal,
    Destructive,
    Transitional,
    Creative,
}

impl CrisisType {
    fn base_urgency(self) -> f64 {
        match self {
            CrisisType::Primal => 0.8,
            CrisisType::Destructive => 0.6,
            CrisisType::Transitional => 0.4,
            CrisisType::Creative => 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidancePriority {
    Low,
    Medium,
    High,
    Immediate,
}

impl GuidancePriority {
    pub fn from_urgency(urgency: f64) -> GuidancePriority {
        if urgency > 0.8 {
            GuidancePriority::Immediate
        } else if urgency > 0.5 {
            GuidancePriority::High
        } else if urgency > 0.3 {
            GuidancePriority::Medium
        } else {
            GuidancePriority::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrisisAssessment {
    pub crisis_type: CrisisType,
    pub field: FieldState,
    pub urgency: f64,
    pub residue: f64,
    pub priority: GuidancePriority,
    /// Set by the assessment alone, independent of breach count.
    pub requires_transition: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachKind {
    CohesionBelow,
    TargetClarityBelow,
    PrimalFlowBelow,
    FragmentationAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    pub kind: BreachKind,
    pub value: f64,
    pub threshold: f64,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredAspect {
    HistoricalConstraints,
    StructuralComplexity,
    ExistingPatterns,
    PredeterminedPaths,
    NonEssentialComplexities,
    AncillaryStructures,
    EverythingExceptPrimalPrinciple,
    StructuralIntegrity,
    TargetComplexity,
    HistoricalContinuity,
    Fragmentation,
    Inconsistencies,
    BrokenConnections,
}

/// Never repaired by any strategy.
const ALWAYS_IGNORED: [IgnoredAspect; 3] = [
    IgnoredAspect::Fragmentation,
    IgnoredAspect::Inconsistencies,
    IgnoredAspect::BrokenConnections,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreStrength {
    Weak,
    Moderate,
    Strong,
}

impl CoreStrength {
    pub fn from_residue(residue: f64) -> CoreStrength {
        if residue > 0.7 {
            CoreStrength::Strong
        } else if residue > 0.3 {
            CoreStrength::Moderate
        } else {
            CoreStrength::Weak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTarget {
    pub kind: String,
    pub content: String,
    pub priority: String,
}

impl StrategyTarget {
    fn new(kind: &str, content: &str, priority: &str) -> Self {
        Self {
            kind: kind.to_string(),
            content: content.to_string(),
            priority: priority.to_string(),
        }
    }

    /// `critical`, `highest` and `high` count as high priority.
    pub fn is_high_priority(&self) -> bool {
        matches!(self.priority.as_str(), "critical" | "highest" | "high")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRule {
    pub rule: String,
    pub enforcement: String,
}

impl StrategyRule {
    fn new(rule: &str, enforcement: &str) -> Self {
        Self {
            rule: rule.to_string(),
            enforcement: enforcement.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: RecoveryStrategy,
    pub core: CoreStrength,
    pub targets: Vec<StrategyTarget>,
    pub rules: Vec<StrategyRule>,
    pub principles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    PrimalRealignment,
    EmergentGuidance,
    RadicalSimplification,
    CompleteRestart,
}

impl RecoveryStrategy {
    /// Declaration order; selection falls back to the first applicable.
    pub const ALL: [RecoveryStrategy; 4] = [
        RecoveryStrategy::PrimalRealignment,
        RecoveryStrategy::EmergentGuidance,
        RecoveryStrategy::RadicalSimplification,
        RecoveryStrategy::CompleteRestart,
    ];

    pub fn id(self) -> &'static str {
        match self {
            RecoveryStrategy::PrimalRealignment => "primal_realignment",
            RecoveryStrategy::EmergentGuidance => "emergent_guidance",
            RecoveryStrategy::RadicalSimplification => "radical_simplification",
            RecoveryStrategy::CompleteRestart => "complete_restart",
        }
    }

    pub fn applies(self, assessment: &CrisisAssessment) -> bool {
        match self {
            RecoveryStrategy::PrimalRealignment => assessment.residue > 0.3,
            RecoveryStrategy::EmergentGuidance => assessment.crisis_type == CrisisType::Creative,
            RecoveryStrategy::RadicalSimplification => assessment.field.fragmentation > 0.7,
            RecoveryStrategy::CompleteRestart => assessment.residue < 0.1,
        }
    }

    pub fn base_ignores(self) -> &'static [IgnoredAspect] {
        use IgnoredAspect::*;
        match self {
            RecoveryStrategy::PrimalRealignment => &[HistoricalConstraints, StructuralComplexity],
            RecoveryStrategy::EmergentGuidance => &[ExistingPatterns, PredeterminedPaths],
            RecoveryStrategy::RadicalSimplification => {
                &[NonEssentialComplexities, AncillaryStructures]
            }
            RecoveryStrategy::CompleteRestart => &[EverythingExceptPrimalPrinciple],
        }
    }

    pub fn execute(self, assessment: &CrisisAssessment) -> StrategyOutcome {
        let core = CoreStrength::from_residue(assessment.residue);
        let (targets, rules, principles) = match self {
            RecoveryStrategy::PrimalRealignment => primal_realignment(core),
            RecoveryStrategy::EmergentGuidance => emergent_guidance(assessment),
            RecoveryStrategy::RadicalSimplification => radical_simplification(assessment),
            RecoveryStrategy::CompleteRestart => complete_restart(),
        };
        StrategyOutcome {
            strategy: self,
            core,
            targets,
            rules,
            principles,
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

type Artifacts = (Vec<StrategyTarget>, Vec<StrategyRule>, Vec<String>);

fn primal_realignment(core: CoreStrength) -> Artifacts {
    let mut rules = vec![StrategyRule::new("primal_excitation_priority", "strict")];
    let target = match core {
        CoreStrength::Strong => {
            rules.push(StrategyRule::new("maintain_primal_flow", "high"));
            rules.push(StrategyRule::new("align_targets_to_primal", "medium"));
            StrategyTarget::new("primal_realignment", "realign to the strong primal core", "highest")
        }
        CoreStrength::Moderate => {
            rules.push(StrategyRule::new("protect_primal_residue", "highest"));
            rules.push(StrategyRule::new("gradual_recovery", "medium"));
            StrategyTarget::new("primal_recovery", "recover from the primal residue", "high")
        }
        CoreStrength::Weak => {
            rules.push(StrategyRule::new("survival_first", "absolute"));
            rules.push(StrategyRule::new("minimal_structure", "strict"));
            StrategyTarget::new("primal_survival", "keep the most basic excitation alive", "critical")
        }
    };
    let principles = match core {
        CoreStrength::Strong => vec!["sustained_excitation", "flow_maintenance", "target_alignment"],
        CoreStrength::Moderate => vec!["basic_excitation", "minimal_flow", "survival_targets"],
        CoreStrength::Weak => vec!["existence_as_excitation", "fundamental_life_principle"],
    };
    (vec![target], rules, to_strings(&principles))
}

fn emergent_guidance(assessment: &CrisisAssessment) -> Artifacts {
    let mut traits: Vec<&str> = Vec::new();
    if assessment.residue > 0.0 {
        traits.extend(["clustering", "flow_tendencies", "intensity_variation"]);
    }
    if assessment.field.fragmentation < 0.9 {
        traits.extend(["fragment_sizes", "separation_distances", "connection_remnants"]);
    }
    if assessment.crisis_type == CrisisType::Creative {
        traits.extend(["novelty_potential", "recombination_possibilities", "emerging_order"]);
    }

    let mut principles: Vec<&str> = [
        ("clustering", "build_on_existing_clusters"),
        ("flow_tendencies", "follow_natural_flow_tendencies"),
        ("novelty_potential", "encourage_novel_combinations"),
        ("emerging_order", "support_emerging_order"),
    ]
    .iter()
    .filter(|(t, _)| traits.contains(t))
    .map(|(_, p)| *p)
    .collect();
    if principles.is_empty() {
        principles = vec!["observe_and_adapt", "minimal_intervention"];
    }

    let targets = principles
        .iter()
        .map(|p| StrategyTarget::new("adaptive_target", p, "medium"))
        .collect();
    let rules = vec![StrategyRule::new("guidance_emerges_from_patterns", "adaptive")];
    (targets, rules, to_strings(&principles))
}

fn radical_simplification(assessment: &CrisisAssessment) -> Artifacts {
    let field = &assessment.field;
    let mut essence: Vec<&str> = Vec::new();
    if assessment.residue > 0.0 {
        essence.extend(["primal_excitation_is_fundamental", "existence_requires_primal_flow"]);
    }
    if field.cohesion > 0.0 {
        essence.push("cohesion_enables_function");
    }
    if field.primal_flow > 0.0 {
        essence.push("flow_enables_vitality");
    }
    if field.target_clarity > 0.0 {
        essence.push("clarity_enables_direction");
    }
    essence.extend(["guidance_emerges_from_chaos", "simplify_to_essence"]);

    let mut targets = Vec::new();
    if essence.contains(&"primal_excitation_is_fundamental") {
        targets.push(StrategyTarget::new(
            "maintain_primal_excitation",
            "primal flow above 0.1",
            "highest",
        ));
    }
    if essence.contains(&"existence_requires_primal_flow") {
        targets.push(StrategyTarget::new(
            "ensure_minimal_primal_flow",
            "flow continuity",
            "high",
        ));
    }
    targets.push(StrategyTarget::new(
        "adapt_to_emergent_conditions",
        "stay flexible",
        "medium",
    ));

    let rules = vec![StrategyRule::new("minimal_structure", "strict")];
    (targets, rules, to_strings(&essence))
}

fn complete_restart() -> Artifacts {
    let principles = [
        "existence_is_excitation",
        "life_requires_primal_flow",
        "survival_depends_on_excitation_maintenance",
        "simplest_form_is_most_resilient",
        "guidance_comes_from_acknowledging_chaos",
    ];
    let rules = [
        "follow_principles_not_precedents",
        "allow_emergence_over_imposition",
        "simplicity_over_complexity",
        "adaptability_over_rigidity",
    ]
    .iter()
    .map(|r| StrategyRule::new(r, "principle"))
    .collect();
    (Vec::new(), rules, to_strings(&principles))
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RegimeMonitor {
    config: RegimeConfig,
    evaluations: u64,
    log: RegimeLog,
}

impl RegimeMonitor {
    pub fn new(config: &RegimeConfig) -> Self {
        Self {
            config: config.clone(),
            evaluations: 0,
            log: RegimeLog::default(),
        }
    }

    pub fn log(&self) -> &RegimeLog {
        &self.log
    }

    /// Number of `evaluate` calls so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Classification and urgency only. No side effects.
    pub fn assess(&self, observation: &FieldObservation) -> KernelResult<CrisisAssessment> {
        observation.validate()?;
        let field = observation.field;
        let residue = observation.residue();
        let crisis_type = classify(observation, residue);

        let mut urgency = 0.0;
        if !field.is_maintainable() {
            urgency += 0.6;
        }
        if field.fragmentation > 0.7 {
            urgency += 0.3;
        }
        if field.target_clarity < 0.2 {
            urgency += 0.2;
        }
        urgency += crisis_type.base_urgency();
        urgency += (1.0 - residue) * 0.4;
        let urgency = urgency.min(1.0);

        let requires_transition = crisis_type == CrisisType::Primal
            || urgency > self.config.transition_urgency
            || field.fragmentation_level() == FragmentationLevel::Dissolving;

        Ok(CrisisAssessment {
            crisis_type,
            field,
            urgency,
            residue,
            priority: GuidancePriority::from_urgency(urgency),
            requires_transition,
        })
    }

    pub fn breaches(&self, field: &FieldState) -> Vec<ThresholdBreach> {
        let c = &self.config;
        let checks = [
            (BreachKind::CohesionBelow, field.cohesion, c.cohesion_threshold, field.cohesion < c.cohesion_threshold),
            (
                BreachKind::TargetClarityBelow,
                field.target_clarity,
                c.target_clarity_threshold,
                field.target_clarity < c.target_clarity_threshold,
            ),
            (
                BreachKind::PrimalFlowBelow,
                field.primal_flow,
                c.primal_flow_threshold,
                field.primal_flow < c.primal_flow_threshold,
            ),
            (
                BreachKind::FragmentationAbove,
                field.fragmentation,
                c.fragmentation_threshold,
                field.fragmentation > c.fragmentation_threshold,
            ),
        ];
        checks
            .iter()
            .filter(|(_, _, _, hit)| *hit)
            .map(|(kind, value, threshold, _)| ThresholdBreach {
                kind: *kind,
                value: *value,
                threshold: *threshold,
            })
            .collect()
    }

    /// Under high urgency the radical strategies win, restart first;
    /// otherwise the first applicable in declaration order.
    pub fn select_strategy(&self, assessment: &CrisisAssessment) -> RecoveryStrategy {
        let applicable: Vec<RecoveryStrategy> = RecoveryStrategy::ALL
            .iter()
            .copied()
            .filter(|s| s.applies(assessment))
            .collect();

        if assessment.urgency > self.config.radical_urgency {
            for preferred in [
                RecoveryStrategy::CompleteRestart,
                RecoveryStrategy::RadicalSimplification,
            ] {
                if applicable.contains(&preferred) {
                    return preferred;
                }
            }
        }
        applicable
            .first()
            .copied()
            .unwrap_or(RecoveryStrategy::PrimalRealignment)
    }

    /// Strategy ignores, then state-dependent ones, then the fixed three.
    /// First occurrence wins.
    pub fn ignored_aspects(
        &self,
        assessment: &CrisisAssessment,
        strategy: RecoveryStrategy,
    ) -> Vec<IgnoredAspect> {
        let mut aspects: Vec<IgnoredAspect> = strategy.base_ignores().to_vec();
        if assessment.field.fragmentation > 0.7 {
            aspects.push(IgnoredAspect::StructuralIntegrity);
        }
        if assessment.field.target_clarity < 0.3 {
            aspects.push(IgnoredAspect::TargetComplexity);
        }
        if assessment.residue < 0.3 {
            aspects.push(IgnoredAspect::HistoricalContinuity);
        }
        aspects.extend(ALWAYS_IGNORED);

        let mut seen = Vec::with_capacity(aspects.len());
        for a in aspects {
            if !seen.contains(&a) {
                seen.push(a);
            }
        }
        seen
    }

    /// Count this evaluation; on a trigger, execute a strategy and append
    /// the resulting event.
    pub fn evaluate(
        &mut self,
        observation: &FieldObservation,
        tension: &TransitionReadiness,
    ) -> KernelResult<Option<RegimeEvent>> {
        let assessment = self.assess(observation)?;
        self.evaluations += 1;

        let breaches = self.breaches(&observation.field);
        let conditions_met = breaches.len();
        let fires = conditions_met >= self.config.min_conditions || assessment.requires_transition;

        debug!(
            evaluation = self.evaluations,
            conditions_met,
            urgency = assessment.urgency,
            crisis = ?assessment.crisis_type,
            fires,
            "regime evaluated"
        );

        if !fires {
            return Ok(None);
        }

        let strategy = self.select_strategy(&assessment);
        let outcome = strategy.execute(&assessment);
        let ignored_aspects = self.ignored_aspects(&assessment, strategy);

        let event = RegimeEvent {
            schema_version: SCHEMA_VERSION,
            sequence: self.log.len() as u64 + 1,
            evaluation: self.evaluations,
            breaches,
            conditions_met,
            min_conditions: self.config.min_conditions,
            assessment,
            tension_aggregate: tension.aggregate,
            readiness: tension.readiness,
            strategy,
            ignored_aspects,
            outcome,
        };

        info!(
            sequence = event.sequence,
            %strategy,
            crisis = ?assessment.crisis_type,
            urgency = assessment.urgency,
            residue = assessment.residue,
            "regime transition"
        );

        self.log.append(event.clone());
        Ok(Some(event))
    }
}

fn classify(observation: &FieldObservation, residue: f64) -> CrisisType {
    let field = &observation.field;
    if !field.is_maintainable() {
        return CrisisType::Primal;
    }
    if field.target_clarity < 0.2 && !observation.has_active_targets {
        return if residue > 0.5 {
            CrisisType::Transitional
        } else {
            CrisisType::Destructive
        };
    }
    if field.fragmentation > 0.6 {
        if residue > 0.4 {
            CrisisType::Transitional
        } else {
            CrisisType::Destructive
        }
    } else if residue > 0.6 {
        CrisisType::Creative
    } else {
        CrisisType::Transitional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::approx_eq;

    fn observation(c: f64, f: f64, p: f64, t: f64, excitation: f64) -> FieldObservation {
        FieldObservation {
            field: FieldState::new(c, f, p, t).unwrap(),
            excitation,
            has_active_targets: false,
        }
    }

    fn calm() -> TransitionReadiness {
        TransitionReadiness {
            aggregate: 0.3,
            readiness: 0.05,
            components_above_high: 0,
        }
    }

    #[test]
    fn test_field_state_rejects_out_of_range() {
        assert!(matches!(
            FieldState::new(1.2, 0.0, 0.5, 0.5),
            Err(KernelError::InputDomain(_))
        ));
    }

    #[test]
    fn test_fragmentation_levels() {
        let at = |f| FieldState::new(0.5, f, 0.5, 0.5).unwrap().fragmentation_level();
        assert_eq!(at(0.1), FragmentationLevel::Intact);
        assert_eq!(at(0.2), FragmentationLevel::Cracking);
        assert_eq!(at(0.79), FragmentationLevel::Fragmenting);
        assert_eq!(at(0.8), FragmentationLevel::Dissolving);
    }

    #[test]
    fn test_residue_low_flow_uses_floor() {
        let o = observation(0.5, 0.1, 0.05, 0.5, 0.9);
        assert!(approx_eq(o.residue(), 0.27));
        let o = observation(0.5, 0.1, 0.5, 0.5, 0.9);
        assert!(approx_eq(o.residue(), 0.45));
        let o = observation(0.5, 0.1, 1.0, 0.5, 1.2);
        assert_eq!(o.residue(), 1.0);
    }

    #[test]
    fn test_classification_paths() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        let kind = |o: FieldObservation| m.assess(&o).unwrap().crisis_type;
        assert_eq!(kind(observation(0.2, 0.1, 0.9, 0.9, 1.0)), CrisisType::Primal);
        assert_eq!(kind(observation(0.8, 0.1, 0.9, 0.1, 0.3)), CrisisType::Destructive);
        assert_eq!(kind(observation(0.8, 0.1, 0.9, 0.1, 0.9)), CrisisType::Transitional);
        assert_eq!(kind(observation(0.8, 0.7, 0.9, 0.9, 0.3)), CrisisType::Destructive);
        assert_eq!(kind(observation(0.8, 0.1, 0.9, 0.9, 0.9)), CrisisType::Creative);
        assert_eq!(kind(observation(0.8, 0.1, 0.5, 0.9, 0.9)), CrisisType::Transitional);
    }

    #[test]
    fn test_urgency_creative_calm_field() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        let a = m.assess(&observation(0.9, 0.05, 0.9, 0.9, 1.0)).unwrap();
        assert_eq!(a.crisis_type, CrisisType::Creative);
        // 0.2 + (1 - 0.9) * 0.4
        assert!(approx_eq(a.urgency, 0.24));
        assert_eq!(a.priority, GuidancePriority::Low);
        assert!(!a.requires_transition);
    }

    #[test]
    fn test_full_breach_fires_complete_restart() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        let o = observation(0.1, 0.9, 0.1, 0.1, 0.2);
        let event = m.evaluate(&o, &calm()).unwrap().expect("event");
        assert_eq!(event.conditions_met, 4);
        assert!(event.assessment.residue < 0.1);
        assert_eq!(event.strategy, RecoveryStrategy::CompleteRestart);
        assert_eq!(event.outcome.principles.len(), 5);
        assert_eq!(event.outcome.rules.len(), 4);
        assert_eq!(m.log().len(), 1);
        assert_eq!(event.sequence, 1);
    }

    #[test]
    fn test_calm_field_no_event() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        let o = observation(0.9, 0.05, 0.9, 0.9, 1.0);
        assert!(m.evaluate(&o, &calm()).unwrap().is_none());
        assert_eq!(m.evaluations(), 1);
        assert!(m.log().is_empty());
    }

    #[test]
    fn test_invalid_observation_not_counted() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        let mut o = observation(0.9, 0.05, 0.9, 0.9, 1.0);
        o.excitation = f64::NAN;
        assert!(m.evaluate(&o, &calm()).is_err());
        assert_eq!(m.evaluations(), 0);
    }

    #[test]
    fn test_selection_defaults_to_realignment() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        // residue 0.2: nothing applies
        let a = m.assess(&observation(0.5, 0.3, 0.5, 0.5, 0.4)).unwrap();
        assert!(RecoveryStrategy::ALL.iter().all(|s| !s.applies(&a)));
        assert_eq!(m.select_strategy(&a), RecoveryStrategy::PrimalRealignment);
    }

    #[test]
    fn test_primal_realignment_core_bins() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        let a = m.assess(&observation(0.2, 0.3, 0.9, 0.5, 1.0)).unwrap();
        let out = RecoveryStrategy::PrimalRealignment.execute(&a);
        assert_eq!(out.core, CoreStrength::Strong);
        assert_eq!(out.targets[0].kind, "primal_realignment");
        assert_eq!(out.rules[0].rule, "primal_excitation_priority");
        assert_eq!(out.rules.len(), 3);
        assert_eq!(CoreStrength::from_residue(0.5), CoreStrength::Moderate);
        assert_eq!(CoreStrength::from_residue(0.3), CoreStrength::Weak);
    }

    #[test]
    fn test_emergent_guidance_targets() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        let a = m.assess(&observation(0.8, 0.1, 0.9, 0.9, 0.9)).unwrap();
        let out = RecoveryStrategy::EmergentGuidance.execute(&a);
        assert_eq!(
            out.principles,
            vec![
                "build_on_existing_clusters",
                "follow_natural_flow_tendencies",
                "encourage_novel_combinations",
                "support_emerging_order"
            ]
        );
        assert_eq!(out.targets.len(), 4);
    }

    #[test]
    fn test_ignored_aspects_order_and_dedup() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        let a = m.assess(&observation(0.1, 0.9, 0.1, 0.1, 0.2)).unwrap();
        let aspects = m.ignored_aspects(&a, RecoveryStrategy::CompleteRestart);
        assert_eq!(
            aspects,
            vec![
                IgnoredAspect::EverythingExceptPrimalPrinciple,
                IgnoredAspect::StructuralIntegrity,
                IgnoredAspect::TargetComplexity,
                IgnoredAspect::HistoricalContinuity,
                IgnoredAspect::Fragmentation,
                IgnoredAspect::Inconsistencies,
                IgnoredAspect::BrokenConnections,
            ]
        );
    }

    #[test]
    fn test_high_urgency_prefers_radical_simplification() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        // residue 0.25, destructive, urgency capped at 1
        let a = m.assess(&observation(0.5, 0.9, 0.5, 0.5, 0.5)).unwrap();
        assert_eq!(a.crisis_type, CrisisType::Destructive);
        assert_eq!(a.urgency, 1.0);
        assert_eq!(m.select_strategy(&a), RecoveryStrategy::RadicalSimplification);

        // realignment applies too but comes second under high urgency
        let a = m.assess(&observation(0.5, 0.9, 0.5, 0.5, 0.8)).unwrap();
        assert!(RecoveryStrategy::PrimalRealignment.applies(&a));
        assert!(a.urgency > 0.8);
        assert_eq!(m.select_strategy(&a), RecoveryStrategy::RadicalSimplification);
    }

    #[test]
    fn test_moderate_urgency_takes_first_applicable() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        // transitional, residue 0.9: urgency 0.3 + 0.4 + 0.04
        let a = m.assess(&observation(0.5, 0.9, 0.9, 0.5, 1.0)).unwrap();
        assert_eq!(a.crisis_type, CrisisType::Transitional);
        assert!(approx_eq(a.urgency, 0.74));
        assert!(RecoveryStrategy::RadicalSimplification.applies(&a));
        assert_eq!(m.select_strategy(&a), RecoveryStrategy::PrimalRealignment);
    }

    #[test]
    fn test_creative_crisis_offers_emergent_guidance() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        // a creative crisis always carries residue above 0.6, so
        // realignment applies as well and is declared first
        let a = m.assess(&observation(0.8, 0.1, 0.9, 0.9, 0.9)).unwrap();
        assert_eq!(a.crisis_type, CrisisType::Creative);
        assert!(RecoveryStrategy::EmergentGuidance.applies(&a));
        assert!(RecoveryStrategy::PrimalRealignment.applies(&a));
        assert_eq!(m.select_strategy(&a), RecoveryStrategy::PrimalRealignment);
    }

    #[test]
    fn test_radical_simplification_keeps_essence() {
        let m = RegimeMonitor::new(&RegimeConfig::default());
        let a = m.assess(&observation(0.5, 0.9, 0.5, 0.5, 0.5)).unwrap();
        let out = RecoveryStrategy::RadicalSimplification.execute(&a);
        assert_eq!(out.core, CoreStrength::Weak);
        assert_eq!(
            out.principles,
            vec![
                "primal_excitation_is_fundamental",
                "existence_requires_primal_flow",
                "cohesion_enables_function",
                "flow_enables_vitality",
                "clarity_enables_direction",
                "guidance_emerges_from_chaos",
                "simplify_to_essence"
            ]
        );
        let kinds: Vec<&str> = out.targets.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "maintain_primal_excitation",
                "ensure_minimal_primal_flow",
                "adapt_to_emergent_conditions"
            ]
        );
        assert!(out.targets[0].is_high_priority());
        assert_eq!(out.rules[0].rule, "minimal_structure");

        let aspects = m.ignored_aspects(&a, RecoveryStrategy::RadicalSimplification);
        assert_eq!(aspects[0], IgnoredAspect::NonEssentialComplexities);
        assert!(aspects.contains(&IgnoredAspect::Fragmentation));
    }
}
