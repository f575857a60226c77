//! Scenario definitions: built-in presets or JSON files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::Environment;
use crate::error::{RuntimeError, RuntimeResult};

pub const BUILTIN_NAMES: [&str; 4] = [
    "default",
    "survival_competition",
    "realignment_preparation",
    "complex_interaction",
];

/// Phenomena a scenario switches on. Only a few change the dynamics; the
/// rest are carried through to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phenomenon {
    Existence,
    Interaction,
    Competition,
    /// Collectives construct a shared target at setup.
    Cooperation,
    /// Starving individuals may eliminate weaker ones.
    Elimination,
    /// Every entity joins an eternal target at setup.
    EternalTarget,
    FieldFailure,
    ConsensusBreakdown,
    ConsensusFormation,
    ChaosEmergence,
    FieldInteraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntitySpec {
    Individual {
        #[serde(default = "one")]
        count: usize,
        #[serde(default = "half")]
        primal_strength: f64,
        #[serde(default = "default_capacity")]
        excitation_capacity: f64,
        #[serde(default = "default_resilience")]
        resilience: f64,
        #[serde(default = "individual_targets")]
        targets: Vec<String>,
    },
    Collective {
        #[serde(default = "one")]
        count: usize,
        #[serde(default = "default_min_members")]
        min_members: usize,
        #[serde(default = "default_collective_primal")]
        collective_primal: f64,
        #[serde(default = "default_cohesion")]
        cohesion: f64,
        #[serde(default = "default_fragmentation")]
        fragmentation: f64,
        #[serde(default = "collective_targets")]
        targets: Vec<String>,
    },
}

fn one() -> usize {
    1
}
fn half() -> f64 {
    0.5
}
fn default_capacity() -> f64 {
    0.7
}
fn default_resilience() -> f64 {
    0.6
}
fn default_min_members() -> usize {
    3
}
fn default_collective_primal() -> f64 {
    0.6
}
fn default_cohesion() -> f64 {
    0.6
}
fn default_fragmentation() -> f64 {
    0.2
}
fn individual_targets() -> Vec<String> {
    vec!["survive".to_string(), "grow".to_string()]
}
fn collective_targets() -> Vec<String> {
    vec!["maintain_cohesion".to_string(), "grow".to_string()]
}
fn default_steps() -> u64 {
    20
}

impl EntitySpec {
    pub fn individual(count: usize, primal_strength: f64) -> Self {
        EntitySpec::Individual {
            count,
            primal_strength,
            excitation_capacity: default_capacity(),
            resilience: default_resilience(),
            targets: individual_targets(),
        }
    }

    pub fn collective(count: usize, min_members: usize) -> Self {
        EntitySpec::Collective {
            count,
            min_members,
            collective_primal: default_collective_primal(),
            cohesion: default_cohesion(),
            fragmentation: default_fragmentation(),
            targets: collective_targets(),
        }
    }

    fn validate(&self, index: usize) -> RuntimeResult<()> {
        let unit = |name: &str, v: f64| -> RuntimeResult<()> {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(RuntimeError::InvalidScenario(format!(
                    "entities[{}].{} must lie in [0, 1], got {}",
                    index, name, v
                )))
            }
        };
        match self {
            EntitySpec::Individual {
                primal_strength,
                excitation_capacity,
                resilience,
                ..
            } => {
                unit("primal_strength", *primal_strength)?;
                unit("excitation_capacity", *excitation_capacity)?;
                unit("resilience", *resilience)
            }
            EntitySpec::Collective {
                min_members,
                collective_primal,
                cohesion,
                fragmentation,
                ..
            } => {
                if *min_members == 0 {
                    return Err(RuntimeError::InvalidScenario(format!(
                        "entities[{}].min_members must be at least 1",
                        index
                    )));
                }
                unit("collective_primal", *collective_primal)?;
                unit("cohesion", *cohesion)?;
                unit("fragmentation", *fragmentation)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub phenomena: Vec<Phenomenon>,
    #[serde(default)]
    pub environment: Environment,
    /// Degrade the environment every step.
    #[serde(default)]
    pub field_degradation: bool,
    #[serde(default = "default_steps")]
    pub steps: u64,
}

impl Scenario {
    /// A built-in name, else a path to a JSON scenario file.
    pub fn load(name_or_path: &str) -> RuntimeResult<Scenario> {
        if let Some(s) = Scenario::builtin(name_or_path) {
            return Ok(s);
        }
        let path = Path::new(name_or_path);
        if path.is_file() {
            return Scenario::from_file(path);
        }
        Err(RuntimeError::UnknownScenario(name_or_path.to_string()))
    }

    pub fn from_file(path: &Path) -> RuntimeResult<Scenario> {
        let text = fs::read_to_string(path)?;
        Scenario::from_json(&text)
    }

    pub fn from_json(text: &str) -> RuntimeResult<Scenario> {
        let scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn builtin(name: &str) -> Option<Scenario> {
        let scenario = match name {
            "default" => Scenario {
                name: "default".to_string(),
                description: "a few individuals existing side by side".to_string(),
                entities: vec![EntitySpec::individual(3, 0.5)],
                phenomena: vec![Phenomenon::Existence, Phenomenon::Interaction],
                environment: Environment::default(),
                field_degradation: false,
                steps: 20,
            },
            "survival_competition" => Scenario {
                name: "survival_competition".to_string(),
                description: "individuals and collectives compete for survival".to_string(),
                entities: vec![
                    EntitySpec::individual(5, 0.6),
                    EntitySpec::collective(2, 3),
                ],
                phenomena: vec![
                    Phenomenon::Competition,
                    Phenomenon::Cooperation,
                    Phenomenon::Elimination,
                ],
                environment: Environment {
                    pressure_level: 0.6,
                    resource_abundance: 0.4,
                    ..Environment::default()
                },
                field_degradation: false,
                steps: 50,
            },
            "realignment_preparation" => Scenario {
                name: "realignment_preparation".to_string(),
                description: "the field slowly fails and a realignment becomes necessary".to_string(),
                entities: vec![EntitySpec::individual(3, 0.4)],
                phenomena: vec![
                    Phenomenon::FieldFailure,
                    Phenomenon::ConsensusBreakdown,
                    Phenomenon::ChaosEmergence,
                ],
                environment: Environment {
                    stability: 0.4,
                    ..Environment::default()
                },
                field_degradation: true,
                steps: 30,
            },
            "complex_interaction" => Scenario {
                name: "complex_interaction".to_string(),
                description: "many entities, many phenomena".to_string(),
                entities: vec![
                    EntitySpec::individual(8, 0.5),
                    EntitySpec::collective(3, 4),
                ],
                phenomena: vec![
                    Phenomenon::Competition,
                    Phenomenon::Cooperation,
                    Phenomenon::Elimination,
                    Phenomenon::FieldInteraction,
                    Phenomenon::ConsensusFormation,
                ],
                environment: Environment::default(),
                field_degradation: false,
                steps: 100,
            },
            _ => return None,
        };
        Some(scenario)
    }

    pub fn has(&self, phenomenon: Phenomenon) -> bool {
        self.phenomena.contains(&phenomenon)
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        if self.name.trim().is_empty() {
            return Err(RuntimeError::InvalidScenario("name must not be empty".to_string()));
        }
        if self.steps == 0 {
            return Err(RuntimeError::InvalidScenario("steps must be at least 1".to_string()));
        }
        self.environment.validate()?;
        for (i, spec) in self.entities.iter().enumerate() {
            spec.validate(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        for name in BUILTIN_NAMES {
            let s = Scenario::load(name).unwrap();
            assert_eq!(s.name, name);
            s.validate().unwrap();
        }
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(matches!(
            Scenario::load("no_such_scenario"),
            Err(RuntimeError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_json_defaults() {
        let s = Scenario::from_json(
            r#"{"name": "tiny", "entities": [{"type": "individual", "count": 2}]}"#,
        )
        .unwrap();
        assert_eq!(s.steps, 20);
        assert_eq!(s.environment, Environment::default());
        assert_eq!(s.entities[0], EntitySpec::individual(2, 0.5));
    }

    #[test]
    fn test_json_rejects_unknown_fields_and_ranges() {
        assert!(matches!(
            Scenario::from_json(r#"{"name": "x", "entities": [], "colour": 1}"#),
            Err(RuntimeError::Json(_))
        ));
        assert!(matches!(
            Scenario::from_json(
                r#"{"name": "x", "entities": [{"type": "individual", "resilience": 1.5}]}"#
            ),
            Err(RuntimeError::InvalidScenario(_))
        ));
        assert!(matches!(
            Scenario::from_json(r#"{"name": "x", "entities": [], "steps": 0}"#),
            Err(RuntimeError::InvalidScenario(_))
        ));
    }
}
