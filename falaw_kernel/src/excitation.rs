//! FaLaw Kernel: Excitation
//!
//! Pressure in `[0, 1]` to a bounded vitality value. Suppression rises
//! steeply with pressure; adaptation adds a gain that saturates below the
//! knee and tapers to zero above it.

use serde::{Deserialize, Serialize};

use crate::arithmetic::clip;
use crate::config::ExcitationConfig;
use crate::error::{ensure_unit, KernelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcitationBand {
    Collapsed,
    Inhibited,
    Passive,
    Active,
}

impl ExcitationBand {
    pub fn classify(excitation: f64) -> ExcitationBand {
        if excitation > 0.7 {
            ExcitationBand::Active
        } else if excitation > 0.3 {
            ExcitationBand::Passive
        } else if excitation > 0.1 {
            ExcitationBand::Inhibited
        } else {
            ExcitationBand::Collapsed
        }
    }
}

/// Intermediate terms of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcitationBreakdown {
    pub pressure: f64,
    pub suppression: f64,
    pub adaptation: f64,
    pub excitation: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ExcitationFunction<'a> {
    config: &'a ExcitationConfig,
}

impl<'a> ExcitationFunction<'a> {
    pub fn new(config: &'a ExcitationConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, pressure: f64) -> KernelResult<f64> {
        Ok(self.breakdown(pressure)?.excitation)
    }

    pub fn breakdown(&self, pressure: f64) -> KernelResult<ExcitationBreakdown> {
        let p = ensure_unit("pressure", pressure)?;
        let c = self.config;

        let suppression = 1.0 / (1.0 + (-c.steepness * (c.sensitivity * p - 1.0)).exp());

        let raw_gain = c.adaptive_capacity * (1.0 - (-c.resilience * p).exp());
        let adapt_gain = if p < c.adaptation_knee {
            raw_gain.min(c.adaptation_cap)
        } else {
            raw_gain * (1.0 - (p - c.adaptation_knee) / (1.0 - c.adaptation_knee))
        };
        let adaptation = 1.0 + adapt_gain.max(0.0);

        let excitation = clip(
            c.base * (1.0 - 0.8 * suppression) * adaptation,
            c.floor,
            c.ceiling,
        );

        Ok(ExcitationBreakdown {
            pressure: p,
            suppression,
            adaptation,
            excitation,
        })
    }

    pub fn band(&self, pressure: f64) -> KernelResult<ExcitationBand> {
        Ok(ExcitationBand::classify(self.compute(pressure)?))
    }
}
