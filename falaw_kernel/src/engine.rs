//! FaLaw Kernel: Engine
//!
//! Composition root. Built once from a `KernelConfig`; owns the matrix,
//! the influence cache and the regime monitor, and hands out borrowing
//! evaluators. Mutation goes through `set_flow`, which re-validates the
//! matrix and rebuilds the cache.

use tracing::info;

use crate::config::KernelConfig;
use crate::element::Element;
use crate::error::KernelResult;
use crate::events::RegimeEvent;
use crate::excitation::ExcitationFunction;
use crate::hashing::canonical_hash;
use crate::influence::InfluenceResolver;
use crate::intensity::ElementIntensityMap;
use crate::invariants::validate_matrix;
use crate::matrix::TransferMatrix;
use crate::possibility::PossibilityProjector;
use crate::regime::{FieldObservation, RegimeMonitor};
use crate::target::TargetEvaluator;
use crate::tension::TensionEvaluator;

#[derive(Debug, Clone)]
pub struct FieldEngine {
    config: KernelConfig,
    matrix: TransferMatrix,
    influence: InfluenceResolver,
    monitor: RegimeMonitor,
}

impl FieldEngine {
    /// Validate the configuration, build the matrix and the cache.
    pub fn new(config: KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        let matrix = TransferMatrix::build(&config.matrix)?;
        let influence = InfluenceResolver::new(&matrix, &config.influence)?;
        let monitor = RegimeMonitor::new(&config.regime);
        info!(
            kernel_version = crate::KERNEL_VERSION,
            min_conditions = config.regime.min_conditions,
            "field engine ready"
        );
        Ok(Self {
            config,
            matrix,
            influence,
            monitor,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn matrix(&self) -> &TransferMatrix {
        &self.matrix
    }

    pub fn influence(&self) -> &InfluenceResolver {
        &self.influence
    }

    pub fn tension(&self) -> TensionEvaluator<'_> {
        TensionEvaluator::new(&self.matrix, &self.config.tension)
    }

    pub fn possibility(&self) -> PossibilityProjector<'_> {
        PossibilityProjector::new(&self.config.possibility)
    }

    pub fn excitation(&self) -> ExcitationFunction<'_> {
        ExcitationFunction::new(&self.config.excitation)
    }

    pub fn target(&self) -> TargetEvaluator<'_> {
        TargetEvaluator::new(&self.config.target, &self.config.elimination)
    }

    pub fn monitor(&self) -> &RegimeMonitor {
        &self.monitor
    }

    /// Set one matrix cell. Panics if the matrix fails validation
    /// afterwards; `set` itself never leaves a broken row behind.
    pub fn set_flow(&mut self, source: Element, target: Element, value: f64) -> KernelResult<()> {
        self.matrix.set(source, target, value)?;
        validate_matrix(self.matrix.cells());
        self.influence = InfluenceResolver::new(&self.matrix, &self.config.influence)?;
        Ok(())
    }

    /// Evaluate tension on `intensities` and run the regime monitor.
    /// The map must cover all eight elements.
    pub fn evaluate_regime(
        &mut self,
        observation: &FieldObservation,
        intensities: &ElementIntensityMap,
    ) -> KernelResult<Option<RegimeEvent>> {
        intensities.require_all()?;
        let readiness = TensionEvaluator::new(&self.matrix, &self.config.tension)
            .transition_readiness(intensities);
        self.monitor.evaluate(observation, &readiness)
    }

    /// SHA-256 over the matrix and the regime history.
    pub fn fingerprint(&self) -> String {
        canonical_hash(&self.matrix, self.monitor.log())
    }
}
