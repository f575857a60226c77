//! FaLaw Kernel: Element intensities
//!
//! Per-call input to the tension and possibility evaluators. The map may
//! omit elements; omitted elements carry no weight.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arithmetic::mean;
use crate::element::Element;
use crate::error::{ensure_unit, KernelError, KernelResult};

/// Validated mapping Element → intensity in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Element, f64>", into = "BTreeMap<Element, f64>")]
pub struct ElementIntensityMap {
    values: BTreeMap<Element, f64>,
}

impl ElementIntensityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every element at the same intensity.
    pub fn uniform(value: f64) -> KernelResult<Self> {
        Self::try_from_pairs(Element::ALL.iter().map(|e| (*e, value)))
    }

    pub fn try_from_pairs<I>(pairs: I) -> KernelResult<Self>
    where
        I: IntoIterator<Item = (Element, f64)>,
    {
        let mut map = Self::new();
        for (element, value) in pairs {
            map.insert(element, value)?;
        }
        Ok(map)
    }

    /// Insert or replace one intensity. Rejects values outside `[0, 1]`.
    pub fn insert(&mut self, element: Element, value: f64) -> KernelResult<()> {
        let v = ensure_unit(&format!("intensity of {}", element), value)?;
        self.values.insert(element, v);
        Ok(())
    }

    pub fn get(&self, element: Element) -> Option<f64> {
        self.values.get(&element).copied()
    }

    /// Iterate in element index order.
    pub fn iter(&self) -> impl Iterator<Item = (Element, f64)> + '_ {
        self.values.iter().map(|(e, v)| (*e, *v))
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the supplied intensities; 0 for an empty map.
    pub fn mean(&self) -> f64 {
        mean(&self.values())
    }

    /// Fail on the first element (index order) that has no intensity.
    pub fn require_all(&self) -> KernelResult<()> {
        match Element::ALL.iter().find(|e| !self.values.contains_key(e)) {
            Some(missing) => Err(KernelError::InputDomain(format!(
                "missing intensity for required element {}",
                missing
            ))),
            None => Ok(()),
        }
    }
}

impl TryFrom<BTreeMap<Element, f64>> for ElementIntensityMap {
    type Error = KernelError;

    fn try_from(values: BTreeMap<Element, f64>) -> KernelResult<Self> {
        Self::try_from_pairs(values)
    }
}

impl From<ElementIntensityMap> for BTreeMap<Element, f64> {
    fn from(map: ElementIntensityMap) -> Self {
        map.values
    }
}
