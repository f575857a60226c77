//! FaLaw Kernel: Elements
//!
//! The closed set of eight categories whose mutual influence the
//! transfer matrix encodes. Index order is part of the kernel identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Number of elements. The matrix is `ELEMENT_COUNT × ELEMENT_COUNT`.
pub const ELEMENT_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Qian,
    She,
    Xian,
    Li,
    Jie,
    San,
    Huan,
    Kun,
}

impl Element {
    /// All elements in index order.
    pub const ALL: [Element; ELEMENT_COUNT] = [
        Element::Qian,
        Element::She,
        Element::Xian,
        Element::Li,
        Element::Jie,
        Element::San,
        Element::Huan,
        Element::Kun,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> KernelResult<Element> {
        Element::ALL.get(index).copied().ok_or_else(|| {
            KernelError::InputDomain(format!(
                "element index {} out of range 0..{}",
                index, ELEMENT_COUNT
            ))
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Qian => "qian",
            Element::She => "she",
            Element::Xian => "xian",
            Element::Li => "li",
            Element::Jie => "jie",
            Element::San => "san",
            Element::Huan => "huan",
            Element::Kun => "kun",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Element::Qian => "goal establishment and standardization",
            Element::She => "observation and scanning",
            Element::Xian => "field immersion and viscosity",
            Element::Li => "separation and exit",
            Element::Jie => "boundary and limitation",
            Element::San => "diffusion and dissipation",
            Element::Huan => "exchange and conversion",
            Element::Kun => "revolution and reconstruction",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
