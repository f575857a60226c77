#![forbid(unsafe_code)]

//! FaLaw kernel: transfer matrix over eight elements, the metrics derived
//! from it, and the regime monitor that turns those metrics into
//! realignment events. Pure and deterministic; no I/O.

/// Kernel v1. Part of every fingerprint.
pub const KERNEL_VERSION: u32 = 1;

pub mod arithmetic;
pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod events;
pub mod excitation;
pub mod hashing;
pub mod influence;
pub mod intensity;
pub mod invariants;
pub mod matrix;
pub mod possibility;
pub mod regime;
pub mod target;
pub mod tension;

pub use config::KernelConfig;
pub use element::Element;
pub use engine::FieldEngine;
pub use error::{KernelError, KernelResult};
pub use intensity::ElementIntensityMap;
pub use regime::{FieldObservation, FieldState};
