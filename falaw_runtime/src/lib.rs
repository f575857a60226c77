#![forbid(unsafe_code)]

//! FaLaw runtime: step-based simulation around the kernel.
//!
//! Entities, scenarios, the in-memory step log, replay and drift checks.
//! Every metric and every regime decision is delegated to the kernel.

pub mod drift;
pub mod entity;
pub mod error;
pub mod event_store;
pub mod replay;
pub mod scenario;
pub mod simulation;

pub use error::{RuntimeError, RuntimeResult};
pub use scenario::Scenario;
pub use simulation::{SharedSimulation, Simulation, SimulationReport};
