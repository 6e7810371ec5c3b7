//! Common types and traits shared across Synapse crates.
//!
//! This crate provides the data model that flows through the orchestration
//! pipeline: the inbound [`Disruption`], the validated [`Plan`], the
//! per-instruction [`SpecialistResult`] and the final [`Resolution`].

pub mod disruption;
pub mod error;
pub mod plan;
pub mod resolution;
pub mod traits;

pub use disruption::{Customer, DeliveryDetails, Disruption, Driver, Merchant};
pub use error::{PlanningError, Result, SynapseError};
pub use plan::{Instruction, Plan, SpecialistId, WorkflowType};
pub use resolution::{
    Resolution, ResolutionStatus, ResultStatus, SpecialistResult, PANICKED, TIMEOUT, UNROUTABLE,
};
pub use traits::Specialist;
