//! Resolution memory for Synapse.
//!
//! The orchestrator records every fully successful resolution here, and the
//! reasoning planner recalls the most recent ones into its prompt so later
//! plans can build on what worked. The store keeps a bounded window of
//! recent entries; older ones are evicted first.

pub mod store;
pub mod types;

pub use store::{InMemoryResolutionMemory, ResolutionMemory};
pub use types::{Memory, MemoryConfig};
