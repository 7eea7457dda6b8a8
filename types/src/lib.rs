//! Shared types for LoopMod: the loosely typed value tree passed to handlers
//! and the engine configuration.

pub mod config;
pub mod value;

pub use config::EngineConfig;
pub use value::{ParameterValue, ValueMap};
