//! Parameters and argument preparation
//!
//! Arguments reach a handler in two steps: definition-side arguments are
//! merged with the arguments supplied at trigger time ([`merge`]), then every
//! `@key` placeholder is substituted from the [`ParameterStore`]
//! ([`resolve`]).

mod merge;
mod resolver;
mod store;

pub use merge::merge;
pub use resolver::{Resolver, resolve, resolve_with_issues};
pub use store::{ParameterDiff, ParameterStore};
