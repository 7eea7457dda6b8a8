//! Add-on and action definitions, parsed from documents into catalogs.

mod action;
mod addon;
mod catalog;

pub use action::{ActionDefinition, normalize_id};
pub use addon::AddonDefinition;
pub use catalog::{ActionCatalog, AddonCatalog, DefinitionCatalog};
