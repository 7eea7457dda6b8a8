pub mod definitions;
pub mod diagnostics;
pub mod engine;
pub mod handlers;
pub mod input;
pub mod loader;
pub mod params;
pub mod registry;
pub mod source;

// Re-exports for convenience
pub use definitions::{ActionDefinition, AddonDefinition, DefinitionCatalog};
pub use diagnostics::{DefinitionKind, Diagnostic, DiagnosticEntry, HandlerError, Rejection};
pub use engine::{Clock, Engine, EngineBuilder, ManualClock, MonotonicClock, ReloadReport};
pub use input::{InputBindings, InputState, KeyTrigger, KeyboardSnapshot};
pub use loader::ModSnapshot;
pub use params::{ParameterStore, merge, resolve};
pub use registry::{ActionRegistry, DispatchContext, Handler};
pub use source::{DirectorySource, Document, DocumentSource, MemorySource, ModFolders};

pub use loopmod_types::{EngineConfig, ParameterValue};
