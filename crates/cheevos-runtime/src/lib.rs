//! Trigger evaluation interface for oxidized-cheevos
//!
//! The rule engine that interprets trigger expressions is an external
//! collaborator. This crate defines the narrow interface the achievement
//! engine drives it through, plus the memory window it reads from.

pub mod format;
pub mod memory;
pub mod runtime;

pub use format::ValueFormat;
pub use memory::{MemoryAccessor, MemoryWindow, EXPOSED_MEMORY_SIZE};
pub use runtime::{RuntimeEvent, RuntimeEventKind, TriggerRuntime};
