//! modal-keys - Vim-style modal key resolution
//!
//! This crate resolves a live stream of keys into editor actions under a
//! modal input model, with a user remapping layer that may be recursive,
//! ambiguous with built-in commands, and disambiguated by a timeout.

pub mod actions;
pub mod cli;
pub mod config;
pub mod config_paths;
pub mod executor;
pub mod keymap;
pub mod remap;
pub mod runtime;
pub mod session;
pub mod task_queue;
pub mod tracing;

// Re-export commonly used types
pub use actions::{Action, ActionMatcher, Classification};
pub use config::{ConfigError, Diagnostic, RemapConfig};
pub use executor::{ActionInvocation, CommandExecutor};
pub use keymap::{Key, KeySequence, Mode};
pub use remap::{RemapError, Remapper, Remapping};
pub use runtime::SessionHandle;
pub use session::Session;
pub use task_queue::TaskQueue;
