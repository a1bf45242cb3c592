//! User remappings layered over the built-in actions
//!
//! # Architecture
//!
//! ```text
//! RemapConfig → RemapTables (per family × recursive/non-recursive)
//!                    ↓
//! Session::handle_key_event → Remapper::send_key ─┬→ buffer + arm timer
//!                                                ├→ schedule `after` / run `commands`
//!                                                └→ not handled → ActionMatcher
//!        ↑                                        ↓
//!        └──────── Session drains the ReplayStack ┘
//! ```

mod error;
mod map_command;
mod pending;
mod remapper;
mod remapping;
mod replay;
mod state;
mod table;

pub use error::{ActionError, Outcome, RemapError};
pub use map_command::{parse_map_command, MapCommand, MapCommandError, MapCommandKind};
pub use pending::{ManualScheduler, PendingResolution, Scheduler, TimerId};
pub use remapper::{RemapHost, RemapSettings, Remapper, DEFAULT_MAX_MAP_DEPTH, DEFAULT_TIMEOUT};
pub use remapping::{CommandInvocation, RemapAction, Remapping};
pub use replay::{Boundary, Replay, ReplayKind, ReplayStack, Step};
pub use state::{ExpansionGuard, RemapExecutionState, StopSignal};
pub use table::{RemapMatch, RemapTable, RemapTables};
