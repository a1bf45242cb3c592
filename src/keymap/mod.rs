//! Canonical keys, key notation and editor modes
//!
//! Everything downstream (action matcher, remap tables, remapper) compares
//! [`Key`] values, never strings. Configured key names are normalized once,
//! at load time, through [`parse_sequence`] / [`parse_key`].
//!
//! # Architecture
//!
//! ```text
//! host event → Key → Session::handle_key_event() → Remapper / ActionMatcher
//! "<leader>w" → parse_sequence() → [Key('\\'), Key('w')] → RemapTable
//! ```

mod mode;
mod notation;
mod types;

pub use mode::{MapMode, Mode};
pub use notation::{parse_key, parse_leader, parse_sequence, NotationError, DEFAULT_LEADER};
pub use types::{display_keys, Key, KeyCode, KeySequence, Modifiers};
