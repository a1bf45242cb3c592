//! Built-in actions and the matcher that recognizes them
//!
//! ```text
//! typed keys → ActionMatcher::classify() → Complete | Ambiguous | Potential | NoMatch
//! ```
//!
//! Patterns mix literal keys with wildcards (`<count-digit>`,
//! `<any-character>`, `<register-name>`, `<range>`). Operators take a
//! `<range>`, which is an optional count followed by any motion or text
//! object of the catalog.

mod action;
mod catalog;
mod matcher;
mod pattern;

pub use action::{Action, ExecutionStrategy, PatternKind};
pub use catalog::vim_patterns;
pub use matcher::{ActionMatch, ActionMatcher, Captures, Classification, RangeCapture};
pub use pattern::{is_register_name, ActionPattern, PatternToken};
