// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. definitions::Definitions)
    clippy::module_name_repetitions
)]

//! # Hotstrings
//!
//! Expands typed abbreviations into longer text, in the style of classic
//! hotstring expanders.
//!
//! - Definition files in the `:OPTIONS:TRIGGER::EXPANSION` format
//! - End-character, immediate and case-insensitive triggers
//! - Nested contexts that override definitions for a subset of triggers
//! - Escape directives (`{left 2}`) and date/time/environment tokens
//!
//! ## Architecture
//!
//! Loading happens once, matching happens per keystroke:
//! - **Definitions**: immutable trigger tables and the context tree
//! - **Engine**: one rolling buffer, one event at a time
//! - **Render**: erase count plus the substituted output
//! - **Session**: event source in, edit ops out
//!
//! ## Modules
//!
//! - [`definitions`]: Definition file parsing
//! - [`context`]: Named scopes and nearest-ancestor resolution
//! - [`engine`]: Trigger matching state machine
//! - [`render`]: Expansion rendering and dynamic tokens
//! - [`input`]: Keystroke events
//! - [`session`]: Event loop, sources and sinks
//! - [`watcher`]: Definitions hot reload
//! - [`config`]: Session configuration

pub mod config;
pub mod context;
pub mod definitions;
pub mod engine;
pub mod input;
pub mod render;
pub mod session;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::definitions::{Definitions, LoadError, LoadOptions};
    pub use crate::engine::{Engine, EngineError, consume_event};
    pub use crate::input::{KeyEvent, Terminator};
    pub use crate::render::{ControlAction, EditOp, Token};
    pub use crate::session::{EditSink, EventSource, Session};
}
