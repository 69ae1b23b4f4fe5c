//! Hotstring definition loading.
//!
//! This module handles:
//! - Parsing definition source into the four trigger tables
//! - Building the context tree from `;; [Context "NAME"]` markers
//! - Load errors that must abort startup

mod parser;
mod types;

use std::path::PathBuf;

pub use parser::{load_file, parse};
pub use types::{
    Definition, Definitions, LoadOptions, Modifiers, TriggerClass, TriggerKey, TriggerTable,
};

/// Fatal problems found while loading definitions.
///
/// Malformed definition lines are not errors; they are skipped.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read definitions {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: EndContext \"{found}\" does not close the open context \"{expected}\"")]
    MismatchedEndContext {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}: EndContext \"{name}\" with no open context")]
    EndContextAtRoot { line: usize, name: String },
}
