//! Live trigger matching.
//!
//! The [`Engine`] owns the loaded definitions and a single rolling input
//! buffer. Each [`KeyEvent`] runs to completion and yields the edit ops for
//! any expansion it fired:
//! - characters extend the buffer and check no-end-char triggers at once
//! - terminators check the default table, then the case-insensitive table
//!   against the lower-cased buffer; both may fire on the same key
//! - backspace trims the buffer; other keys are ignored
//!
//! Interior (`?`) definitions are loaded but never matched.

mod matcher;

use tracing::{debug, warn};

use crate::context::ContextId;
use crate::definitions::{Definitions, TriggerClass};
use crate::input::{KeyEvent, Terminator};
use crate::render::{EditOp, RenderEnv, render};

use matcher::{MatchHit, find_match, resolve_context};

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("requested context \"{0}\" is not defined in the loaded definitions")]
    UnknownContext(String),
}

/// Matching state for one session.
#[derive(Debug)]
pub struct Engine {
    definitions: Definitions,
    buffer: String,
    requested_context: String,
    env: RenderEnv,
}

impl Engine {
    /// Create an engine resolving triggers from `requested_context` outward.
    ///
    /// The context name is not validated here; the first evaluation fails if
    /// it is unknown.
    pub fn new(definitions: Definitions, requested_context: impl Into<String>) -> Self {
        Self {
            definitions,
            buffer: String::new(),
            requested_context: requested_context.into(),
            env: RenderEnv::default(),
        }
    }

    /// Use a specific clock and environment for dynamic tokens.
    pub fn with_render_env(mut self, env: RenderEnv) -> Self {
        self.env = env;
        self
    }

    /// Characters typed since the last reset.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    pub fn requested_context(&self) -> &str {
        &self.requested_context
    }

    /// Swap in freshly loaded definitions and clear the buffer.
    pub fn replace_definitions(&mut self, definitions: Definitions) {
        self.definitions = definitions;
        self.buffer.clear();
    }

    /// Process one event in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownContext`] whenever a match is evaluated
    /// and the requested context does not exist.
    pub fn handle(&mut self, event: KeyEvent) -> Result<Vec<EditOp>, EngineError> {
        let ops = match event {
            KeyEvent::Backspace => {
                self.buffer.pop();
                Vec::new()
            }
            KeyEvent::Other => Vec::new(),
            KeyEvent::Char(ch) => {
                self.buffer.push(ch);
                self.on_char()?
            }
            KeyEvent::Terminator(terminator) => self.on_terminator(terminator)?,
        };
        debug!(
            buffer = %self.buffer,
            len = self.buffer.chars().count(),
            ops = ops.len(),
            "handled {event:?}"
        );
        Ok(ops)
    }

    fn active_context(&self) -> Result<ContextId, EngineError> {
        resolve_context(&self.definitions, &self.requested_context)
    }

    fn on_char(&mut self) -> Result<Vec<EditOp>, EngineError> {
        let context = self.active_context()?;
        let Some(hit) = find_match(&self.definitions, TriggerClass::NoEndChar, &self.buffer, context)
        else {
            return Ok(Vec::new());
        };
        let matched = std::mem::take(&mut self.buffer);
        Ok(self.expand(hit, &matched, None))
    }

    fn on_terminator(&mut self, terminator: Terminator) -> Result<Vec<EditOp>, EngineError> {
        let typed = std::mem::take(&mut self.buffer);
        let context = self.active_context()?;

        let mut ops = Vec::new();
        if let Some(hit) = find_match(&self.definitions, TriggerClass::Default, &typed, context) {
            ops.extend(self.expand(hit, &typed, Some(terminator)));
        }
        let lowered = typed.to_lowercase();
        if let Some(hit) =
            find_match(&self.definitions, TriggerClass::CaseInsensitive, &lowered, context)
        {
            ops.extend(self.expand(hit, &typed, Some(terminator)));
        }
        Ok(ops)
    }

    fn expand(&self, hit: MatchHit, matched: &str, terminator: Option<Terminator>) -> Vec<EditOp> {
        let Some(definition) = self.definitions.table(hit.class).get(hit.index) else {
            warn!(
                class = ?hit.class,
                index = hit.index,
                buffer = matched,
                "matched trigger is missing from its table"
            );
            return Vec::new();
        };
        debug!(
            trigger = %definition.key,
            line = definition.line,
            class = ?definition.class,
            "expanding hotstring"
        );
        render(definition, matched, terminator, &self.env)
    }
}

/// Pure transition: feed `event` to `engine`, returning it with the ops produced.
///
/// # Errors
///
/// See [`Engine::handle`]; the engine is dropped with the error.
pub fn consume_event(
    mut engine: Engine,
    event: KeyEvent,
) -> Result<(Engine, Vec<EditOp>), EngineError> {
    let ops = engine.handle(event)?;
    Ok((engine, ops))
}
