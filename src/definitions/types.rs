//! Core definition types.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::context::{ContextId, ContextTree};

/// Which table a definition lives in. Classes do not combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerClass {
    /// Fires on a terminator, exact case.
    Default,
    /// Fires as soon as the last trigger character is typed (`*`).
    NoEndChar,
    /// Trigger inside a word (`?`). Tabled but never consulted by the matcher.
    Interior,
    /// Fires on a terminator against the lower-cased buffer (`C0`).
    CaseInsensitive,
}

impl TriggerClass {
    /// Whether a terminator keystroke completes this class of trigger.
    pub const fn ends_with_terminator(self) -> bool {
        !matches!(self, Self::NoEndChar)
    }
}

/// Per-definition modifier flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Emit the template without directive or token substitution (`L`).
    pub literal: bool,
    /// Do not replay the terminator after the expansion (`O`).
    pub omit_end_char: bool,
    /// Do not erase the typed trigger (`B0`).
    pub no_auto_backspace: bool,
}

/// A trigger as stored in a table.
#[derive(Debug, Clone)]
pub enum TriggerKey {
    /// Matches when the buffer equals the text.
    Literal(String),
    /// Matches when the pattern is found anywhere in the buffer.
    Pattern(Regex),
}

impl TriggerKey {
    pub fn matches(&self, buffer: &str) -> bool {
        match self {
            Self::Literal(text) => text == buffer,
            Self::Pattern(regex) => regex.is_match(buffer),
        }
    }

    /// Source text of the trigger, used as the table key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::Pattern(regex) => regex.as_str(),
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single trigger-to-expansion mapping.
#[derive(Debug, Clone)]
pub struct Definition {
    pub key: TriggerKey,
    /// Raw expansion template, unsubstituted.
    pub expansion: String,
    pub class: TriggerClass,
    pub modifiers: Modifiers,
    pub context: ContextId,
    /// 1-based source line
    pub line: usize,
}

/// Ordered mapping of `(trigger, context)` to definition.
///
/// A repeated pair replaces the earlier definition but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct TriggerTable {
    entries: Vec<Definition>,
    index: HashMap<(String, ContextId), usize>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, returning `true` when it replaced an earlier one.
    pub fn insert(&mut self, definition: Definition) -> bool {
        let slot = (definition.key.as_str().to_string(), definition.context);
        if let Some(&idx) = self.index.get(&slot) {
            self.entries[idx] = definition;
            return true;
        }
        self.index.insert(slot, self.entries.len());
        self.entries.push(definition);
        false
    }

    pub fn get(&self, idx: usize) -> Option<&Definition> {
        self.entries.get(idx)
    }

    /// Exact lookup by trigger text and owning context.
    pub fn lookup(&self, key: &str, context: ContextId) -> Option<&Definition> {
        self.index
            .get(&(key.to_string(), context))
            .and_then(|&idx| self.entries.get(idx))
    }

    /// Find the definition matching `buffer`, trying each context of `chain`
    /// in turn and, within a context, entries in insertion order.
    pub fn find(&self, buffer: &str, chain: impl IntoIterator<Item = ContextId>) -> Option<usize> {
        for context in chain {
            let hit = self
                .entries
                .iter()
                .position(|def| def.context == context && def.key.matches(buffer));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Options controlling how definition source is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Compile triggers as regular expressions (search semantics).
    pub regex_triggers: bool,
    /// Enable context markers and the `L` option.
    pub extensions: bool,
}

/// Everything the loader produces: four tables and the context tree.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub default: TriggerTable,
    pub no_end_char: TriggerTable,
    pub interior: TriggerTable,
    pub case_insensitive: TriggerTable,
    pub contexts: ContextTree,
}

impl Definitions {
    pub fn table(&self, class: TriggerClass) -> &TriggerTable {
        match class {
            TriggerClass::Default => &self.default,
            TriggerClass::NoEndChar => &self.no_end_char,
            TriggerClass::Interior => &self.interior,
            TriggerClass::CaseInsensitive => &self.case_insensitive,
        }
    }

    pub(crate) fn table_mut(&mut self, class: TriggerClass) -> &mut TriggerTable {
        match class {
            TriggerClass::Default => &mut self.default,
            TriggerClass::NoEndChar => &mut self.no_end_char,
            TriggerClass::Interior => &mut self.interior,
            TriggerClass::CaseInsensitive => &mut self.case_insensitive,
        }
    }

    /// Total definitions across all tables.
    pub fn len(&self) -> usize {
        self.default.len() + self.no_end_char.len() + self.interior.len() + self.case_insensitive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
