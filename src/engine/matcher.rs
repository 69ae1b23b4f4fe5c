use crate::context::ContextId;
use crate::definitions::{Definitions, TriggerClass};

use super::EngineError;

/// Position of a matched definition inside its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MatchHit {
    pub class: TriggerClass,
    pub index: usize,
}

/// Resolve the requested context name against the registry.
pub(super) fn resolve_context(defs: &Definitions, name: &str) -> Result<ContextId, EngineError> {
    defs.contexts
        .lookup(name)
        .ok_or_else(|| EngineError::UnknownContext(name.to_string()))
}

/// Search one table for `buffer`, nearest enclosing context first.
pub(super) fn find_match(
    defs: &Definitions,
    class: TriggerClass,
    buffer: &str,
    context: ContextId,
) -> Option<MatchHit> {
    defs.table(class)
        .find(buffer, defs.contexts.ancestry(context))
        .map(|index| MatchHit { class, index })
}
