//! Line-oriented parser for hotstring definition files.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::LoadError;
use super::types::{Definition, Definitions, LoadOptions, Modifiers, TriggerClass, TriggerKey};
use crate::context::ContextId;

/// `:OPTIONS:TRIGGER::EXPANSION`, trigger is the shortest run up to the first `::`.
static DEFINITION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(?P<options>[^:]*):(?P<trigger>.+?)::(?P<expansion>.*)$")
        .expect("definition line pattern is valid")
});

static CONTEXT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^;;\s*\[(?P<kind>Context|EndContext)\s+"(?P<name>[^"]*)"\s*\]\s*$"#)
        .expect("context marker pattern is valid")
});

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?P<name>\S+)\s*(?P<content>.*)$").expect("directive pattern is valid")
});

/// Load and parse a definitions file.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be read, or any error
/// [`parse`] reports.
pub fn load_file(path: &Path, options: LoadOptions) -> Result<Definitions, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source, options)
}

impl Definitions {
    /// Parse definition source text.
    ///
    /// # Example
    ///
    /// ```
    /// use hotstrings::definitions::{Definitions, LoadOptions};
    ///
    /// let defs = Definitions::parse("::btw::by the way", LoadOptions::default()).unwrap();
    /// assert_eq!(defs.default.len(), 1);
    /// ```
    ///
    /// # Errors
    ///
    /// See [`parse`].
    pub fn parse(source: &str, options: LoadOptions) -> Result<Self, LoadError> {
        parse(source, options)
    }

    /// Load definitions from a file.
    ///
    /// # Errors
    ///
    /// See [`load_file`].
    pub fn load(path: &Path, options: LoadOptions) -> Result<Self, LoadError> {
        load_file(path, options)
    }
}

/// Parse definition source text into trigger tables and a context tree.
///
/// # Errors
///
/// Fails only on context markers that close the wrong scope. Lines that do not
/// fit the definition grammar are skipped.
pub fn parse(source: &str, options: LoadOptions) -> Result<Definitions, LoadError> {
    let mut defs = Definitions::default();
    let mut active = ContextId::ROOT;
    let mut in_block_comment = false;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if in_block_comment {
            if line.ends_with("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("/*") {
            in_block_comment = !rest.ends_with("*/");
            continue;
        }

        if line.starts_with(';') {
            if options.extensions {
                active = apply_context_marker(&mut defs, active, line, line_no)?;
            }
            continue;
        }

        if line.starts_with('#') {
            apply_directive(line, line_no, options);
            continue;
        }

        if let Some(definition) = parse_definition(line, line_no, active, options) {
            let class = definition.class;
            let key = definition.key.as_str().to_string();
            if defs.table_mut(class).insert(definition) {
                debug!(line = line_no, trigger = %key, ?class, "definition replaces an earlier one");
            }
        } else {
            debug!(line = line_no, "skipping line outside the definition grammar");
        }
    }

    if !active.is_root() {
        debug!(
            context = defs.contexts.name(active),
            "context still open at end of definitions"
        );
    }
    debug!(
        definitions = defs.len(),
        contexts = defs.contexts.len(),
        "loaded hotstring definitions"
    );
    Ok(defs)
}

fn apply_context_marker(
    defs: &mut Definitions,
    active: ContextId,
    line: &str,
    line_no: usize,
) -> Result<ContextId, LoadError> {
    let Some(caps) = CONTEXT_MARKER.captures(line) else {
        return Ok(active);
    };
    let name = &caps["name"];
    if &caps["kind"] == "Context" {
        return Ok(defs.contexts.open(name, active));
    }

    if active.is_root() {
        return Err(LoadError::EndContextAtRoot {
            line: line_no,
            name: name.to_string(),
        });
    }
    let expected = defs.contexts.name(active);
    if expected != name {
        return Err(LoadError::MismatchedEndContext {
            line: line_no,
            expected: expected.to_string(),
            found: name.to_string(),
        });
    }
    Ok(defs.contexts.parent(active).unwrap_or(ContextId::ROOT))
}

fn apply_directive(line: &str, line_no: usize, options: LoadOptions) {
    let Some(caps) = DIRECTIVE.captures(line) else {
        return;
    };
    if !caps["name"].eq_ignore_ascii_case("Hotstring") {
        debug!(line = line_no, directive = &caps["name"], "ignoring unknown directive");
        return;
    }
    let content = caps["content"].trim();
    if content.eq_ignore_ascii_case("NoMouse") {
        return;
    }
    // Global hotstring options are recognised but not applied.
    let parsed = parse_options(content, options.extensions);
    debug!(
        line = line_no,
        class = ?parsed.class,
        modifiers = ?parsed.modifiers,
        "#Hotstring options are not applied"
    );
}

fn parse_definition(
    line: &str,
    line_no: usize,
    context: ContextId,
    options: LoadOptions,
) -> Option<Definition> {
    let caps = DEFINITION_LINE.captures(line)?;
    let parsed = parse_options(&caps["options"], options.extensions);
    let trigger = &caps["trigger"];

    let key = if options.regex_triggers {
        // C0 patterns see the lower-cased buffer.
        let pattern = RegexBuilder::new(trigger)
            .case_insensitive(parsed.class == TriggerClass::CaseInsensitive)
            .build();
        match pattern {
            Ok(regex) => TriggerKey::Pattern(regex),
            Err(err) => {
                warn!(line = line_no, trigger, "dropping definition with invalid pattern: {err}");
                return None;
            }
        }
    } else if parsed.class == TriggerClass::CaseInsensitive {
        TriggerKey::Literal(trigger.to_lowercase())
    } else {
        TriggerKey::Literal(trigger.to_string())
    };

    Some(Definition {
        key,
        expansion: strip_trailing_comment(&caps["expansion"]),
        class: parsed.class,
        modifiers: parsed.modifiers,
        context,
        line: line_no,
    })
}

/// Cut the expansion at the first `;` that follows a space or tab.
/// Any other `;` is literal, and a backtick escapes it.
fn strip_trailing_comment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '`' if chars.peek() == Some(&';') => {
                out.push(';');
                chars.next();
            }
            ';' if out.ends_with([' ', '\t']) => {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
                return out;
            }
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParsedOptions {
    class: TriggerClass,
    modifiers: Modifiers,
}

fn parse_options(text: &str, extensions: bool) -> ParsedOptions {
    let mut no_end_char = false;
    let mut interior = false;
    let mut case_insensitive = false;
    let mut modifiers = Modifiers::default();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let zero_follows = chars.get(i + 1) == Some(&'0');
        match chars[i].to_ascii_uppercase() {
            '*' => no_end_char = true,
            '?' => interior = true,
            'C' if zero_follows => {
                case_insensitive = true;
                i += 1;
            }
            'B' if zero_follows => {
                modifiers.no_auto_backspace = true;
                i += 1;
            }
            'O' => modifiers.omit_end_char = true,
            'L' if extensions => modifiers.literal = true,
            _ => {}
        }
        i += 1;
    }

    let class = if no_end_char {
        TriggerClass::NoEndChar
    } else if interior {
        TriggerClass::Interior
    } else if case_insensitive {
        TriggerClass::CaseInsensitive
    } else {
        TriggerClass::Default
    };
    ParsedOptions { class, modifiers }
}
