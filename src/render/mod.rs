//! Expansion rendering.
//!
//! Turns a matched definition into the edit ops that replace the typed
//! trigger: an erase, the substituted template, then the replayed terminator.

mod tokens;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::definitions::Definition;
use crate::input::Terminator;

pub use tokens::{Clock, Environment, FixedClock, SystemClock, TOKENS, substitute};

/// Cursor and editing keys the sink can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Backspace,
    Tab,
}

/// One emitted keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Char(char),
    /// A character typed with shift held
    Shifted(char),
    Control(ControlAction),
}

/// One atomic instruction for the edit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum EditOp {
    /// Remove this many characters before the cursor
    EraseBack(usize),
    Emit(Token),
}

impl EditOp {
    /// Ops that type `text` verbatim; tabs become the tab key.
    pub fn text(text: &str) -> Vec<Self> {
        text.chars().map(|ch| Self::Emit(char_token(ch))).collect()
    }
}

fn char_token(ch: char) -> Token {
    if ch == '\t' {
        Token::Control(ControlAction::Tab)
    } else {
        Token::Char(ch)
    }
}

/// Clock and environment read while rendering.
#[derive(Debug)]
pub struct RenderEnv {
    pub clock: Box<dyn Clock>,
    pub environment: Environment,
}

impl RenderEnv {
    pub fn new(clock: impl Clock + 'static, environment: Environment) -> Self {
        Self {
            clock: Box::new(clock),
            environment,
        }
    }
}

impl Default for RenderEnv {
    fn default() -> Self {
        Self::new(SystemClock, Environment::default())
    }
}

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{(left|right|up|down|backspace|bs)\s+(\d+)\}")
        .expect("escape directive pattern is valid")
});

/// Largest repeat count an escape directive may request.
pub const MAX_DIRECTIVE_REPEAT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Control(ControlAction, usize),
}

/// Split a template into text and repeated control actions.
fn expand_directives(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in DIRECTIVE.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let count = match caps[2].parse::<usize>() {
            Ok(count) if count <= MAX_DIRECTIVE_REPEAT => count,
            _ => {
                warn!(
                    directive = whole.as_str(),
                    max = MAX_DIRECTIVE_REPEAT,
                    "directive count out of range, keeping it as text"
                );
                continue;
            }
        };
        let action = match caps[1].to_ascii_lowercase().as_str() {
            "left" => ControlAction::MoveLeft,
            "right" => ControlAction::MoveRight,
            "up" => ControlAction::MoveUp,
            "down" => ControlAction::MoveDown,
            _ => ControlAction::Backspace,
        };
        if whole.start() > last {
            pieces.push(Piece::Text(template[last..whole.start()].to_string()));
        }
        pieces.push(Piece::Control(action, count));
        last = whole.end();
    }
    if last < template.len() {
        pieces.push(Piece::Text(template[last..].to_string()));
    }
    pieces
}

/// Render the template of `definition` into output ops, without erase or replay.
pub fn render_template(definition: &Definition, env: &RenderEnv) -> Vec<EditOp> {
    if definition.modifiers.literal {
        return EditOp::text(&definition.expansion);
    }
    let now = env.clock.now();
    let mut ops = Vec::new();
    for piece in expand_directives(&definition.expansion) {
        match piece {
            Piece::Text(text) => ops.extend(EditOp::text(&substitute(&text, &now, &env.environment))),
            Piece::Control(action, count) => {
                ops.extend(std::iter::repeat_n(EditOp::Emit(Token::Control(action)), count));
            }
        }
    }
    ops
}

/// Characters to erase before emitting the expansion of `definition` typed as `matched`.
pub fn erase_count(definition: &Definition, matched: &str) -> usize {
    if definition.modifiers.no_auto_backspace {
        return 0;
    }
    let typed = matched.chars().count();
    if definition.class.ends_with_terminator() {
        typed + 1
    } else {
        typed
    }
}

/// Full corrective edit for one match.
///
/// `terminator` is the key that fired the match; `None` for characters that
/// complete a no-end-char trigger.
pub fn render(
    definition: &Definition,
    matched: &str,
    terminator: Option<Terminator>,
    env: &RenderEnv,
) -> Vec<EditOp> {
    let mut ops = Vec::new();
    let erase = erase_count(definition, matched);
    if erase > 0 {
        ops.push(EditOp::EraseBack(erase));
    }
    ops.extend(render_template(definition, env));

    if let Some(terminator) = terminator
        && !definition.modifiers.omit_end_char
    {
        let ch = terminator.as_char();
        ops.push(EditOp::Emit(if terminator.needs_shift() {
            Token::Shifted(ch)
        } else {
            Token::Char(ch)
        }));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextId;
    use crate::definitions::{Modifiers, TriggerClass, TriggerKey};
    use chrono::{FixedOffset, TimeZone};

    fn definition(expansion: &str, class: TriggerClass, modifiers: Modifiers) -> Definition {
        Definition {
            key: TriggerKey::Literal("abc".to_string()),
            expansion: expansion.to_string(),
            class,
            modifiers,
            context: ContextId::ROOT,
            line: 1,
        }
    }

    fn env_at(year: i32) -> RenderEnv {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(year, 6, 1, 12, 0, 0)
            .unwrap();
        RenderEnv::new(FixedClock(now), Environment::default())
    }

    fn control(action: ControlAction) -> EditOp {
        EditOp::Emit(Token::Control(action))
    }

    #[test]
    fn test_expand_directives_splits_text_and_controls() {
        let pieces = expand_directives("ab{Left 2}c{bs 1}");
        assert_eq!(
            pieces,
            vec![
                Piece::Text("ab".to_string()),
                Piece::Control(ControlAction::MoveLeft, 2),
                Piece::Text("c".to_string()),
                Piece::Control(ControlAction::Backspace, 1),
            ]
        );
    }

    #[test]
    fn test_directives_without_count_stay_literal() {
        let pieces = expand_directives("{left}");
        assert_eq!(pieces, vec![Piece::Text("{left}".to_string())]);
    }

    #[test]
    fn test_render_template_repeats_controls() {
        let def = definition("()}{left 2}{up 1}{down 1}{right 0}{backspace 1}", TriggerClass::Default, Modifiers::default());
        let ops = render_template(&def, &env_at(2024));
        let mut expected = EditOp::text("()}");
        expected.extend([
            control(ControlAction::MoveLeft),
            control(ControlAction::MoveLeft),
            control(ControlAction::MoveUp),
            control(ControlAction::MoveDown),
            control(ControlAction::Backspace),
        ]);
        assert_eq!(ops, expected);
    }

    #[test]
    fn test_right_directive_moves_cursor_right() {
        let def = definition("ab{Right 3}", TriggerClass::Default, Modifiers::default());
        let mut expected = EditOp::text("ab");
        expected.extend(std::iter::repeat_n(control(ControlAction::MoveRight), 3));
        assert_eq!(render_template(&def, &env_at(2024)), expected);
    }

    #[test]
    fn test_oversized_directive_count_stays_literal() {
        let huge = format!("{{bs {}}}", usize::MAX);
        let def = definition(&huge, TriggerClass::Default, Modifiers::default());
        assert_eq!(render_template(&def, &env_at(2024)), EditOp::text(&huge));

        let beyond = format!("x{{left {}}}", MAX_DIRECTIVE_REPEAT + 1);
        assert_eq!(expand_directives(&beyond), vec![Piece::Text(beyond.clone())]);

        let at_limit = format!("{{left {MAX_DIRECTIVE_REPEAT}}}");
        assert_eq!(
            expand_directives(&at_limit),
            vec![Piece::Control(ControlAction::MoveLeft, MAX_DIRECTIVE_REPEAT)]
        );
    }

    #[test]
    fn test_literal_modifier_skips_substitution() {
        let modifiers = Modifiers {
            literal: true,
            ..Modifiers::default()
        };
        let def = definition("{left 2}%A_YYYY%", TriggerClass::Default, modifiers);
        assert_eq!(render_template(&def, &env_at(2024)), EditOp::text("{left 2}%A_YYYY%"));
    }

    #[test]
    fn test_year_token_follows_the_clock() {
        let def = definition("(c) %A_YYYY%", TriggerClass::Default, Modifiers::default());
        assert_eq!(render_template(&def, &env_at(2024)), EditOp::text("(c) 2024"));
        assert_eq!(render_template(&def, &env_at(1999)), EditOp::text("(c) 1999"));
    }

    #[test]
    fn test_template_without_tokens_ignores_clock() {
        let def = definition("by the way", TriggerClass::Default, Modifiers::default());
        assert_eq!(
            render_template(&def, &env_at(2024)),
            render_template(&def, &env_at(1970))
        );
    }

    #[test]
    fn test_tab_token_becomes_tab_key() {
        let def = definition("a%A_Tab%b", TriggerClass::Default, Modifiers::default());
        assert_eq!(
            render_template(&def, &env_at(2024)),
            vec![
                EditOp::Emit(Token::Char('a')),
                control(ControlAction::Tab),
                EditOp::Emit(Token::Char('b')),
            ]
        );
    }

    #[test]
    fn test_erase_count_by_class_and_modifier() {
        let default = definition("x", TriggerClass::Default, Modifiers::default());
        let no_end = definition("x", TriggerClass::NoEndChar, Modifiers::default());
        let keep = definition(
            "x",
            TriggerClass::Default,
            Modifiers {
                no_auto_backspace: true,
                ..Modifiers::default()
            },
        );
        assert_eq!(erase_count(&default, "btw"), 4);
        assert_eq!(erase_count(&no_end, "omw"), 3);
        assert_eq!(erase_count(&keep, "btw"), 0);
        assert_eq!(erase_count(&default, "née"), 4);
    }

    #[test]
    fn test_render_replays_terminator() {
        let def = definition("by the way", TriggerClass::Default, Modifiers::default());
        let ops = render(&def, "btw", Some(Terminator::SPACE), &env_at(2024));
        let mut expected = vec![EditOp::EraseBack(4)];
        expected.extend(EditOp::text("by the way"));
        expected.push(EditOp::Emit(Token::Char(' ')));
        assert_eq!(ops, expected);
    }

    #[test]
    fn test_render_replays_shifted_terminator() {
        let def = definition("x", TriggerClass::Default, Modifiers::default());
        let bang = Terminator::from_char('!').unwrap();
        let ops = render(&def, "a", Some(bang), &env_at(2024));
        assert_eq!(ops.last(), Some(&EditOp::Emit(Token::Shifted('!'))));
    }

    #[test]
    fn test_render_omits_terminator_when_asked() {
        let modifiers = Modifiers {
            omit_end_char: true,
            ..Modifiers::default()
        };
        let def = definition("x", TriggerClass::Default, modifiers);
        let ops = render(&def, "a", Some(Terminator::SPACE), &env_at(2024));
        assert_eq!(ops, vec![EditOp::EraseBack(2), EditOp::Emit(Token::Char('x'))]);
    }

    #[test]
    fn test_render_without_backspace_has_no_erase() {
        let modifiers = Modifiers {
            no_auto_backspace: true,
            ..Modifiers::default()
        };
        let def = definition("x", TriggerClass::NoEndChar, modifiers);
        let ops = render(&def, "a", None, &env_at(2024));
        assert_eq!(ops, vec![EditOp::Emit(Token::Char('x'))]);
    }

    #[test]
    fn test_edit_op_serializes_as_tagged_json() {
        let json = serde_json::to_string(&EditOp::EraseBack(3)).unwrap();
        assert_eq!(json, r#"{"op":"erase_back","value":3}"#);
        let json = serde_json::to_string(&EditOp::Emit(Token::Control(ControlAction::MoveLeft))).unwrap();
        assert_eq!(json, r#"{"op":"emit","value":{"control":"move_left"}}"#);
        let json = serde_json::to_string(&EditOp::Emit(Token::Shifted('?'))).unwrap();
        assert_eq!(json, r#"{"op":"emit","value":{"shifted":"?"}}"#);
    }
}
