//! Terminal scratch pad: crossterm key events in, edits applied in place.
//!
//! This is a local stand-in for a system-wide hook and injector. Typed keys
//! are echoed so the terminal behaves like the focused document, and edit
//! ops are then applied to that same text.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{MoveDown, MoveLeft, MoveRight, MoveUp};
use crossterm::event::{self, Event};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use super::{EditSink, EventSource, SourceEvent};
use crate::input::{KeyEvent, KeyInput, classify_terminal_key};
use crate::render::{ControlAction, EditOp, Token};

/// Keeps the terminal in raw mode for its lifetime.
pub struct TerminalGuard;

impl TerminalGuard {
    /// # Errors
    /// Returns an error if raw mode cannot be enabled.
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode; hotstrings needs an interactive terminal")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Reads key presses from the terminal.
pub struct TerminalSource<W: Write> {
    poll_interval: Duration,
    echo: Option<W>,
}

impl<W: Write> TerminalSource<W> {
    /// Poll every `poll_interval`; idle polls let the session check for reloads.
    pub const fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            echo: None,
        }
    }

    /// Echo typed keys to `out` before they reach the engine.
    pub fn with_echo(mut self, out: W) -> Self {
        self.echo = Some(out);
        self
    }
}

impl<W: Write> EventSource for TerminalSource<W> {
    fn next_event(&mut self) -> Result<SourceEvent> {
        if !event::poll(self.poll_interval)? {
            return Ok(SourceEvent::Idle);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(SourceEvent::Idle);
        };
        match classify_terminal_key(key) {
            KeyInput::Exit => Ok(SourceEvent::Exit),
            KeyInput::Skip => Ok(SourceEvent::Idle),
            KeyInput::Key(event) => {
                if let Some(out) = self.echo.as_mut() {
                    echo_key(out, event)?;
                }
                Ok(SourceEvent::Key(event))
            }
        }
    }
}

fn echo_key(out: &mut impl Write, event: KeyEvent) -> std::io::Result<()> {
    match event {
        KeyEvent::Char(ch) => queue!(out, Print(ch))?,
        KeyEvent::Terminator(terminator) => write_char(out, terminator.as_char())?,
        KeyEvent::Backspace => erase(out, 1)?,
        KeyEvent::Other => {}
    }
    out.flush()
}

fn write_char(out: &mut impl Write, ch: char) -> std::io::Result<()> {
    if ch == '\n' {
        queue!(out, Print("\r\n"))
    } else {
        queue!(out, Print(ch))
    }
}

fn erase(out: &mut impl Write, count: usize) -> std::io::Result<()> {
    for _ in 0..count {
        queue!(out, Print("\x08 \x08"))?;
    }
    Ok(())
}

/// Applies edit ops to the terminal text.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EditSink for TerminalSink<W> {
    fn apply(&mut self, op: &EditOp) -> Result<()> {
        match *op {
            EditOp::EraseBack(count) => erase(&mut self.out, count)?,
            EditOp::Emit(Token::Char(ch) | Token::Shifted(ch)) => write_char(&mut self.out, ch)?,
            EditOp::Emit(Token::Control(action)) => match action {
                ControlAction::MoveLeft => queue!(self.out, MoveLeft(1))?,
                ControlAction::MoveRight => queue!(self.out, MoveRight(1))?,
                ControlAction::MoveUp => queue!(self.out, MoveUp(1))?,
                ControlAction::MoveDown => queue!(self.out, MoveDown(1))?,
                ControlAction::Backspace => erase(&mut self.out, 1)?,
                ControlAction::Tab => queue!(self.out, Print('\t'))?,
            },
        }
        self.out.flush()?;
        Ok(())
    }
}
