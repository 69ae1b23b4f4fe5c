//! Session driver.
//!
//! A [`Session`] pulls one event at a time from an [`EventSource`], hands it
//! to the [`Engine`], and writes the resulting edit ops to an [`EditSink`]
//! with a blocking pause between ops. Emission always runs to completion;
//! the exit key is only noticed when the next event is read.

mod json;
mod terminal;

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::definitions::{LoadOptions, load_file};
use crate::engine::Engine;
use crate::input::KeyEvent;
use crate::render::EditOp;
use crate::watcher::DefinitionsWatcher;

pub use json::JsonLinesSink;
pub use terminal::{TerminalGuard, TerminalSink, TerminalSource};

/// Delay used when none is configured.
pub const DEFAULT_EMIT_DELAY: Duration = Duration::from_millis(10);

/// What an event source produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Key(KeyEvent),
    /// Stop accepting events
    Exit,
    /// Nothing arrived before the poll interval elapsed
    Idle,
}

/// Producer of keystroke events.
pub trait EventSource {
    /// Wait for the next event.
    ///
    /// # Errors
    /// Returns an error if the underlying input device fails.
    fn next_event(&mut self) -> Result<SourceEvent>;
}

/// Consumer of edit ops. Assumed to succeed; nothing is retried.
pub trait EditSink {
    /// Apply one op to the focused target.
    ///
    /// # Errors
    /// Returns an error if the output cannot be written.
    fn apply(&mut self, op: &EditOp) -> Result<()>;
}

/// Write `ops` to `sink` in order, pausing `delay` after each one.
///
/// # Errors
/// Stops at the first sink error; applied ops are not replayed.
pub fn emit(ops: &[EditOp], sink: &mut impl EditSink, delay: Duration) -> Result<()> {
    for op in ops {
        sink.apply(op)?;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
    Ok(())
}

/// Event source replaying a fixed list, then exiting.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    events: VecDeque<SourceEvent>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = SourceEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Events for typing `text`.
    pub fn typed(text: &str) -> Self {
        Self::new(KeyEvent::typed(text).into_iter().map(SourceEvent::Key))
    }
}

impl EventSource for ScriptedSource {
    fn next_event(&mut self) -> Result<SourceEvent> {
        Ok(self.events.pop_front().unwrap_or(SourceEvent::Exit))
    }
}

/// Sink that keeps every op it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    ops: Vec<EditOp>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }
}

impl EditSink for RecordingSink {
    fn apply(&mut self, op: &EditOp) -> Result<()> {
        self.ops.push(*op);
        Ok(())
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub events: usize,
    /// Events that produced at least one op
    pub edits: usize,
    pub edit_ops: usize,
    pub reloads: usize,
}

struct Reload {
    watcher: DefinitionsWatcher,
    options: LoadOptions,
}

/// One running expansion session.
pub struct Session<S, K> {
    engine: Engine,
    source: S,
    sink: K,
    delay: Duration,
    reload: Option<Reload>,
    stats: SessionStats,
}

impl<S: EventSource, K: EditSink> Session<S, K> {
    pub fn new(engine: Engine, source: S, sink: K) -> Self {
        Self {
            engine,
            source,
            sink,
            delay: DEFAULT_EMIT_DELAY,
            reload: None,
            stats: SessionStats::default(),
        }
    }

    /// Set the pause between emitted ops.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        if delay.is_zero() {
            warn!("emit delay of 0 ms can reorder output against the keystroke queue");
        }
        self.delay = delay;
        self
    }

    /// Reload definitions with `options` whenever `watcher` reports a change.
    pub fn with_reload(mut self, watcher: DefinitionsWatcher, options: LoadOptions) -> Self {
        self.reload = Some(Reload { watcher, options });
        self
    }

    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    pub const fn sink(&self) -> &K {
        &self.sink
    }

    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run until the source reports exit.
    ///
    /// # Errors
    /// Returns an error if the source or sink fails, or the engine reports a
    /// fatal matching error.
    pub fn run(&mut self) -> Result<SessionStats> {
        info!(
            context = self.engine.requested_context(),
            definitions = self.engine.definitions().len(),
            delay_ms = self.delay.as_millis(),
            "hotstring session started"
        );
        while self.step()? {}
        info!(
            events = self.stats.events,
            edits = self.stats.edits,
            reloads = self.stats.reloads,
            "hotstring session ended"
        );
        Ok(self.stats)
    }

    /// Handle one source event. Returns `false` once the source asks to exit.
    ///
    /// # Errors
    /// See [`Session::run`].
    pub fn step(&mut self) -> Result<bool> {
        self.poll_reload();
        let event = match self.source.next_event().context("keystroke source failed")? {
            SourceEvent::Exit => return Ok(false),
            SourceEvent::Idle => return Ok(true),
            SourceEvent::Key(event) => event,
        };

        self.stats.events += 1;
        let ops = self
            .engine
            .handle(event)
            .context("hotstring matching failed")?;
        if !ops.is_empty() {
            self.stats.edits += 1;
            self.stats.edit_ops += ops.len();
            emit(&ops, &mut self.sink, self.delay).context("failed to apply edit")?;
        }
        Ok(true)
    }

    fn poll_reload(&mut self) {
        let Some(reload) = self.reload.as_mut() else {
            return;
        };
        if !reload.watcher.take_change_ready() {
            return;
        }
        let path = reload.watcher.target_path().to_path_buf();
        match load_file(&path, reload.options) {
            Ok(definitions) => {
                info!(
                    path = %path.display(),
                    definitions = definitions.len(),
                    "reloaded hotstring definitions"
                );
                self.engine.replace_definitions(definitions);
                self.stats.reloads += 1;
            }
            Err(err) => error!("keeping previous definitions: {err}"),
        }
        debug!(buffer = self.engine.buffer(), "buffer after reload check");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::definitions::Definitions;
    use crate::input::Terminator;
    use crate::render::Token;

    fn create_engine(source: &str, context: &str) -> Engine {
        let options = LoadOptions {
            regex_triggers: false,
            extensions: true,
        };
        Engine::new(Definitions::parse(source, options).unwrap(), context)
    }

    struct FailingSink;

    impl EditSink for FailingSink {
        fn apply(&mut self, _op: &EditOp) -> Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    #[test]
    fn test_session_runs_until_source_is_exhausted() {
        let engine = create_engine("::btw::by the way\n:*:omw::on my way\n", "");
        let mut session = Session::new(engine, ScriptedSource::typed("btw omw"), RecordingSink::new())
            .with_delay(Duration::ZERO);
        let stats = session.run().unwrap();

        assert_eq!(stats.events, 7);
        assert_eq!(stats.edits, 2);
        let ops = session.sink().ops();
        assert_eq!(ops[0], EditOp::EraseBack(4));
        assert_eq!(ops[11], EditOp::Emit(Token::Char(' ')));
        assert_eq!(ops[12], EditOp::EraseBack(3));
        assert_eq!(stats.edit_ops, ops.len());
    }

    #[test]
    fn test_exit_stops_before_later_events() {
        let engine = create_engine("::btw::by the way", "");
        let mut events: Vec<_> = KeyEvent::typed("bt").into_iter().map(SourceEvent::Key).collect();
        events.push(SourceEvent::Exit);
        events.extend(KeyEvent::typed("w ").into_iter().map(SourceEvent::Key));
        let mut session = Session::new(engine, ScriptedSource::new(events), RecordingSink::new());

        let stats = session.run().unwrap();
        assert_eq!(stats.events, 2);
        assert!(session.sink().ops().is_empty());
        assert_eq!(session.engine().buffer(), "bt");
    }

    #[test]
    fn test_idle_events_are_skipped() {
        let engine = create_engine("::btw::by the way", "");
        let events = vec![
            SourceEvent::Idle,
            SourceEvent::Key(KeyEvent::Char('b')),
            SourceEvent::Idle,
        ];
        let mut session = Session::new(engine, ScriptedSource::new(events), RecordingSink::new());
        assert!(session.step().unwrap());
        assert!(session.step().unwrap());
        assert!(session.step().unwrap());
        assert!(!session.step().unwrap());
        assert_eq!(session.stats().events, 1);
    }

    #[test]
    fn test_unknown_context_aborts_session() {
        let engine = create_engine("::btw::by the way", "nowhere");
        let mut session = Session::new(engine, ScriptedSource::typed("b"), RecordingSink::new());
        let err = session.run().unwrap_err();
        assert!(format!("{err:#}").contains("nowhere"));
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let engine = create_engine(":*:x::y", "");
        let mut session = Session::new(engine, ScriptedSource::typed("x"), FailingSink);
        let err = session.run().unwrap_err();
        assert!(format!("{err:#}").contains("sink unavailable"));
    }

    #[test]
    fn test_emit_pauses_between_ops() {
        let mut sink = RecordingSink::new();
        let ops = EditOp::text("abc");
        let start = Instant::now();
        emit(&ops, &mut sink, Duration::from_millis(5)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert_eq!(sink.ops(), ops.as_slice());
    }

    #[test]
    fn test_scripted_source_classifies_text() {
        let mut source = ScriptedSource::typed("a.");
        assert_eq!(source.next_event().unwrap(), SourceEvent::Key(KeyEvent::Char('a')));
        assert_eq!(
            source.next_event().unwrap(),
            SourceEvent::Key(KeyEvent::Terminator(Terminator::from_char('.').unwrap()))
        );
        assert_eq!(source.next_event().unwrap(), SourceEvent::Exit);
    }

    #[test]
    fn test_reload_swaps_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().canonicalize().unwrap().join("defs.ahk");
        std::fs::write(&path, "::btw::by the way\n").unwrap();

        let options = LoadOptions::default();
        let engine = Engine::new(load_file(&path, options).unwrap(), "");
        let watcher = DefinitionsWatcher::new(&path, Duration::from_millis(20)).unwrap();
        let mut session = Session::new(engine, ScriptedSource::default(), RecordingSink::new())
            .with_reload(watcher, options);

        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, "::btw::by the way\n::omw::on my way\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.stats().reloads == 0 && Instant::now() < deadline {
            session.poll_reload();
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(session.stats().reloads >= 1);
        assert_eq!(session.engine().definitions().default.len(), 2);
    }
}
