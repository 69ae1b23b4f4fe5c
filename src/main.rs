//! Hotstrings - expand typed abbreviations.
//!
//! # Usage
//!
//! ```bash
//! hotstrings hotstrings.ahk
//! hotstrings --extensions --context work hotstrings.ahk
//! hotstrings --output json hotstrings.ahk | my-injector
//! ```

use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use hotstrings::config::{
    ConfigFlags, OutputMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use hotstrings::definitions::{Definitions, TriggerClass};
use hotstrings::engine::Engine;
use hotstrings::render::{Environment, RenderEnv, SystemClock};
use hotstrings::session::{
    EditSink, JsonLinesSink, Session, TerminalGuard, TerminalSink, TerminalSource,
};
use hotstrings::watcher::DefinitionsWatcher;

/// How often the terminal is polled so reloads are noticed while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Expand typed abbreviations into longer text
#[derive(Parser, Debug)]
#[command(name = "hotstrings", version, about, long_about = None)]
struct Cli {
    /// Hotstring definitions file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Treat triggers as regular expressions searched within the typed word
    #[arg(long)]
    regex: bool,

    /// Enable context markers and the L (literal) option
    #[arg(long)]
    extensions: bool,

    /// Resolve triggers from this context outward (default: root)
    #[arg(long, value_name = "NAME")]
    context: Option<String>,

    /// Pause between emitted keystrokes in milliseconds
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// Where to send edits
    #[arg(long, value_enum)]
    output: Option<OutputMode>,

    /// Reload definitions when the file changes
    #[arg(short, long)]
    watch: bool,

    /// Log the input buffer after every keystroke
    #[arg(long)]
    debug: bool,

    /// Load the definitions, print a summary and exit
    #[arg(long)]
    check: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn print_summary(defs: &Definitions) {
    println!("contexts: {}", defs.contexts.len());
    for (label, class) in [
        ("default", TriggerClass::Default),
        ("no-end-char", TriggerClass::NoEndChar),
        ("interior", TriggerClass::Interior),
        ("case-insensitive", TriggerClass::CaseInsensitive),
    ] {
        println!("{label}: {}", defs.table(class).len());
    }
}

fn run_session(engine: Engine, effective: &ConfigFlags, file: &Path) -> Result<()> {
    let output = effective.output.unwrap_or(OutputMode::Terminal);
    let interactive = std::io::stdin().is_terminal();
    if !interactive {
        anyhow::bail!("hotstrings reads keystrokes from an interactive terminal");
    }

    let _guard = TerminalGuard::enter()?;
    let crlf = stdout().is_terminal();
    match output {
        OutputMode::Terminal => {
            let source = TerminalSource::new(POLL_INTERVAL).with_echo(stdout());
            drive(engine, source, TerminalSink::new(stdout()), effective, file)
        }
        OutputMode::Json => {
            let source = TerminalSource::<std::io::Stdout>::new(POLL_INTERVAL);
            let sink = JsonLinesSink::new(stdout()).with_crlf(crlf);
            drive(engine, source, sink, effective, file)
        }
    }
}

fn drive<K: EditSink>(
    engine: Engine,
    source: TerminalSource<std::io::Stdout>,
    sink: K,
    effective: &ConfigFlags,
    file: &Path,
) -> Result<()> {
    let mut session = Session::new(engine, source, sink).with_delay(effective.emit_delay());
    if effective.watch {
        let watcher = DefinitionsWatcher::new(file, Duration::from_millis(200))
            .with_context(|| format!("Failed to watch {}", file.display()))?;
        session = session.with_reload(watcher, effective.load_options());
    }
    session.run()?;
    Ok(())
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_logging(effective.debug || cli.debug);

    let definitions = Definitions::load(&cli.file, effective.load_options())
        .with_context(|| format!("Failed to load definitions from {}", cli.file.display()))?;

    if cli.check {
        print_summary(&definitions);
        return Ok(());
    }

    let env = RenderEnv::new(SystemClock, Environment::from_process(&cli.file));
    let engine = Engine::new(definitions, effective.context_name()).with_render_env(env);

    run_session(engine, &effective, &cli.file).context("Session error")
}
