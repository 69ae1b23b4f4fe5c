use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::definitions::LoadOptions;
use crate::session::DEFAULT_EMIT_DELAY;

/// Where edit ops are written.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Apply edits to the terminal scratch pad
    Terminal,
    /// Print one JSON object per edit op on stdout
    Json,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub regex: bool,
    pub extensions: bool,
    pub watch: bool,
    pub debug: bool,
    pub context: Option<String>,
    pub delay_ms: Option<u64>,
    pub output: Option<OutputMode>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            regex: self.regex || other.regex,
            extensions: self.extensions || other.extensions,
            watch: self.watch || other.watch,
            debug: self.debug || other.debug,
            context: other.context.clone().or_else(|| self.context.clone()),
            delay_ms: other.delay_ms.or(self.delay_ms),
            output: other.output.or(self.output),
        }
    }

    pub const fn load_options(&self) -> LoadOptions {
        LoadOptions {
            regex_triggers: self.regex,
            extensions: self.extensions,
        }
    }

    /// Requested context name; the root when unset.
    pub fn context_name(&self) -> &str {
        self.context.as_deref().unwrap_or(crate::context::ROOT_NAME)
    }

    pub fn emit_delay(&self) -> Duration {
        self.delay_ms.map_or(DEFAULT_EMIT_DELAY, Duration::from_millis)
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("hotstrings").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("hotstrings")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("hotstrings").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("hotstrings")
                .join("config");
        }
    }

    PathBuf::from(".hotstringsrc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".hotstringsrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# hotstrings defaults (saved with --save)".to_string());
    if flags.regex {
        lines.push("--regex".to_string());
    }
    if flags.extensions {
        lines.push("--extensions".to_string());
    }
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.debug {
        lines.push("--debug".to_string());
    }
    if let Some(context) = &flags.context {
        lines.push(format!("--context {context}"));
    }
    if let Some(delay) = flags.delay_ms {
        lines.push(format!("--delay {delay}"));
    }
    if let Some(output) = flags.output {
        let output_str = match output {
            OutputMode::Terminal => "terminal",
            OutputMode::Json => "json",
        };
        lines.push(format!("--output {output_str}"));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--regex" {
            flags.regex = true;
        } else if token == "--extensions" {
            flags.extensions = true;
        } else if token == "--watch" {
            flags.watch = true;
        } else if token == "--debug" {
            flags.debug = true;
        } else if token == "--context" {
            if let Some(next) = tokens.get(i + 1) {
                flags.context = Some(next.clone());
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--context=") {
            flags.context = Some(value.to_string());
        } else if token == "--delay" {
            if let Some(next) = tokens.get(i + 1) {
                flags.delay_ms = next.parse().ok();
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--delay=") {
            flags.delay_ms = value.parse().ok();
        } else if token == "--output" {
            if let Some(next) = tokens.get(i + 1) {
                flags.output = parse_output(next);
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--output=") {
            flags.output = parse_output(value);
        }
        i += 1;
    }
    flags
}

fn parse_output(s: &str) -> Option<OutputMode> {
    match s {
        "terminal" => Some(OutputMode::Terminal),
        "json" => Some(OutputMode::Json),
        _ => None,
    }
}
