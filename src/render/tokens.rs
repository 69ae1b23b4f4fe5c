//! Dynamic tokens substituted into expansions at trigger time.
//!
//! Substitution is a fixed, ordered list of independent literal replacements.
//! A later entry rewrites token text produced by an earlier entry's value, so
//! the order of [`TOKENS`] is observable and must not change.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike, Utc};

/// Source of the current moment.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Static process values exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Invocation arguments, program name excluded
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Path of the definitions file
    pub script_path: PathBuf,
}

impl Environment {
    /// Capture the running process's arguments and working directory.
    pub fn from_process(script_path: &Path) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_default();
        let script_path = if script_path.is_absolute() {
            script_path.to_path_buf()
        } else {
            working_dir.join(script_path)
        };
        Self {
            args: std::env::args().skip(1).collect(),
            working_dir,
            script_path,
        }
    }

    fn script_dir(&self) -> String {
        self.script_path
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default()
    }

    fn script_name(&self) -> String {
        self.script_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

type Resolver = fn(&DateTime<FixedOffset>, &Environment) -> String;

/// Every token in substitution order.
pub static TOKENS: &[(&str, Resolver)] = &[
    ("%A_YYYY%", |now, _| now.format("%Y").to_string()),
    ("%A_MMMM%", |now, _| now.format("%B").to_string()),
    ("%A_MMM%", |now, _| now.format("%b").to_string()),
    ("%A_MM%", |now, _| now.format("%m").to_string()),
    ("%A_DDDD%", |now, _| now.format("%A").to_string()),
    ("%A_DDD%", |now, _| now.format("%a").to_string()),
    ("%A_DD%", |now, _| now.format("%d").to_string()),
    ("%A_WDay%", |now, _| now.weekday().number_from_sunday().to_string()),
    ("%A_YDay%", |now, _| now.ordinal().to_string()),
    ("%A_YWeek%", |now, _| {
        let week = now.iso_week();
        format!("{}{:02}", week.year(), week.week())
    }),
    ("%A_Hour%", |now, _| format!("{:02}", now.hour())),
    ("%A_Min%", |now, _| format!("{:02}", now.minute())),
    ("%A_Sec%", |now, _| format!("{:02}", now.second())),
    ("%A_MSec%", |now, _| {
        format!("{:03}", now.timestamp_subsec_millis().min(999))
    }),
    ("%A_Now%", |now, _| now.format("%Y%m%d%H%M%S").to_string()),
    ("%A_NowUTC%", |now, _| {
        now.with_timezone(&Utc).format("%Y%m%d%H%M%S").to_string()
    }),
    ("%A_IsoDate%", |now, _| now.format("%Y-%m-%d").to_string()),
    ("%A_IsoDateTime%", |now, _| {
        now.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }),
    ("%A_RfcDate%", |now, _| now.to_rfc2822()),
    ("%A_Space%", |_, _| " ".to_string()),
    ("%A_Tab%", |_, _| "\t".to_string()),
    ("%A_Args%", |_, env| env.args.join(" ")),
    ("%A_WorkingDir%", |_, env| env.working_dir.display().to_string()),
    ("%A_ScriptDir%", |_, env| env.script_dir()),
    ("%A_ScriptName%", |_, env| env.script_name()),
    ("%A_ScriptFullPath%", |_, env| env.script_path.display().to_string()),
];

/// Apply every token replacement to `text`, in order.
pub fn substitute(text: &str, now: &DateTime<FixedOffset>, env: &Environment) -> String {
    let mut out = text.to_string();
    for (token, resolve) in TOKENS {
        if out.contains(token) {
            out = out.replace(token, &resolve(now, env));
        }
    }
    out
}
