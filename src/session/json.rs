use std::io::Write;

use anyhow::Result;

use super::EditSink;
use crate::render::EditOp;

/// Writes each op as one JSON object per line, for an external injector.
pub struct JsonLinesSink<W: Write> {
    out: W,
    line_ending: &'static str,
}

impl<W: Write> JsonLinesSink<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            line_ending: "\n",
        }
    }

    /// End lines with `\r\n`, needed while the terminal is in raw mode.
    pub const fn with_crlf(mut self, crlf: bool) -> Self {
        self.line_ending = if crlf { "\r\n" } else { "\n" };
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EditSink for JsonLinesSink<W> {
    fn apply(&mut self, op: &EditOp) -> Result<()> {
        serde_json::to_writer(&mut self.out, op)?;
        self.out.write_all(self.line_ending.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
