//! Human-readable and JSON rendering shared by every subcommand.

use std::io::{self, Write};

use serde::Serialize;

/// Output style selected by `--json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }
}

/// Writes `value` as pretty JSON, or through `human` otherwise.
pub fn render<T, F>(mode: OutputMode, w: &mut dyn Write, value: &T, human: F) -> io::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
{
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, value)?;
            writeln!(w)
        }
        OutputMode::Human => human(value, w),
    }
}

/// Left-aligned `key: value` line.
pub fn kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// Section heading followed by a rule.
pub fn section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "{heading}")?;
    writeln!(w, "{:-<60}", "")
}
