//! Display collaborator: where the agent's lines go.
//!
//! The agent only ever calls [`Terminal::log`]. [`ConsoleTerminal`] renders
//! aligned, 24-bit colored lines on stdout; [`MemoryTerminal`] keeps them for
//! headless embedding and tests.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

/// Horizontal placement of a logged line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Operator side.
    Left,
    /// Status lines.
    Center,
    /// Agent side.
    Right,
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Center => write!(f, "center"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Presentation capability injected into the agent.
pub trait Terminal: Send + Sync {
    /// Show one line. `color` is a `#RRGGBB` string.
    fn log(&self, text: &str, align: Align, color: &str);
}

/// A line captured by [`MemoryTerminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// The line exactly as passed to [`Terminal::log`].
    pub text: String,
    /// Which side of the display the line was placed on.
    pub align: Align,
    /// `#RRGGBB` color string, stored unvalidated.
    pub color: String,
}

/// Terminal that records lines in memory.
#[derive(Debug, Default)]
pub struct MemoryTerminal {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryTerminal {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line logged so far.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remove and return every line logged so far.
    pub fn take(&self) -> Vec<LogLine> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Terminal for MemoryTerminal {
    fn log(&self, text: &str, align: Align, color: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LogLine {
                text: text.to_owned(),
                align,
                color: color.to_owned(),
            });
    }
}

/// Terminal that prints aligned, colored lines to stdout.
#[derive(Debug)]
pub struct ConsoleTerminal {
    width: usize,
    color: bool,
    // Serializes whole lines from the input thread and the speech thread.
    out: Mutex<()>,
}

impl ConsoleTerminal {
    /// Create a console renderer padding to `width` columns.
    ///
    /// Color is disabled when `NO_COLOR` is set.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            color: std::env::var_os("NO_COLOR").is_none(),
            out: Mutex::new(()),
        }
    }

    /// Override color output.
    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    /// Render a line without printing it.
    pub fn render(&self, text: &str, align: Align, color: &str) -> String {
        let len = text.chars().count();
        let pad = match align {
            Align::Left => 0,
            Align::Center => self.width.saturating_sub(len) / 2,
            Align::Right => self.width.saturating_sub(len),
        };
        let body = match (self.color, parse_hex_color(color)) {
            (true, Some((r, g, b))) => format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m"),
            _ => text.to_owned(),
        };
        format!("{}{body}", " ".repeat(pad))
    }
}

impl Terminal for ConsoleTerminal {
    fn log(&self, text: &str, align: Align, color: &str) {
        let line = self.render(text, align, color);
        let _guard = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        // A closed stdout is not the agent's problem.
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

/// Parse `#RRGGBB` (leading `#` optional).
fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
