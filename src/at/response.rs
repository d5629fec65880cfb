//! Classification of modem reply lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// `+CME ERROR: <n>` / `+CMS ERROR: <n>`; the payload is text when the modem
/// runs in verbose error mode.
static EXTENDED_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+CM[ES] ERROR:\s*(.*)$").expect("extended error pattern is valid")
});

/// A line that ends a command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Ok,
    Error { code: Option<u32> },
}

/// Classify one received line, or `None` if it is part of the payload.
pub fn classify(line: &str) -> Option<Terminal> {
    match line {
        "OK" => Some(Terminal::Ok),
        "ERROR" => Some(Terminal::Error { code: None }),
        _ => EXTENDED_ERROR.captures(line).map(|caps| Terminal::Error {
            code: caps[1].trim().parse().ok(),
        }),
    }
}
