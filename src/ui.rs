//! Operator-facing output. Logs go to the log file; these go to the terminal.

use crossterm::style::{StyledContent, Stylize};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::IsTerminal;

pub fn heading(msg: &str) {
    println!("{}", msg.cyan().bold());
}

pub fn success(msg: &str) {
    println!("{}", msg.green());
}

pub fn progress(msg: &str) {
    println!("{}", msg.yellow());
}

pub fn detail(msg: &str) {
    println!("{}", msg.blue());
}

/// A problem worth showing inline in a report; not fatal.
pub fn alert(msg: &str) {
    println!("{}", msg.red());
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// `label value`, label yellow and value in the given style.
pub fn field(label: &str, value: StyledContent<String>) {
    println!("{} {value}", label.yellow());
}

/// Holds the terminal in raw mode so keystrokes typed during a scripted
/// prompt don't reach it. Restores on drop. No-op when stdin isn't a tty.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn engage() -> Self {
        let active = std::io::stdin().is_terminal() && enable_raw_mode().is_ok();
        Self { active }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            if let Err(err) = disable_raw_mode() {
                tracing::warn!("failed to restore terminal mode: {err}");
            }
        }
    }
}
