//! Masked PIN entry on the terminal

use std::io::{self, Write};
use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use hc_control::pin::{NotificationSink, PinEntryUi, PinRequest};
use hc_control::ControlError;
use tracing::warn;

/// Outcome of reading from the keyboard
enum Entry {
    Digits(String),
    Abort,
}

/// Leaves raw mode when dropped
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            warn!(error = %err, "Failed to leave raw terminal mode");
        }
    }
}

/// Read digits until Enter, echoing `*`. Esc and Ctrl-C abort.
fn read_masked(prompt: &str) -> io::Result<Entry> {
    let mut stderr = io::stderr();
    write!(stderr, "{}: ", prompt)?;
    stderr.flush()?;

    let _raw = RawMode::enable()?;
    let mut digits = String::new();
    loop {
        let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(Entry::Abort),
            KeyCode::Esc => return Ok(Entry::Abort),
            KeyCode::Enter => {
                write!(stderr, "\r\n")?;
                return Ok(Entry::Digits(digits));
            }
            KeyCode::Backspace => {
                if digits.pop().is_some() {
                    write!(stderr, "\u{8} \u{8}")?;
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                digits.push(c);
                write!(stderr, "*")?;
            }
            _ => {}
        }
        stderr.flush()?;
    }
}

/// Prompt for a PIN on the controlling terminal
pub fn prompt_pin(prompt: &str) -> io::Result<Option<String>> {
    Ok(match read_masked(prompt)? {
        Entry::Digits(digits) => Some(digits),
        Entry::Abort => None,
    })
}

/// Answers PIN requests from the access control layer on a reader thread
pub struct TerminalPinUi;

impl PinEntryUi for TerminalPinUi {
    fn request_pin_entry(&self, request: PinRequest) {
        thread::spawn(move || match read_masked(&request.prompt) {
            Ok(Entry::Digits(digits)) => request.submit(digits),
            Ok(Entry::Abort) => request.abort(),
            Err(err) => {
                warn!(error = %err, "Terminal PIN entry failed");
                request.abort();
            }
        });
    }
}

/// Prints errors meant for the user on stderr
pub struct StderrSink;

impl NotificationSink for StderrSink {
    fn post_error(&self, _error: &ControlError, message: &str) {
        eprintln!("{}", message);
    }
}
