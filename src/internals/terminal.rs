// Terminal mode switching and single-key input.
//
// KEY and KEY? want unbuffered input, so they flip the terminal into raw
// mode on demand; REFILL and ACCEPT restore cooked mode for line input.
// Teardown always ends in cooked mode.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled, size};
use crossterm::tty::IsTty;

use crate::kernel::Cell;

pub fn is_tty() -> bool {
    io::stdin().is_tty()
}

/// Enter raw mode for single-key input. Harmless when not a terminal.
pub fn raw() {
    if is_tty() && !is_raw_mode_enabled().unwrap_or(false) {
        let _ = enable_raw_mode();
    }
}

/// Return to ordinary line-buffered input.
pub fn cooked() {
    if is_raw_mode_enabled().unwrap_or(false) {
        let _ = disable_raw_mode();
    }
}

pub fn window_size() -> (u16, u16) {
    size().unwrap_or((80, 24))
}

fn key_byte(code: KeyCode, modifiers: KeyModifiers) -> Option<u8> {
    match code {
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => {
            let c = c.to_ascii_uppercase();
            c.is_ascii_uppercase().then(|| c as u8 & 0x1f)
        }
        KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
        KeyCode::Enter => Some(b'\r'),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Backspace => Some(0x7f),
        KeyCode::Esc => Some(0x1b),
        _ => None,
    }
}

/// Block for one key; -1 when input is closed or not a terminal.
pub fn read_key() -> Cell {
    if !is_tty() {
        // Fall back to byte input from the stream.
        use std::io::Read;
        let mut buf = [0u8; 1];
        return match io::stdin().read(&mut buf) {
            Ok(1) => buf[0] as Cell,
            _ => -1,
        };
    }
    loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                if let Some(b) = key_byte(key.code, key.modifiers) {
                    return b as Cell;
                }
            }
            Ok(_) => continue,
            Err(_) => return -1,
        }
    }
}

/// Non-blocking poll for one key.
pub fn poll_key() -> Option<u8> {
    if !is_tty() {
        return None;
    }
    while event::poll(Duration::ZERO).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Release {
                if let Some(b) = key_byte(key.code, key.modifiers) {
                    return Some(b);
                }
            }
        }
    }
    None
}
