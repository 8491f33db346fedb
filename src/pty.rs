// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Console surface
//!
//! Hosts a console program (typically a VM with a serial console) in a PTY,
//! mirrors its output to stdout and turns key events into terminal bytes.

use anyhow::{Context, Result};
use portable_pty::{Child, CommandBuilder, PtySize, native_pty_system};
use std::io::{Read, Write};
use std::thread;
use tracing::debug;

use crate::keymap;
use crate::surface::Surface;
use crate::types::{InputEvent, KeyCode, Modifiers};

/// Terminal byte sequence for a key press, or `None` when the code has no
/// console meaning.
pub fn key_bytes(code: KeyCode, modifiers: Modifiers) -> Option<String> {
    let base = match code {
        keymap::ENTER => "\r".to_string(),
        keymap::TAB => "\t".to_string(),
        keymap::DELETE => "\x7f".to_string(),
        keymap::ESCAPE => "\x1b".to_string(),
        keymap::UP => "\x1b[A".to_string(),
        keymap::DOWN => "\x1b[B".to_string(),
        keymap::RIGHT => "\x1b[C".to_string(),
        keymap::LEFT => "\x1b[D".to_string(),
        other => {
            let c = keymap::code_char(other)?;
            if modifiers.shift {
                c.to_uppercase().collect()
            } else {
                c.to_string()
            }
        }
    };

    // The command modifier travels as a meta prefix
    if modifiers.command {
        Some(format!("\x1b{}", base))
    } else {
        Some(base)
    }
}

pub struct PtySurface {
    writer: Option<Box<dyn Write + Send>>,
    child: Box<dyn Child + Send + Sync>,
    rows: u16,
    _reader_thread: Option<thread::JoinHandle<()>>,
}

impl PtySurface {
    pub fn spawn(program: &[String], cols: u16, rows: u16) -> Result<Self> {
        let (cmd, args) = program.split_first().context("Console command is empty")?;

        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to create PTY")?;

        let mut builder = CommandBuilder::new(cmd);
        builder.args(args);
        builder.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(builder)
            .with_context(|| format!("Failed to spawn console '{}'", cmd))?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to get PTY reader")?;

        let writer = pair
            .master
            .take_writer()
            .context("Failed to get PTY writer")?;

        let reader_thread = thread::spawn(move || {
            let mut reader = reader;
            let mut stdout = std::io::stdout();
            let mut buffer = [0u8; 8192];

            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        if stdout.write_all(&buffer[..n]).is_err() {
                            break;
                        }
                        if stdout.flush().is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            writer: Some(writer),
            child,
            rows,
            _reader_thread: Some(reader_thread),
        })
    }

    fn send_bytes(&mut self, data: &str) -> Result<()> {
        let writer = self.writer.as_mut().context("PTY writer has been closed")?;
        writer
            .write_all(data.as_bytes())
            .context("Failed to write to PTY")?;
        writer.flush().context("Failed to flush PTY")?;
        Ok(())
    }
}

impl Surface for PtySurface {
    fn height(&self) -> f64 {
        f64::from(self.rows)
    }

    fn deliver(&mut self, event: &InputEvent) -> Result<()> {
        match event {
            InputEvent::KeyDown { code, modifiers } => match key_bytes(*code, *modifiers) {
                Some(bytes) => self.send_bytes(&bytes),
                None => {
                    debug!(?code, "key has no console sequence");
                    Ok(())
                }
            },
            // Terminals act on the press only
            InputEvent::KeyUp { .. } => Ok(()),
            InputEvent::PointerDown { .. } | InputEvent::PointerUp { .. } => {
                debug!(?event, "pointer event dropped by console surface");
                Ok(())
            }
        }
    }
}

impl Drop for PtySurface {
    fn drop(&mut self) {
        // Close writer to signal EOF
        drop(self.writer.take());

        let _ = self.child.kill();

        if let Some(handle) = self._reader_thread.take() {
            let _ = handle.join();
        }
    }
}
