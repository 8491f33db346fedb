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

//! Core types shared by the producer and the host

use std::time::Duration;

/// One unit of input intent. Immutable once constructed; build through
/// [`crate::parser::parse`] to get the validated form.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click { x: f64, y: f64 },
    RightClick { x: f64, y: f64 },
    Type { text: String },
    Key { name: String },
    // Command-modified key press
    CmdKey { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub command: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        command: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        command: false,
    };
    pub const COMMAND: Modifiers = Modifiers {
        shift: false,
        command: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
}

/// A single synthetic event delivered to the target surface. Pointer
/// locations are already in surface coordinates (Y flipped).
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { button: Button, at: Point },
    PointerUp { button: Button, at: Point },
    KeyDown { code: KeyCode, modifiers: Modifiers },
    KeyUp { code: KeyCode, modifiers: Modifiers },
}

#[derive(Debug, Clone)]
pub struct Timing {
    // Press-to-release gap for both pointer and key events
    pub hold: Duration,
    // Gap between one character's release and the next character's press
    pub char_pacing: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(50),
            char_pacing: Duration::from_millis(50),
        }
    }
}
