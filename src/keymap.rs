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

//! Key-code tables
//!
//! Codes live in the macOS virtual key-code space, which is what the VM
//! view expects. Characters outside the table have no code and are skipped
//! by the injector.

use crate::types::KeyCode;

const CHAR_CODES: [(char, u16); 37] = [
    ('a', 0x00),
    ('s', 0x01),
    ('d', 0x02),
    ('f', 0x03),
    ('h', 0x04),
    ('g', 0x05),
    ('z', 0x06),
    ('x', 0x07),
    ('c', 0x08),
    ('v', 0x09),
    ('b', 0x0B),
    ('q', 0x0C),
    ('w', 0x0D),
    ('e', 0x0E),
    ('r', 0x0F),
    ('y', 0x10),
    ('t', 0x11),
    ('1', 0x12),
    ('2', 0x13),
    ('3', 0x14),
    ('4', 0x15),
    ('6', 0x16),
    ('5', 0x17),
    ('9', 0x19),
    ('7', 0x1A),
    ('8', 0x1C),
    ('0', 0x1D),
    ('o', 0x1F),
    ('u', 0x20),
    ('i', 0x22),
    ('p', 0x23),
    ('l', 0x25),
    ('j', 0x26),
    ('k', 0x28),
    ('n', 0x2D),
    ('m', 0x2E),
    (' ', 0x31),
];

pub const ENTER: KeyCode = KeyCode(0x24);
pub const TAB: KeyCode = KeyCode(0x30);
pub const SPACE: KeyCode = KeyCode(0x31);
pub const DELETE: KeyCode = KeyCode(0x33);
pub const ESCAPE: KeyCode = KeyCode(0x35);
pub const LEFT: KeyCode = KeyCode(0x7B);
pub const RIGHT: KeyCode = KeyCode(0x7C);
pub const DOWN: KeyCode = KeyCode(0x7D);
pub const UP: KeyCode = KeyCode(0x7E);

/// Resolve a character, case-folded, to its key code.
pub fn char_code(c: char) -> Option<KeyCode> {
    let folded = c.to_lowercase().next()?;
    CHAR_CODES
        .iter()
        .find(|(ch, _)| *ch == folded)
        .map(|(_, code)| KeyCode(*code))
}

/// Inverse of [`char_code`]; yields the lowercase character.
pub fn code_char(code: KeyCode) -> Option<char> {
    CHAR_CODES
        .iter()
        .find(|(_, c)| *c == code.0)
        .map(|(ch, _)| *ch)
}

/// Resolve a symbolic key name, falling back to the first character of the
/// name so `cmd('c')` means command+C.
pub fn key_code(name: &str) -> Option<KeyCode> {
    let code = match name.trim().to_lowercase().as_str() {
        "enter" | "return" => ENTER,
        "space" => SPACE,
        "escape" | "esc" => ESCAPE,
        "tab" => TAB,
        "delete" | "backspace" => DELETE,
        "up" => UP,
        "down" => DOWN,
        "left" => LEFT,
        "right" => RIGHT,
        other => return other.chars().next().and_then(char_code),
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_codes() {
        assert_eq!(char_code('a'), Some(KeyCode(0x00)));
        assert_eq!(char_code('H'), Some(KeyCode(0x04)));
        assert_eq!(char_code('0'), Some(KeyCode(0x1D)));
        assert_eq!(char_code(' '), Some(KeyCode(0x31)));
    }

    #[test]
    fn test_unsupported_chars() {
        for c in ['!', '.', '\n', 'é', '-'] {
            assert_eq!(char_code(c), None, "{:?}", c);
        }
    }

    #[test]
    fn test_named_keys_are_case_insensitive() {
        assert_eq!(key_code("enter"), Some(ENTER));
        assert_eq!(key_code("ENTER"), Some(ENTER));
        assert_eq!(key_code("Return"), Some(ENTER));
        assert_eq!(key_code("esc"), Some(ESCAPE));
        assert_eq!(key_code("backspace"), Some(DELETE));
        assert_eq!(key_code("up"), Some(UP));
    }

    #[test]
    fn test_name_falls_back_to_first_char() {
        assert_eq!(key_code("c"), Some(KeyCode(0x08)));
        assert_eq!(key_code("q"), Some(KeyCode(0x0C)));
        assert_eq!(key_code("!bang"), None);
    }

    #[test]
    fn test_code_char_inverts_table() {
        for c in "abcdefghijklmnopqrstuvwxyz0123456789 ".chars() {
            let code = char_code(c).unwrap();
            assert_eq!(code_char(code), Some(c));
        }
    }
}
