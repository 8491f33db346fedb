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

//! Command grammar
//!
//! Parses and serializes the five command forms:
//! - `click(x,y)` and `rightclick(x,y)` with non-negative numbers
//! - `type('text')`
//! - `key('name')`
//! - `cmd('name')`
//!
//! Keywords are case-sensitive. Anything else is rejected with
//! [`InvalidCommand`]; callers on the receiving side drop it silently.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, space0},
    combinator::{all_consuming, map, map_opt},
    sequence::{delimited, separated_pair},
};
use std::fmt;
use std::str::FromStr;

use crate::types::Command;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid command: '{0}'")]
pub struct InvalidCommand(pub String);

/// Heads that mark input as a raw command rather than free text.
pub const COMMAND_HEADS: [&str; 5] = ["click(", "rightclick(", "type(", "key(", "cmd("];

fn coordinate(input: &str) -> IResult<&str, f64> {
    map_opt(
        delimited(space0, nom::number::complete::double, space0),
        |v: f64| (v.is_finite() && v >= 0.0).then_some(v),
    )
    .parse(input)
}

fn coordinate_pair(input: &str) -> IResult<&str, (f64, f64)> {
    delimited(
        char('('),
        separated_pair(coordinate, char(','), coordinate),
        char(')'),
    )
    .parse(input)
}

fn parse_click(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag("click")(input)?;
    let (input, (x, y)) = coordinate_pair(input)?;
    Ok((input, Command::Click { x, y }))
}

fn parse_right_click(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag("rightclick")(input)?;
    let (input, (x, y)) = coordinate_pair(input)?;
    Ok((input, Command::RightClick { x, y }))
}

// `head('...')` - everything between the opening quote and the final `')`
// is the argument, quotes inside included.
fn quoted_argument<'a>(head: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, String> {
    move |input: &'a str| {
        let (rest, _) = tag(head)(input)?;
        let (rest, _) = tag("('")(rest)?;
        match rest.strip_suffix("')") {
            Some(arg) if !arg.trim().is_empty() => Ok(("", arg.to_string())),
            _ => Err(nom::Err::Error(nom::error::Error::new(
                rest,
                nom::error::ErrorKind::Verify,
            ))),
        }
    }
}

fn parse_type(input: &str) -> IResult<&str, Command> {
    map(quoted_argument("type"), |text| Command::Type { text }).parse(input)
}

fn parse_key(input: &str) -> IResult<&str, Command> {
    map(quoted_argument("key"), |name| Command::Key { name }).parse(input)
}

fn parse_cmd_key(input: &str) -> IResult<&str, Command> {
    map(quoted_argument("cmd"), |name| Command::CmdKey { name }).parse(input)
}

fn parse_command(input: &str) -> IResult<&str, Command> {
    all_consuming(alt((
        parse_right_click,
        parse_click,
        parse_type,
        parse_key,
        parse_cmd_key,
    )))
    .parse(input)
}

/// Parse one raw command. Surrounding whitespace is ignored.
pub fn parse(raw: &str) -> Result<Command, InvalidCommand> {
    match parse_command(raw.trim()) {
        Ok((_, command)) => Ok(command),
        Err(_) => Err(InvalidCommand(raw.to_string())),
    }
}

/// Whether `input` starts like a raw command, valid or not.
pub fn looks_like_command(input: &str) -> bool {
    let input = input.trim_start();
    COMMAND_HEADS.iter().any(|head| input.starts_with(head))
}

impl FromStr for Command {
    type Err = InvalidCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Click { x, y } => write!(f, "click({},{})", x, y),
            Command::RightClick { x, y } => write!(f, "rightclick({},{})", x, y),
            Command::Type { text } => write!(f, "type('{}')", text),
            Command::Key { name } => write!(f, "key('{}')", name),
            Command::CmdKey { name } => write!(f, "cmd('{}')", name),
        }
    }
}
