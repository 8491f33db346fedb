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

//! Interactive prompt
//!
//! Raw commands go straight to the mailbox, anything else is a goal for the
//! orchestrator. Failures are printed and the prompt carries on.

use anyhow::Result;
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor, EditMode};
use std::path::PathBuf;

use crate::orchestrator::{CycleError, Orchestrator, Outcome};
use crate::parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    // Raw commands and natural-language goals
    Agent,
    // Raw commands only, no model
    RawOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Quit,
    Help,
    Raw(String),
    Goal(String),
}

pub fn classify(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line.to_lowercase().as_str() {
        "quit" | "exit" | "q" => Input::Quit,
        "help" | "h" => Input::Help,
        _ if parser::looks_like_command(line) => Input::Raw(line.to_string()),
        _ => Input::Goal(line.to_string()),
    }
}

pub fn print_help(mode: Mode) {
    println!("Commands:");
    println!("  click(x,y)      - Left click at coordinates");
    println!("  rightclick(x,y) - Right click at coordinates");
    println!("  type('text')    - Type text");
    println!("  key('name')     - Press key (enter, space, escape, tab, delete, up, down, left, right)");
    println!("  cmd('key')      - Press Cmd+key");
    if mode == Mode::Agent {
        println!("  [any text]      - Describe what you want done; the model plans the commands");
    }
    println!("  quit            - Exit");
    println!("  help            - Show this help");
}

pub fn report_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::NothingToDo { explanation } => {
            println!("{} {}", "Plan:".cyan(), explanation);
            println!("{}", "Nothing to do".dim());
        }
        Outcome::Dispatched {
            explanation,
            sent,
            dropped,
        } => {
            println!("{} {}", "Plan:".cyan(), explanation);
            for command in sent {
                println!("  {} {}", "→".green(), command);
            }
            for raw in dropped {
                println!("  {} {} (not a valid command)", "✗".yellow(), raw);
            }
        }
    }
}

fn print_error(message: &str) {
    println!("{} {}", "✗".red(), message);
}

/// Failure text for a goal, with the model's reply attached when that is
/// what could not be read.
pub fn failure_report(error: &CycleError) -> String {
    match error.raw_response() {
        Some(response) => format!("{}\nResponse was:\n{}", error, response),
        None => error.to_string(),
    }
}

fn history_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("vmctl").join("history.txt"))
        .unwrap_or_else(|| PathBuf::from(".vmctl_history"))
}

/// Handle one classified line. Returns false when the prompt should exit.
pub async fn handle(orchestrator: &mut Orchestrator, mode: Mode, input: Input) -> bool {
    match input {
        Input::Empty => {}
        Input::Quit => return false,
        Input::Help => print_help(mode),
        Input::Raw(raw) => match orchestrator.dispatch_raw(&raw).await {
            Ok(command) => println!("{} Sent command: {}", "✓".green(), command),
            Err(e) => print_error(&e.to_string()),
        },
        Input::Goal(_) if mode == Mode::RawOnly => {
            print_error("Invalid command. Type 'help' for available commands.");
        }
        Input::Goal(goal) => {
            println!("{} {}", "Processing:".cyan(), goal);
            match orchestrator.run_goal(&goal).await {
                Ok(outcome) => report_outcome(&outcome),
                Err(e) => print_error(&failure_report(&e)),
            }
        }
    }
    true
}

pub async fn run(orchestrator: &mut Orchestrator, mode: Mode) -> Result<()> {
    let config = Config::builder().edit_mode(EditMode::Emacs).build();
    let mut rl = DefaultEditor::with_config(config)?;

    let history = history_path();
    let _ = rl.load_history(&history);

    println!("{}", "VM Remote Controller".bold());
    if orchestrator.target_alive() {
        println!("{} Target detected, ready for commands", "✓".green());
    } else {
        println!(
            "{} Target not running yet; commands will be refused until it starts",
            "!".yellow()
        );
    }
    print_help(mode);
    println!();

    loop {
        match rl.readline("vm> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.trim());
                }
                if !handle(orchestrator, mode, classify(&line)).await {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(dir) = history.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let _ = rl.save_history(&history);
    println!("Goodbye!");
    Ok(())
}
