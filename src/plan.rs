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

//! Plan extraction from model replies
//!
//! The reply should be a JSON object with `explanation` and `commands`.
//! When it is not, every line is scanned for command-shaped text instead.
//! The line scan does not validate what it finds; the grammar does that at
//! dispatch time.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Plan {
    pub explanation: String,
    pub commands: Vec<String>,
}

pub const FALLBACK_EXPLANATION: &str = "Extracted commands from response";

// (head that marks a candidate line, stricter pattern for the value)
static LINE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("click(", r"click\([0-9]+,[0-9]+\)"),
        ("type('", r"type\('[^']*'\)"),
        ("key('", r"key\('[^']*'\)"),
    ]
    .into_iter()
    .filter_map(|(head, pattern)| Regex::new(pattern).ok().map(|re| (head, re)))
    .collect()
});

fn extract_from_lines(response: &str) -> Option<Plan> {
    let mut commands = Vec::new();

    for line in response.lines() {
        for (head, pattern) in LINE_PATTERNS.iter() {
            if !line.contains(head) {
                continue;
            }
            if let Some(found) = pattern.find(line) {
                commands.push(found.as_str().to_string());
            }
        }
    }

    if commands.is_empty() {
        None
    } else {
        Some(Plan {
            explanation: FALLBACK_EXPLANATION.to_string(),
            commands,
        })
    }
}

/// Extract a plan from a model reply. `None` when neither the JSON form nor
/// the line scan yields anything.
pub fn extract(response: &str) -> Option<Plan> {
    match serde_json::from_str::<Plan>(response.trim()) {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!(error = %e, "reply is not a JSON plan, scanning lines");
            let plan = extract_from_lines(response);
            debug!(found = plan.as_ref().map_or(0, |p| p.commands.len()), "line scan finished");
            plan
        }
    }
}
