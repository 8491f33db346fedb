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


//! Input control plane for a VM console.
//!
//! `vmctl` turns operator commands or model plans into single-line commands
//! and drops them in a file mailbox; `vmctl-host` claims them and replays
//! them as timed input events on a surface.

pub mod capture;
pub mod config;
pub mod host;
pub mod injector;
pub mod keymap;
pub mod liveness;
pub mod logging;
pub mod mailbox;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod plan;
pub mod pty;
pub mod repl;
pub mod surface;
pub mod types;
