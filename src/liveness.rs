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

//! Target liveness by process name
//!
//! A name match is a heuristic: another process with a matching name gives a
//! false positive, a relaunching target a false negative.

use sysinfo::{ProcessesToUpdate, System};

/// Source of running process names.
pub trait ProcessProbe: Send + Sync {
    fn process_names(&self) -> Vec<String>;
}

/// Enumerates host processes through sysinfo.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn process_names(&self) -> Vec<String> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
            .processes()
            .values()
            .map(|p| p.name().to_string_lossy().to_string())
            .collect()
    }
}

/// True when any running process name contains `target`.
pub fn is_target_alive(probe: &dyn ProcessProbe, target: &str) -> bool {
    probe
        .process_names()
        .iter()
        .any(|name| name.contains(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(Vec<&'static str>);

    impl ProcessProbe for FixedProbe {
        fn process_names(&self) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }
    }

    #[test]
    fn test_alive_on_substring_match() {
        let probe = FixedProbe(vec!["launchd", "vmctl-host", "zsh"]);
        assert!(is_target_alive(&probe, "vmctl-host"));
        assert!(is_target_alive(&probe, "vmctl"));
    }

    #[test]
    fn test_dead_when_no_name_matches() {
        let probe = FixedProbe(vec!["launchd", "Finder"]);
        assert!(!is_target_alive(&probe, "vmctl-host"));
        assert!(!is_target_alive(&FixedProbe(vec![]), "vmctl-host"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let probe = FixedProbe(vec!["VMCTL-HOST"]);
        assert!(!is_target_alive(&probe, "vmctl-host"));
    }

    #[test]
    fn test_system_probe_sees_processes() {
        assert!(!SystemProbe.process_names().is_empty());
    }
}
