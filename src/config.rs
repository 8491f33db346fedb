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

//! Configuration
//!
//! Every field has a default; a TOML file only needs the keys it changes.

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture;
use crate::mailbox::Mailbox;
use crate::types::Timing;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mailbox: PathBuf,
    // Process name the liveness check looks for
    pub target: String,
    pub poll_interval_ms: u64,
    // Gap between plan commands, must stay above the poll interval
    pub dispatch_pacing_ms: u64,
    pub raw_pacing_ms: u64,
    pub key_hold_ms: u64,
    pub char_pacing_ms: u64,
    pub model: ModelConfig,
    pub capture: CaptureConfig,
    pub surface: SurfaceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub height: f64,
    pub cols: u16,
    pub rows: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mailbox: Mailbox::default_path(),
            target: "vmctl-host".to_string(),
            poll_interval_ms: 100,
            dispatch_pacing_ms: 200,
            raw_pacing_ms: 100,
            key_hold_ms: 50,
            char_pacing_ms: 50,
            model: ModelConfig::default(),
            capture: CaptureConfig::default(),
            surface: SurfaceConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            command: capture::default_command(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            height: 1080.0,
            cols: 80,
            rows: 24,
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate().context("Inconsistent timing")?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be above zero");
        ensure!(
            self.dispatch_pacing_ms > self.poll_interval_ms,
            "dispatch_pacing_ms ({}) must exceed poll_interval_ms ({})",
            self.dispatch_pacing_ms,
            self.poll_interval_ms
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dispatch_pacing(&self) -> Duration {
        Duration::from_millis(self.dispatch_pacing_ms)
    }

    pub fn raw_pacing(&self) -> Duration {
        Duration::from_millis(self.raw_pacing_ms)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            hold: Duration::from_millis(self.key_hold_ms),
            char_pacing: Duration::from_millis(self.char_pacing_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mailbox, std::env::temp_dir().join("vm_command.txt"));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.dispatch_pacing(), Duration::from_millis(200));
        assert_eq!(config.timing().hold, Duration::from_millis(50));
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
target = "qemu-system"

[model]
model = "gpt-4o-mini"

[surface]
height = 900.0
"#,
        )
        .unwrap();
        assert_eq!(config.target, "qemu-system");
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.max_tokens, 1000);
        assert_eq!(config.surface.height, 900.0);
        assert_eq!(config.surface.rows, 24);
        assert_eq!(config.dispatch_pacing_ms, 200);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("poll_interval_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = Config::from_toml("poll_interval_ms = 0").unwrap_err();
        assert!(format!("{:#}", err).contains("poll_interval_ms must be above zero"));
    }

    #[test]
    fn test_pacing_must_exceed_poll_interval() {
        assert!(Config::from_toml("dispatch_pacing_ms = 100").is_err());
        assert!(Config::from_toml("poll_interval_ms = 250").is_err());
        let config = Config::from_toml("poll_interval_ms = 50\ndispatch_pacing_ms = 120").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_default_timing_is_consistent() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(Config::load(None).unwrap().target, "vmctl-host");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmctl.toml");
        std::fs::write(&path, "raw_pacing_ms = 250\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().raw_pacing_ms, 250);
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
