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

//! Screenshot capture through an external utility

use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture command is empty")]
    NoCommand,
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("'{program}' exited with {status}")]
    Failed { program: String, status: String },
    #[error("failed to read screenshot: {0}")]
    Read(#[from] std::io::Error),
    #[error("screenshot is empty")]
    Empty,
}

/// Produces the current screen as opaque image bytes.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self) -> Result<Vec<u8>, CaptureError>;
}

/// Placeholder replaced by the output file path in capture arguments.
pub const PATH_PLACEHOLDER: &str = "{path}";

pub fn default_command() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "macos") {
        &["screencapture", "-x", PATH_PLACEHOLDER]
    } else {
        &["import", "-window", "root", PATH_PLACEHOLDER]
    };
    parts.iter().map(|s| s.to_string()).collect()
}

/// Runs a capture program that writes a PNG to the path it is given.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    command: Vec<String>,
}

impl CommandCapture {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ScreenCapture for CommandCapture {
    async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        let (program, args) = self.command.split_first().ok_or(CaptureError::NoCommand)?;

        let output = tempfile::Builder::new()
            .prefix("vm_screenshot_")
            .suffix(".png")
            .tempfile()?;
        let path = output.path().to_string_lossy().to_string();
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace(PATH_PLACEHOLDER, &path))
            .collect();

        let status = tokio::process::Command::new(program)
            .args(&args)
            .status()
            .await
            .map_err(|source| CaptureError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(CaptureError::Failed {
                program: program.clone(),
                status: status.to_string(),
            });
        }

        let bytes = tokio::fs::read(output.path()).await?;
        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }

        debug!(bytes = bytes.len(), "screenshot captured");
        Ok(bytes)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandCapture {
        CommandCapture::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ])
    }

    #[tokio::test]
    async fn test_reads_bytes_written_by_command() {
        let capture = sh("printf 'PNGDATA' > {path}");
        assert_eq!(capture.capture().await.unwrap(), b"PNGDATA".to_vec());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let capture = sh("exit 3");
        assert!(matches!(
            capture.capture().await,
            Err(CaptureError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let capture = sh("true");
        assert!(matches!(capture.capture().await, Err(CaptureError::Empty)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let capture = CommandCapture::new(vec!["/nonexistent/capture-tool".to_string()]);
        assert!(matches!(
            capture.capture().await,
            Err(CaptureError::Spawn { .. })
        ));
        assert!(matches!(
            CommandCapture::new(vec![]).capture().await,
            Err(CaptureError::NoCommand)
        ));
    }
}
