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

//! Single-slot file mailbox
//!
//! The producer writes the slot, the host claims it. The slot holds at most
//! one command and a write replaces whatever is there. Writes go through a
//! temp file in the same directory and a rename, so a reader never sees
//! partial content. Reads claim the slot by renaming it away first, which
//! makes read-then-clear a single step with respect to the producer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("failed to stage command next to {path}: {source}")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to publish command to {path}: {source}")]
    Publish {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Mailbox {
    path: PathBuf,
}

impl Mailbox {
    pub const FILE_NAME: &'static str = "vm_command.txt";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The well-known slot in the system temp directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(Self::FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn claim_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.claimed", std::process::id()));
        self.path.with_file_name(name)
    }

    /// Replace the slot content with `raw`. Returns once the rename lands;
    /// there is no confirmation that anyone consumed it.
    pub fn send(&self, raw: &str) -> Result<(), MailboxError> {
        let stage = |source| MailboxError::Stage {
            path: self.path.clone(),
            source,
        };

        let mut staged = tempfile::NamedTempFile::new_in(self.parent()).map_err(stage)?;
        staged.write_all(raw.as_bytes()).map_err(stage)?;
        staged.flush().map_err(stage)?;

        staged
            .persist(&self.path)
            .map_err(|e| MailboxError::Publish {
                path: self.path.clone(),
                source: e.error,
            })?;

        debug!(path = %self.path.display(), command = raw, "mailbox written");
        Ok(())
    }

    /// Claim and clear the slot. Empty slot, a slot that vanished under us,
    /// and unreadable content all count as nothing pending.
    pub fn take(&self) -> Option<String> {
        let claimed = self.claim_path();
        if let Err(e) = fs::rename(&self.path, &claimed) {
            if e.kind() != std::io::ErrorKind::NotFound {
                trace!(error = %e, "mailbox claim failed");
            }
            return None;
        }

        let content = fs::read_to_string(&claimed);
        let _ = fs::remove_file(&claimed);

        match content {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                trace!(error = %e, "mailbox read failed");
                None
            }
        }
    }

    /// Whether a command is waiting in the slot.
    pub fn is_pending(&self) -> bool {
        self.path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox() -> (tempfile::TempDir, Mailbox) {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = Mailbox::new(dir.path().join(Mailbox::FILE_NAME));
        (dir, mailbox)
    }

    #[test]
    fn test_take_on_empty_slot() {
        let (_dir, mailbox) = mailbox();
        assert_eq!(mailbox.take(), None);
        assert!(!mailbox.is_pending());
    }

    #[test]
    fn test_send_then_take() {
        let (_dir, mailbox) = mailbox();
        mailbox.send("click(10,20)").unwrap();
        assert!(mailbox.is_pending());
        assert_eq!(mailbox.take(), Some("click(10,20)".to_string()));
        assert!(!mailbox.is_pending());
    }

    #[test]
    fn test_last_write_wins() {
        let (_dir, mailbox) = mailbox();
        mailbox.send("key('a')").unwrap();
        mailbox.send("key('b')").unwrap();
        assert_eq!(mailbox.take(), Some("key('b')".to_string()));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_consecutive_takes_never_repeat() {
        let (_dir, mailbox) = mailbox();
        mailbox.send("type('same')").unwrap();
        let first = mailbox.take();
        mailbox.send("type('same')").unwrap();
        let second = mailbox.take();
        let third = mailbox.take();
        assert_eq!(first.as_deref(), Some("type('same')"));
        assert_eq!(second.as_deref(), Some("type('same')"));
        assert_eq!(third, None);
    }

    #[test]
    fn test_take_trims_whitespace() {
        let (_dir, mailbox) = mailbox();
        mailbox.send("  key('enter')\n").unwrap();
        assert_eq!(mailbox.take(), Some("key('enter')".to_string()));
    }

    #[test]
    fn test_blank_content_counts_as_nothing() {
        let (_dir, mailbox) = mailbox();
        mailbox.send("   \n").unwrap();
        assert_eq!(mailbox.take(), None);
        assert!(!mailbox.is_pending());
    }

    #[test]
    fn test_no_staging_files_left_behind() {
        let (dir, mailbox) = mailbox();
        mailbox.send("click(1,2)").unwrap();
        mailbox.take();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
