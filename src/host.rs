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

//! Receiving side of the mailbox
//!
//! Wakes on a fixed cadence, claims whatever is in the slot, and schedules
//! it on the injector. Commands that fail the grammar are dropped; there is
//! nobody to tell.

use anyhow::Result;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::injector::{Injection, Injector};
use crate::mailbox::Mailbox;
use crate::parser;

pub struct Host {
    mailbox: Mailbox,
    injector: Injector,
    poll_interval: Duration,
}

/// Flag that flips to false on Ctrl-C.
pub fn stop_on_ctrl_c() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));

    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl-C, stopping host...");
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

impl Host {
    pub fn new(mailbox: Mailbox, injector: Injector, poll_interval: Duration) -> Self {
        Self {
            mailbox,
            injector,
            poll_interval,
        }
    }

    /// Claim the slot once and schedule what was in it.
    pub fn poll_once(&self) -> Option<Injection> {
        let raw = self.mailbox.take()?;
        match parser::parse(&raw) {
            Ok(command) => {
                info!(%command, "received");
                Some(self.injector.inject(&command))
            }
            Err(e) => {
                debug!(error = %e, "discarding");
                None
            }
        }
    }

    /// Poll until `running` goes false, then let scheduled events finish.
    pub async fn run(&self, running: Arc<AtomicBool>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Vec<Injection> = Vec::new();

        info!(mailbox = %self.mailbox.path().display(), every = ?self.poll_interval, "listening for commands");

        while running.load(Ordering::SeqCst) {
            ticker.tick().await;
            in_flight.retain(|i| !i.is_finished());
            if let Some(injection) = self.poll_once() {
                in_flight.push(injection);
            }
        }

        for injection in in_flight {
            injection.wait().await;
        }
        info!("host stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::RecordingSurface;
    use crate::types::{InputEvent, Timing};

    fn host() -> (
        tempfile::TempDir,
        Arc<std::sync::Mutex<RecordingSurface>>,
        Host,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let surface = RecordingSurface::shared(600.0);
        let host = Host::new(
            Mailbox::new(dir.path().join(Mailbox::FILE_NAME)),
            Injector::new(surface.clone(), Timing::default()),
            Duration::from_millis(100),
        );
        (dir, surface, host)
    }

    #[tokio::test]
    async fn test_poll_once_on_empty_mailbox() {
        let (_dir, _surface, host) = host();
        assert!(host.poll_once().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_command_is_consumed_and_dropped() {
        let (_dir, surface, host) = host();
        host.mailbox.send("wiggle(3)").unwrap();
        assert!(host.poll_once().is_none());
        assert!(!host.mailbox.is_pending());
        assert!(surface.lock().unwrap().events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_delivers_and_stops() {
        let (_dir, surface, host) = host();
        host.mailbox.send("key('enter')").unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let stopper = running.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stopper.store(false, Ordering::SeqCst);
        });

        host.run(running).await;

        let recorded = surface.lock().unwrap();
        assert_eq!(recorded.events.len(), 2);
        assert!(matches!(recorded.events[0].1, InputEvent::KeyDown { .. }));
        assert!(matches!(recorded.events[1].1, InputEvent::KeyUp { .. }));
    }
}
