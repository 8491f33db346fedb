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

//! Goal orchestration
//!
//! One cycle runs Idle -> Capturing -> Requesting -> Parsing -> Dispatching
//! and always ends back in Idle. Any failure aborts the cycle without
//! retrying. Plan commands go to the mailbox one at a time with a pause
//! after each so the host's poll sees it before anything overwrites it.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::capture::{CaptureError, CommandCapture, ScreenCapture};
use crate::config::Config;
use crate::liveness::{self, ProcessProbe, SystemProbe};
use crate::mailbox::{Mailbox, MailboxError};
use crate::model::{ModelError, VisionModel};
use crate::parser::{self, InvalidCommand};
use crate::plan;
use crate::types::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
    Requesting,
    Parsing,
    Dispatching,
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("target '{0}' is not running, start it first")]
    TargetNotRunning(String),
    #[error("failed to capture screenshot: {0}")]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("could not parse response")]
    Unparseable { response: String },
}

impl CycleError {
    /// The model reply, when the cycle failed because it could not be read.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            CycleError::Unparseable { response } => Some(response),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Invalid(#[from] InvalidCommand),
    #[error("target '{0}' is not running, start it first")]
    TargetNotRunning(String),
    #[error(transparent)]
    Mailbox(#[from] MailboxError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Dispatched {
        explanation: String,
        sent: Vec<Command>,
        // Plan entries the grammar rejected
        dropped: Vec<String>,
    },
    NothingToDo {
        explanation: String,
    },
}

pub struct Orchestrator {
    probe: Box<dyn ProcessProbe>,
    capture: Box<dyn ScreenCapture>,
    model: Box<dyn VisionModel>,
    mailbox: Mailbox,
    target: String,
    dispatch_pacing: Duration,
    raw_pacing: Duration,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        probe: Box<dyn ProcessProbe>,
        capture: Box<dyn ScreenCapture>,
        model: Box<dyn VisionModel>,
        mailbox: Mailbox,
        target: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            capture,
            model,
            mailbox,
            target: target.into(),
            dispatch_pacing: Duration::from_millis(200),
            raw_pacing: Duration::from_millis(100),
            phase: Phase::Idle,
        }
    }

    pub fn with_pacing(mut self, dispatch: Duration, raw: Duration) -> Self {
        self.dispatch_pacing = dispatch;
        self.raw_pacing = raw;
        self
    }

    /// Wire `model` up with the host-side collaborators described by `config`.
    pub fn from_config(config: &Config, model: Box<dyn VisionModel>) -> Self {
        Self::new(
            Box::new(SystemProbe),
            Box::new(CommandCapture::new(config.capture.command.clone())),
            model,
            Mailbox::new(&config.mailbox),
            config.target.clone(),
        )
        .with_pacing(config.dispatch_pacing(), config.raw_pacing())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target_alive(&self) -> bool {
        liveness::is_target_alive(self.probe.as_ref(), &self.target)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }

    /// Run one full cycle for `goal`. The orchestrator is back in
    /// [`Phase::Idle`] when this returns, whatever the result.
    pub async fn run_goal(&mut self, goal: &str) -> Result<Outcome, CycleError> {
        let result = self.cycle(goal).await;
        if let Err(e) = &result {
            warn!(error = %e, phase = ?self.phase, "cycle aborted");
        }
        self.enter(Phase::Idle);
        result
    }

    async fn cycle(&mut self, goal: &str) -> Result<Outcome, CycleError> {
        if !self.target_alive() {
            return Err(CycleError::TargetNotRunning(self.target.clone()));
        }

        self.enter(Phase::Capturing);
        let screenshot = self.capture.capture().await?;
        info!(bytes = screenshot.len(), "screenshot captured, asking model");

        self.enter(Phase::Requesting);
        let response = self.model.complete(goal, &screenshot).await?;

        self.enter(Phase::Parsing);
        let Some(plan) = plan::extract(&response) else {
            return Err(CycleError::Unparseable { response });
        };
        info!(explanation = %plan.explanation, commands = plan.commands.len(), "plan received");

        if plan.commands.is_empty() {
            return Ok(Outcome::NothingToDo {
                explanation: plan.explanation,
            });
        }

        self.enter(Phase::Dispatching);
        let mut sent = Vec::new();
        let mut dropped = Vec::new();

        for raw in plan.commands {
            let command = match parser::parse(&raw) {
                Ok(command) => command,
                Err(e) => {
                    debug!(error = %e, "dropping plan entry");
                    dropped.push(raw);
                    continue;
                }
            };

            match self.mailbox.send(&command.to_string()) {
                Ok(()) => {
                    info!(%command, "dispatched");
                    sent.push(command);
                }
                Err(e) => warn!(error = %e, %command, "dispatch failed"),
            }
            sleep(self.dispatch_pacing).await;
        }

        Ok(Outcome::Dispatched {
            explanation: plan.explanation,
            sent,
            dropped,
        })
    }

    /// Validate and send one operator-typed command, bypassing the model.
    pub async fn dispatch_raw(&self, raw: &str) -> Result<Command, DispatchError> {
        let command = parser::parse(raw)?;
        if !self.target_alive() {
            return Err(DispatchError::TargetNotRunning(self.target.clone()));
        }
        self.mailbox.send(&command.to_string())?;
        info!(%command, "dispatched");
        sleep(self.raw_pacing).await;
        Ok(command)
    }
}
