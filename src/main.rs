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


//! vmctl - send input to a VM console
//!
//! ```bash
//! vmctl                          # interactive prompt
//! vmctl --raw-only               # prompt without the model
//! vmctl send "click(120,340)"
//! vmctl plan "open the terminal"
//! ```

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use vmctl::config::Config;
use vmctl::model::OpenAiClient;
use vmctl::orchestrator::Orchestrator;
use vmctl::{logging, repl};

#[derive(Parser)]
#[command(name = "vmctl")]
#[command(version)]
#[command(about = "Drive a VM console with raw commands or model-planned goals")]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "VMCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Mailbox file shared with vmctl-host
    #[arg(long, env = "VMCTL_MAILBOX")]
    mailbox: Option<PathBuf>,

    /// Process name that must be running before anything is sent
    #[arg(long, env = "VMCTL_TARGET")]
    target: Option<String>,

    /// Chat completions endpoint
    #[arg(long, env = "VMCTL_ENDPOINT")]
    endpoint: Option<String>,

    /// Vision model name
    #[arg(long, env = "VMCTL_MODEL")]
    model: Option<String>,

    /// Only accept raw commands at the prompt
    #[arg(long)]
    raw_only: bool,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Send one raw command, e.g. "key('enter')"
    Send { command: String },
    /// Run one capture, plan and dispatch cycle
    Plan {
        #[arg(trailing_var_arg = true, required = true)]
        goal: Vec<String>,
    },
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(mailbox) = &self.mailbox {
            config.mailbox = mailbox.clone();
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.model.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let config = args.config()?;
    let model = OpenAiClient::from_env(config.model.clone())?;
    if !model.has_api_key() && !args.raw_only && !matches!(args.command, Some(Action::Send { .. })) {
        warn!(
            var = %config.model.api_key_env,
            "no API key set; goals will fail, raw commands still work"
        );
    }

    let mut orchestrator = Orchestrator::from_config(&config, Box::new(model));

    match args.command {
        None => {
            let mode = if args.raw_only {
                repl::Mode::RawOnly
            } else {
                repl::Mode::Agent
            };
            repl::run(&mut orchestrator, mode).await
        }
        Some(Action::Send { command }) => {
            let command = orchestrator.dispatch_raw(&command).await?;
            println!("Sent command: {command}");
            Ok(())
        }
        Some(Action::Plan { goal }) => {
            if args.raw_only {
                bail!("--raw-only cannot be combined with plan");
            }
            match orchestrator.run_goal(&goal.join(" ")).await {
                Ok(outcome) => {
                    repl::report_outcome(&outcome);
                    Ok(())
                }
                Err(e) => bail!("{}", repl::failure_report(&e)),
            }
        }
    }
}
