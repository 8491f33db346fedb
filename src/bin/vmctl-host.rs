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


//! vmctl-host - replay mailbox commands as input events
//!
//! ```bash
//! vmctl-host                          # log events only
//! vmctl-host --console bash -l        # type into a console program
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use vmctl::config::Config;
use vmctl::host::{self, Host};
use vmctl::injector::Injector;
use vmctl::logging;
use vmctl::mailbox::Mailbox;
use vmctl::pty::PtySurface;
use vmctl::surface::{LogSurface, SharedSurface};

#[derive(Parser)]
#[command(name = "vmctl-host")]
#[command(version)]
#[command(about = "Consume vmctl commands and inject them as input")]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "VMCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Mailbox file shared with vmctl
    #[arg(long, env = "VMCTL_MAILBOX")]
    mailbox: Option<PathBuf>,

    /// Surface height used to flip pointer coordinates
    #[arg(long)]
    height: Option<f64>,

    /// Run this program in a PTY and deliver key events to it
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    console: Option<Vec<String>>,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Console program and its arguments. A leading `--` separator is
    /// dropped, since `--console` swallows it as a value.
    fn console_program(&self) -> Option<&[String]> {
        let program = self.console.as_deref()?;
        let program = match program.split_first() {
            Some((first, rest)) if first == "--" => rest,
            _ => program,
        };
        (!program.is_empty()).then_some(program)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(mailbox) = &args.mailbox {
        config.mailbox = mailbox.clone();
    }
    if let Some(height) = args.height {
        config.surface.height = height;
    }

    let surface: SharedSurface = match args.console_program() {
        Some(program) => {
            info!(program = ?program, "console surface");
            Arc::new(Mutex::new(PtySurface::spawn(
                program,
                config.surface.cols,
                config.surface.rows,
            )?))
        }
        None => Arc::new(Mutex::new(LogSurface::new(config.surface.height))),
    };

    let running = host::stop_on_ctrl_c()?;
    let host = Host::new(
        Mailbox::new(&config.mailbox),
        Injector::new(surface, config.timing()),
        config.poll_interval(),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(host.run(running));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_console_program_and_args() {
        let args = parse(&["vmctl-host", "--console", "bash", "-l"]);
        assert_eq!(
            args.console_program(),
            Some(&["bash".to_string(), "-l".to_string()][..])
        );
    }

    #[test]
    fn test_console_with_separator() {
        let args = parse(&["vmctl-host", "--console", "--", "sh", "-c", "echo hi"]);
        assert_eq!(
            args.console_program(),
            Some(&["sh".to_string(), "-c".to_string(), "echo hi".to_string()][..])
        );
    }

    #[test]
    fn test_without_console() {
        let args = parse(&["vmctl-host", "--height", "900"]);
        assert_eq!(args.console_program(), None);
        assert_eq!(args.height, Some(900.0));
    }
}
