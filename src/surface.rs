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

//! Injection targets

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::types::InputEvent;

/// Something that receives synthetic input events.
pub trait Surface: Send {
    /// Height in surface units, used to flip pointer Y coordinates.
    fn height(&self) -> f64;
    fn deliver(&mut self, event: &InputEvent) -> Result<()>;
}

pub type SharedSurface = Arc<Mutex<dyn Surface>>;

/// Surface that only reports what it receives.
pub struct LogSurface {
    height: f64,
}

impl LogSurface {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl Surface for LogSurface {
    fn height(&self) -> f64 {
        self.height
    }

    fn deliver(&mut self, event: &InputEvent) -> Result<()> {
        info!(?event, "inject");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::time::Instant;

    /// Records every event with the tokio clock reading at delivery.
    pub struct RecordingSurface {
        pub height: f64,
        pub events: Vec<(Instant, InputEvent)>,
    }

    impl RecordingSurface {
        pub fn shared(height: f64) -> Arc<Mutex<RecordingSurface>> {
            Arc::new(Mutex::new(RecordingSurface {
                height,
                events: Vec::new(),
            }))
        }
    }

    impl Surface for RecordingSurface {
        fn height(&self) -> f64 {
            self.height
        }

        fn deliver(&mut self, event: &InputEvent) -> Result<()> {
            self.events.push((Instant::now(), event.clone()));
            Ok(())
        }
    }
}
