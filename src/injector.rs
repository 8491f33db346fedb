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

//! Input injection
//!
//! Turns a command into a timeline of press/release events and plays it on
//! the surface from a background task. The caller gets an [`Injection`]
//! handle back before any release fires.

use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::keymap;
use crate::surface::SharedSurface;
use crate::types::{Button, Command, InputEvent, KeyCode, Modifiers, Point, Timing};

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    // Offset from the start of the injection
    pub offset: Duration,
    pub event: InputEvent,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<ScheduledEvent>,
}

impl Timeline {
    fn push(&mut self, offset: Duration, event: InputEvent) {
        self.events.push(ScheduledEvent { offset, event });
    }

    fn press_pointer(&mut self, start: Duration, hold: Duration, button: Button, at: Point) {
        self.push(start, InputEvent::PointerDown { button, at });
        self.push(start + hold, InputEvent::PointerUp { button, at });
    }

    fn press_key(&mut self, start: Duration, hold: Duration, code: KeyCode, modifiers: Modifiers) {
        self.push(start, InputEvent::KeyDown { code, modifiers });
        self.push(start + hold, InputEvent::KeyUp { code, modifiers });
    }

    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Offset of the last event.
    pub fn duration(&self) -> Duration {
        self.events.last().map(|e| e.offset).unwrap_or_default()
    }
}

/// A scheduled injection. Dropping it does not cancel the events.
pub struct Injection {
    completes_at: Instant,
    handle: JoinHandle<()>,
}

impl Injection {
    /// When the final event is due.
    pub fn completes_at(&self) -> Instant {
        self.completes_at
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until every event has been delivered.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "injection task failed");
        }
    }
}

pub struct Injector {
    surface: SharedSurface,
    timing: Timing,
}

impl Injector {
    pub fn new(surface: SharedSurface, timing: Timing) -> Self {
        Self { surface, timing }
    }

    fn surface_height(&self) -> f64 {
        self.surface
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .height()
    }

    // Surface origin is bottom-left, command coordinates are top-left
    fn flip(&self, x: f64, y: f64) -> Point {
        Point {
            x,
            y: self.surface_height() - y,
        }
    }

    /// Build the event timeline for `command` without delivering anything.
    pub fn timeline(&self, command: &Command) -> Timeline {
        let hold = self.timing.hold;
        let mut timeline = Timeline::default();

        match command {
            Command::Click { x, y } => {
                timeline.press_pointer(Duration::ZERO, hold, Button::Left, self.flip(*x, *y));
            }
            Command::RightClick { x, y } => {
                timeline.press_pointer(Duration::ZERO, hold, Button::Right, self.flip(*x, *y));
            }
            Command::Key { name } => match keymap::key_code(name) {
                Some(code) => timeline.press_key(Duration::ZERO, hold, code, Modifiers::NONE),
                None => debug!(name = name.as_str(), "unknown key, skipped"),
            },
            Command::CmdKey { name } => match keymap::key_code(name) {
                Some(code) => timeline.press_key(Duration::ZERO, hold, code, Modifiers::COMMAND),
                None => debug!(name = name.as_str(), "unknown key, skipped"),
            },
            Command::Type { text } => {
                let mut start = Duration::ZERO;
                for c in text.chars() {
                    let Some(code) = keymap::char_code(c) else {
                        debug!(char = ?c, "no key code, skipped");
                        continue;
                    };
                    let modifiers = if c.is_uppercase() {
                        Modifiers::SHIFT
                    } else {
                        Modifiers::NONE
                    };
                    timeline.press_key(start, hold, code, modifiers);
                    start += hold + self.timing.char_pacing;
                }
            }
        }

        timeline
    }

    /// Schedule `command` on the surface and return immediately.
    /// Must be called from within a tokio runtime.
    pub fn inject(&self, command: &Command) -> Injection {
        let timeline = self.timeline(command);
        let start = Instant::now();
        let completes_at = start + timeline.duration();
        let surface = Arc::clone(&self.surface);

        debug!(%command, events = timeline.events.len(), "scheduling injection");

        let handle = tokio::spawn(async move {
            for scheduled in timeline.events {
                sleep_until(start + scheduled.offset).await;
                {
                    let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Err(e) = surface.deliver(&scheduled.event) {
                        warn!(error = %e, event = ?scheduled.event, "surface rejected event");
                    }
                }
            }
        });

        Injection {
            completes_at,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::RecordingSurface;

    fn injector(height: f64) -> (Arc<std::sync::Mutex<RecordingSurface>>, Injector) {
        let surface = RecordingSurface::shared(height);
        let injector = Injector::new(surface.clone(), Timing::default());
        (surface, injector)
    }

    #[test]
    fn test_click_timeline_flips_y() {
        let (_, injector) = injector(800.0);
        let timeline = injector.timeline(&Command::Click { x: 10.0, y: 20.0 });
        let at = Point { x: 10.0, y: 780.0 };
        assert_eq!(
            timeline.events(),
            &[
                ScheduledEvent {
                    offset: Duration::ZERO,
                    event: InputEvent::PointerDown {
                        button: Button::Left,
                        at
                    },
                },
                ScheduledEvent {
                    offset: Duration::from_millis(50),
                    event: InputEvent::PointerUp {
                        button: Button::Left,
                        at
                    },
                },
            ]
        );
    }

    #[test]
    fn test_right_click_uses_right_button() {
        let (_, injector) = injector(100.0);
        let timeline = injector.timeline(&Command::RightClick { x: 1.0, y: 1.0 });
        assert!(matches!(
            timeline.events()[0].event,
            InputEvent::PointerDown {
                button: Button::Right,
                ..
            }
        ));
    }

    #[test]
    fn test_type_upper_case_sets_shift() {
        let (_, injector) = injector(100.0);
        let timeline = injector.timeline(&Command::Type {
            text: "Hi".to_string(),
        });
        let h = keymap::char_code('h').unwrap();
        let i = keymap::char_code('i').unwrap();
        let downs: Vec<_> = timeline
            .events()
            .iter()
            .filter_map(|s| match s.event {
                InputEvent::KeyDown { code, modifiers } => Some((s.offset, code, modifiers)),
                _ => None,
            })
            .collect();
        assert_eq!(
            downs,
            vec![
                (Duration::ZERO, h, Modifiers::SHIFT),
                (Duration::from_millis(100), i, Modifiers::NONE),
            ]
        );
        assert_eq!(timeline.events().len(), 4);
        assert_eq!(timeline.duration(), Duration::from_millis(150));
    }

    #[test]
    fn test_type_skips_unsupported_chars() {
        let (_, injector) = injector(100.0);
        let timeline = injector.timeline(&Command::Type {
            text: "a!b".to_string(),
        });
        assert_eq!(timeline.events().len(), 4);
        // The skipped '!' leaves no gap
        assert_eq!(timeline.events()[2].offset, Duration::from_millis(100));
    }

    #[test]
    fn test_cmd_key_sets_command_modifier() {
        let (_, injector) = injector(100.0);
        let timeline = injector.timeline(&Command::CmdKey {
            name: "space".to_string(),
        });
        assert_eq!(
            timeline.events()[0].event,
            InputEvent::KeyDown {
                code: keymap::SPACE,
                modifiers: Modifiers::COMMAND
            }
        );
    }

    #[test]
    fn test_unknown_key_yields_empty_timeline() {
        let (_, injector) = injector(100.0);
        let timeline = injector.timeline(&Command::Key {
            name: "%%".to_string(),
        });
        assert!(timeline.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_returns_before_release() {
        let (surface, injector) = injector(600.0);
        let start = Instant::now();
        let injection = injector.inject(&Command::Click { x: 5.0, y: 5.0 });
        assert_eq!(injection.completes_at(), start + Duration::from_millis(50));
        assert!(surface.lock().unwrap().events.is_empty());

        injection.wait().await;
        let recorded = surface.lock().unwrap();
        let events = &recorded.events;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].0 - events[0].0, Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_type_paces_characters() {
        let (surface, injector) = injector(600.0);
        injector
            .inject(&Command::Type {
                text: "Hi".to_string(),
            })
            .wait()
            .await;

        let recorded = surface.lock().unwrap();
        let events = &recorded.events;
        assert_eq!(events.len(), 4);
        let h = keymap::char_code('h').unwrap();
        assert_eq!(
            events[0].1,
            InputEvent::KeyDown {
                code: h,
                modifiers: Modifiers::SHIFT
            }
        );
        for pair in events.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= Duration::from_millis(50));
        }
    }
}
