use std::io;
use std::time::Duration;

use crossterm::event::{self, Event as CEvent, KeyEvent, KeyEventKind};

/// Events that the application can receive.
pub enum AppEvent {
    /// The wait elapsed without input; the scheduler may have a tick due.
    Tick,
    /// A key press event from the user.
    Input(KeyEvent),
    /// Anything else that warrants a repaint (resize, focus).
    Redraw,
}

/// Waits for user input or for the scheduler's next wake-up.
///
/// Unlike a fixed tick rate, the wait is supplied per call by the poll
/// scheduler, since its period changes at runtime. `max_wait` caps it so the
/// header clock keeps moving while the period is long.
pub struct EventHandler {
    pub max_wait: Duration,
}

impl EventHandler {
    pub fn new(max_wait: Duration) -> Self {
        EventHandler { max_wait }
    }

    /// Blocks for at most `timeout` (capped at `max_wait`).
    pub fn next(&self, timeout: Duration) -> io::Result<AppEvent> {
        if !event::poll(timeout.min(self.max_wait))? {
            return Ok(AppEvent::Tick);
        }
        match event::read()? {
            CEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(AppEvent::Input(key)),
            _ => Ok(AppEvent::Redraw),
        }
    }
}
