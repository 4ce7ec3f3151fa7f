//! Terminal dashboard hosting the poll scheduler.

pub mod event;
pub mod ui;

use std::collections::HashMap;
use std::io;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use sysmon_refresh::{GraphKind, MetricsSource, MonitorEvent, PollScheduler};

use self::event::{AppEvent, EventHandler};

const INTERVAL_STEP: Duration = Duration::from_secs(1);

/// Axis captions, recomputed only when a graph reports its background stale.
#[derive(Debug, Default)]
pub struct AxisCache {
    pub x: Vec<String>,
    pub y: Vec<String>,
}

#[derive(Debug, Default)]
pub struct App {
    pub status: String,
    axes: HashMap<GraphKind, AxisCache>,
}

impl App {
    pub fn axes(&mut self, kind: GraphKind) -> &mut AxisCache {
        self.axes.entry(kind).or_default()
    }

    fn on_event(&mut self, event: MonitorEvent) {
        self.status = match event {
            MonitorEvent::IntervalChanged(interval) => {
                format!("refresh interval now {}ms", interval.as_millis())
            }
            MonitorEvent::NetMaxChanged { value, unit, .. } => {
                format!("network scale now {:.1} {}", value, unit)
            }
        };
        info!("{}", self.status);
    }
}

/// Runs the dashboard until the user quits.
pub fn run<S: MetricsSource>(
    mut scheduler: PollScheduler<S>,
    events_rx: Receiver<MonitorEvent>,
) -> Result<()> {
    enable_raw_mode().context("Error enabling raw mode")?;
    let mut terminal = build_or_restore(
        || {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen)?;
            Terminal::new(CrosstermBackend::new(stdout))
        },
        restore_terminal,
    )?;

    let result = event_loop(&mut terminal, &mut scheduler, &events_rx);

    restore_terminal()?;
    terminal.show_cursor()?;
    result
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)
}

/// Runs the rest of the terminal setup once raw mode is on. If it fails, the
/// terminal is put back before the error is returned.
fn build_or_restore<T>(
    build: impl FnOnce() -> io::Result<T>,
    restore: impl FnOnce() -> io::Result<()>,
) -> Result<T> {
    match build() {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            if let Err(restore_err) = restore() {
                warn!("failed to restore terminal: {}", restore_err);
            }
            Err(e).context("Error setting up terminal")
        }
    }
}

fn event_loop<S: MetricsSource>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    scheduler: &mut PollScheduler<S>,
    events_rx: &Receiver<MonitorEvent>,
) -> Result<()> {
    let mut app = App::default();
    let handler = EventHandler::new(Duration::from_millis(500));
    scheduler.start();

    loop {
        for event in events_rx.try_iter() {
            app.on_event(event);
        }
        terminal.draw(|f| ui::draw(f, &mut app, scheduler))?;

        let wait = scheduler
            .time_until_next(Instant::now())
            .unwrap_or(handler.max_wait);
        match handler.next(wait)? {
            AppEvent::Tick => {
                scheduler.poll(Instant::now());
            }
            AppEvent::Input(key) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('s') => {
                    let enabled = !scheduler.config().smooth_refresh;
                    scheduler.set_smooth_refresh(enabled);
                }
                KeyCode::Char('b') => {
                    let unit = scheduler.config().network_unit.toggled();
                    scheduler.set_network_unit(unit);
                }
                KeyCode::Char('+') => {
                    let interval = scheduler.config().update_interval + INTERVAL_STEP;
                    scheduler.set_update_interval(interval);
                }
                KeyCode::Char('-') => {
                    let interval = scheduler
                        .config()
                        .update_interval
                        .saturating_sub(INTERVAL_STEP);
                    scheduler.set_update_interval(interval);
                }
                KeyCode::Char('v') => {
                    let visible = !scheduler.is_visible();
                    scheduler.set_visible(visible);
                }
                _ => {}
            },
            AppEvent::Redraw => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_setup_restores_the_terminal() {
        let restored = Cell::new(false);
        let result: Result<()> = build_or_restore(
            || Err(io::Error::other("no tty")),
            || {
                restored.set(true);
                Ok(())
            },
        );
        assert!(result.is_err());
        assert!(restored.get());
    }

    #[test]
    fn successful_setup_leaves_the_terminal_alone() {
        let restored = Cell::new(false);
        let value = build_or_restore(
            || Ok(7),
            || {
                restored.set(true);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(value, 7);
        assert!(!restored.get());
    }

    #[test]
    fn setup_error_survives_a_failed_restore() {
        let result: Result<()> = build_or_restore(
            || Err(io::Error::other("no tty")),
            || Err(io::Error::other("still no tty")),
        );
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("no tty"));
    }
}
