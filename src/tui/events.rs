use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEvent};
use std::io;
use std::time::Duration;

/// Input the app reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

pub struct EventHandler {
    tick: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick: Duration::from_millis(100),
        }
    }

    pub fn next(&mut self) -> io::Result<Option<AppEvent>> {
        if !event::poll(self.tick)? {
            return Ok(None);
        }

        let event = match event::read()? {
            // Only process key press events, not release
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
            Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
            Event::Resize(width, height) => Some(AppEvent::Resize(width, height)),
            _ => None,
        };
        Ok(event)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
