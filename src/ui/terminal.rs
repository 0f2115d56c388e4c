//! Terminal ownership: raw mode, alternate screen and painting

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::Paragraph,
    Terminal,
};
use std::io::Stdout;
use std::time::Duration;

use crate::ui::composer::ScreenBuffer;

/// The screen primitives the refresh loop needs
pub trait Screen {
    fn enter(&mut self) -> Result<()>;

    /// `(columns, rows)`
    fn size(&self) -> Result<(u16, u16)>;

    fn paint(&mut self, buffer: &ScreenBuffer) -> Result<()>;

    /// Next key press if one is already queued; never blocks.
    fn poll_key(&mut self) -> Result<Option<KeyEvent>>;

    /// Hand the terminal back to cooked mode for a sub-view.
    fn suspend(&mut self) -> Result<()>;

    /// Take the terminal back after `suspend` and forget what was on screen.
    fn resume(&mut self) -> Result<()>;

    fn restore(&mut self) -> Result<()>;
}

pub struct TerminalScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl TerminalScreen {
    pub fn new() -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
        Ok(Self {
            terminal,
            active: false,
        })
    }

    fn setup_terminal(&mut self) -> Result<()> {
        enter_raw_mode(
            &mut self.active,
            crossterm::terminal::enable_raw_mode,
            || {
                crossterm::execute!(
                    std::io::stdout(),
                    crossterm::terminal::EnterAlternateScreen,
                    crossterm::cursor::Hide,
                )
            },
        )?;
        self.terminal.clear()?;
        Ok(())
    }

    fn teardown_terminal(&mut self) -> Result<()> {
        self.active = false;
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show,
        )?;
        Ok(())
    }
}

/// `active` turns on as soon as raw mode does, so a failing `setup` still
/// leaves the terminal marked for teardown.
fn enter_raw_mode<R, S>(active: &mut bool, raw: R, setup: S) -> Result<()>
where
    R: FnOnce() -> std::io::Result<()>,
    S: FnOnce() -> std::io::Result<()>,
{
    raw()?;
    *active = true;
    setup()?;
    Ok(())
}

impl Screen for TerminalScreen {
    fn enter(&mut self) -> Result<()> {
        self.setup_terminal()
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(crossterm::terminal::size()?)
    }

    fn paint(&mut self, buffer: &ScreenBuffer) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            let body_height = area.height.saturating_sub(1);

            let body: Vec<Line> = buffer.body.iter().map(|l| Line::raw(l.as_str())).collect();
            frame.render_widget(
                Paragraph::new(body),
                Rect {
                    height: body_height,
                    ..area
                },
            );

            if area.height > 0 {
                frame.render_widget(
                    Paragraph::new(buffer.status.as_str())
                        .style(Style::default().add_modifier(Modifier::REVERSED)),
                    Rect {
                        y: area.y + body_height,
                        height: 1,
                        ..area
                    },
                );
            }
        })?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<KeyEvent>> {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(Some(key)),
                // Resize is picked up by the next tick's size()
                _ => continue,
            }
        }
        Ok(None)
    }

    fn suspend(&mut self) -> Result<()> {
        self.teardown_terminal()
    }

    fn resume(&mut self) -> Result<()> {
        self.setup_terminal()
    }

    fn restore(&mut self) -> Result<()> {
        if self.active {
            self.teardown_terminal()?;
        }
        Ok(())
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        if self.active {
            let _ = self.teardown_terminal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn failed_screen_setup_still_needs_teardown() {
        let mut active = false;
        let result = enter_raw_mode(
            &mut active,
            || Ok(()),
            || Err(io::Error::new(io::ErrorKind::BrokenPipe, "no tty")),
        );
        assert!(result.is_err());
        assert!(active);
    }

    #[test]
    fn raw_mode_failure_leaves_nothing_to_undo() {
        let mut active = false;
        let result = enter_raw_mode(
            &mut active,
            || Err(io::Error::new(io::ErrorKind::Unsupported, "not a terminal")),
            || panic!("screen setup must not run without raw mode"),
        );
        assert!(result.is_err());
        assert!(!active);
    }

    #[test]
    fn successful_setup_is_active() {
        let mut active = false;
        enter_raw_mode(&mut active, || Ok(()), || Ok(())).unwrap();
        assert!(active);
    }
}
