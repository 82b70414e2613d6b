//! Raw mode and alternate screen handling, including restore on panic.

use std::io::{Stdout, stdout};

use color_eyre::eyre::Result;
use crossterm::{cursor, execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Size;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Set once `enter` succeeded; only then is there anything to undo.
    active: bool,
}

impl Tui {
    pub fn new() -> Result<Self> {
        Ok(Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
            active: false,
        })
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.active = true;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        self.terminal.clear()?;
        Ok(())
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut ratatui::Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    pub fn size(&self) -> Result<Size> {
        Ok(self.terminal.size()?)
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if self.active {
            restore();
        }
    }
}

/// Leave the alternate screen and raw mode. Best effort: it also runs
/// from the panic hook, where there is nobody to report to.
fn restore() {
    let _ = execute!(stdout(), cursor::Show, terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// color-eyre reports for errors; panics restore the terminal before the
/// report is printed. Call before [`Tui::enter`].
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    let report = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        report(info);
    }));
    Ok(())
}
