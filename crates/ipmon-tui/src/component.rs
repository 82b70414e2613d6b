//! The trait every screen implements.

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::action::Action;

/// Lifecycle: `init` once, then any mix of `handle_key_event`, `update`
/// and `render`.
pub trait Component: Send {
    fn init(&mut self, _action_tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    /// Return an action to dispatch, or `None` when the key was consumed
    /// (or ignored).
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    /// React to a dispatched action, optionally answering with another.
    fn update(&mut self, _action: &Action) -> Result<Option<Action>> {
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect);

    fn set_focused(&mut self, _focused: bool) {}

    /// Whether the screen is taking text input, in which case global
    /// single-letter keys must reach it untouched.
    fn captures_input(&self) -> bool {
        false
    }

    /// Key hints for the status bar.
    fn hints(&self) -> &'static str {
        ""
    }
}
