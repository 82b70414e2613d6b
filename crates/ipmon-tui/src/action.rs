//! Actions flowing through the TUI event loop.
//!
//! Key presses, background refresh results and controller state changes
//! all end up here; `App::process_action` is the single place they land.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Local};

use ipmon_core::{
    Control, ConfigTree, MessageLevel, PollState, RESET_PROMPT, StatusMessage, TableView,
    TestOutcome,
};

use crate::screen::ScreenId;

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ────────────────────────────────────────────────────
    Quit,
    Tick,
    Render,

    // ── Navigation ───────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    ToggleHelp,

    // ── Status screen ────────────────────────────────────────────────
    ViewUpdated(TableView),
    PollStateChanged(PollState),
    SegmentChanged(String),
    /// Select a segment and refresh it now.
    SelectSegment(String),
    RefreshNow,

    // ── Config screen ────────────────────────────────────────────────
    BusyChanged(BTreeSet<Control>),
    LastSavedChanged(Option<DateTime<Local>>),
    Save(ConfigTree),
    Test(ConfigTree),
    TestFinished(TestOutcome),
    /// The backend restored its defaults; reload the form.
    ReloadDefaults,

    // ── Confirmation dialog ──────────────────────────────────────────
    ShowConfirm(ConfirmAction),
    ConfirmYes,
    ConfirmNo,

    // ── Notifications ────────────────────────────────────────────────
    Notify(Notification),
    DismissNotification,
}

/// Destructive operations gated behind a y/n dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    ResetDefaults,
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResetDefaults => f.write_str(RESET_PROMPT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Toast shown in the bottom-right corner until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }
}

impl From<StatusMessage> for Notification {
    fn from(msg: StatusMessage) -> Self {
        let level = match msg.level {
            MessageLevel::Success => NotificationLevel::Success,
            MessageLevel::Info => NotificationLevel::Info,
            MessageLevel::Error => NotificationLevel::Error,
        };
        Self {
            message: msg.text,
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages_keep_their_level() {
        let n = Notification::from(StatusMessage::error("❌ Failed to save: disk full"));
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.message, "❌ Failed to save: disk full");

        let n = Notification::from(StatusMessage::info("Value adjusted to the minimum allowed: 1"));
        assert_eq!(n.level, NotificationLevel::Info);
    }

    #[test]
    fn reset_dialog_asks_the_reset_question() {
        assert_eq!(ConfirmAction::ResetDefaults.to_string(), RESET_PROMPT);
    }
}
