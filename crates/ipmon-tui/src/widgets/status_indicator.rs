//! Reachability dot drawn under each device.

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use ipmon_core::Reachability;

use crate::theme;

/// `● unreachable`, colored by state.
pub fn indicator_line(state: Reachability) -> Line<'static> {
    let color = match state {
        Reachability::Unknown => theme::RED,
    };
    Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(state.label(), theme::muted()),
    ])
}
