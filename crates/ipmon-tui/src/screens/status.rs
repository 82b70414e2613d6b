//! Status screen: segment selector and the device grid.

use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};
use throbber_widgets_tui::{Throbber, ThrobberState};

use ipmon_core::{DeviceCell, KNOWN_SEGMENTS, PollState, StatusSnapshot, TableView};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::status_indicator;

/// Height of one grid row: three text lines plus the cell border.
const CELL_HEIGHT: u16 = 5;

pub struct StatusScreen {
    focused: bool,
    view: TableView,
    poll_state: PollState,
    segments: Vec<String>,
    selected: usize,
    poll_interval: Duration,
    /// First grid row on screen.
    scroll: usize,
    throbber: ThrobberState,
}

impl StatusScreen {
    pub fn new(default_segment: &str, poll_interval: Duration) -> Self {
        let mut screen = Self {
            focused: false,
            view: TableView::Placeholder(ipmon_core::poller::PLACEHOLDER.into()),
            poll_state: PollState::Idle,
            segments: KNOWN_SEGMENTS.iter().map(|s| (*s).to_owned()).collect(),
            selected: 0,
            poll_interval,
            scroll: 0,
            throbber: ThrobberState::default(),
        };
        screen.show_segment(default_segment);
        screen
    }

    fn segment(&self) -> &str {
        self.segments.get(self.selected).map_or("", String::as_str)
    }

    /// Point the selector at `segment`, adding it when it is not one of
    /// the known VLANs.
    fn show_segment(&mut self, segment: &str) {
        self.selected = match self.segments.iter().position(|s| s == segment) {
            Some(idx) => idx,
            None => {
                self.segments.push(segment.to_owned());
                self.segments.len() - 1
            }
        };
    }

    fn step_segment(&mut self, forward: bool) -> Action {
        let len = self.segments.len();
        self.selected = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        self.scroll = 0;
        Action::SelectSegment(self.segment().to_owned())
    }

    fn row_count(&self) -> usize {
        self.view.snapshot().map_or(0, |s| s.grid.rows().len())
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_selector(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(theme::border(self.focused))
            .title(" Segment ")
            .title_style(theme::title());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [tabs_area, state_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(34)]).areas(inner);

        let mut spans = Vec::with_capacity(self.segments.len() * 2);
        for (idx, segment) in self.segments.iter().enumerate() {
            let style = if idx == self.selected {
                theme::selected()
            } else {
                theme::text()
            };
            spans.push(Span::styled(format!(" {segment} "), style));
            spans.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), tabs_area);

        if self.poll_state == PollState::Refreshing {
            let throbber = Throbber::default()
                .label("Refreshing...")
                .style(theme::text())
                .throbber_style(Style::default().fg(theme::ACCENT));
            frame.render_stateful_widget(throbber, state_area, &mut self.throbber.clone());
        } else {
            let every = humantime::format_duration(self.poll_interval);
            let text = match self.view.snapshot() {
                Some(s) => format!("updated {} · every {every}", s.fetched_at.format("%H:%M:%S")),
                None => format!("every {every}"),
            };
            frame.render_widget(
                Paragraph::new(Span::styled(text, theme::muted())).alignment(Alignment::Right),
                state_area,
            );
        }
    }

    fn render_grid(&self, frame: &mut Frame, area: Rect, snapshot: &StatusSnapshot) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(theme::border(false))
            .title(format!(
                " {} · {} device(s) ",
                snapshot.segment,
                snapshot.grid.device_count()
            ))
            .title_style(theme::title());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if snapshot.grid.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("No devices in segment {}", snapshot.segment),
                    theme::muted(),
                ))
                .alignment(Alignment::Center),
                inner,
            );
            return;
        }

        let visible = usize::from(inner.height / CELL_HEIGHT);
        let mut y = inner.y;
        for row in snapshot.grid.rows().iter().skip(self.scroll).take(visible) {
            let row_area = Rect::new(inner.x, y, inner.width, CELL_HEIGHT);
            y += CELL_HEIGHT;
            let cols: [Rect; 3] =
                Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(row_area);
            for (slot, col) in row.iter().zip(cols) {
                if let Some(cell) = slot {
                    render_cell(frame, col, cell);
                }
            }
        }
    }
}

fn render_cell(frame: &mut Frame, area: Rect, cell: &DeviceCell) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(theme::muted());
    let lines = vec![
        Line::from(Span::styled(
            cell.description.clone(),
            theme::text().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(cell.ip.clone(), theme::muted())),
        status_indicator::indicator_line(cell.indicator),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

impl Component for StatusScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Left | KeyCode::Char('h') => Some(self.step_segment(false)),
            KeyCode::Right | KeyCode::Char('l') => Some(self.step_segment(true)),
            KeyCode::Char('r') => Some(Action::RefreshNow),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.scroll + 1 < self.row_count() {
                    self.scroll += 1;
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            KeyCode::Char('g') => {
                self.scroll = 0;
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ViewUpdated(view) => {
                self.view = view.clone();
                self.scroll = self.scroll.min(self.row_count().saturating_sub(1));
            }
            Action::PollStateChanged(state) => self.poll_state = *state,
            Action::SegmentChanged(segment) => {
                if segment != self.segment() {
                    self.show_segment(segment);
                    self.scroll = 0;
                }
            }
            Action::Tick if self.poll_state == PollState::Refreshing => self.throbber.calc_next(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let [selector, body] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
        self.render_selector(frame, selector);

        match &self.view {
            TableView::Placeholder(text) => {
                let block = Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(theme::border(false));
                frame.render_widget(
                    Paragraph::new(Span::styled(text.clone(), theme::muted()))
                        .alignment(Alignment::Center)
                        .block(block),
                    body,
                );
            }
            TableView::Loaded(snapshot) => self.render_grid(frame, body, snapshot),
        }
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn hints(&self) -> &'static str {
        "←/→ segment  r refresh  j/k scroll"
    }
}
