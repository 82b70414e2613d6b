//! Config screen: the backend settings form.
//!
//! Browse mode moves between fields and triggers operations. Enter on a
//! text or number field starts editing; leaving the field is the blur
//! event, which clamps out-of-range numbers. Every change is written to
//! the draft store.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState, Paragraph};
use throbber_widgets_tui::{Throbber, ThrobberState};
use tokio::sync::mpsc::UnboundedSender;

use ipmon_core::controller::LAST_SAVED_FORMAT;
use ipmon_core::{
    ConfigController, ConfigForm, Control, FieldKind, FormField, StatusMessage, TestDetails,
    export_status, import_status,
};

use crate::action::{Action, ConfirmAction, Notification};
use crate::component::Component;
use crate::theme;

const LABEL_WIDTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    /// Typing into the selected field.
    Editing,
    /// Typing the path of a file to import.
    Importing(String),
}

pub struct ConfigScreen {
    controller: ConfigController,
    form: ConfigForm,
    selected: usize,
    mode: Mode,
    busy: BTreeSet<Control>,
    last_saved: Option<DateTime<Local>>,
    details: Option<TestDetails>,
    throbber: ThrobberState,
    focused: bool,
}

fn notify(message: StatusMessage) -> Option<Action> {
    Some(Action::Notify(message.into()))
}

impl ConfigScreen {
    pub fn new(controller: ConfigController) -> Self {
        let form = controller.new_form();
        Self {
            controller,
            form,
            selected: 0,
            mode: Mode::Browse,
            busy: BTreeSet::new(),
            last_saved: None,
            details: None,
            throbber: ThrobberState::default(),
            focused: false,
        }
    }

    fn current(&self) -> Option<&FormField> {
        self.form.fields().get(self.selected)
    }

    fn move_by(&mut self, down: bool) {
        let len = self.form.fields().len();
        if len == 0 {
            return;
        }
        self.selected = if down {
            (self.selected + 1).min(len - 1)
        } else {
            self.selected.saturating_sub(1)
        };
    }

    /// Persist the form as the draft after a change.
    fn changed(&self) {
        self.controller.on_change(&self.form);
    }

    // ── Browse mode ──────────────────────────────────────────────────

    fn activate(&mut self, step: isize) -> Option<Action> {
        let field = self.current()?;
        let path = field.path();
        if !field.is_enabled() {
            return Some(Action::Notify(Notification::info(format!(
                "{} is disabled",
                field.label()
            ))));
        }

        let result = match field.kind() {
            FieldKind::Boolean => self.form.toggle(path).map(|_| ()),
            FieldKind::Choice => {
                let choices = field.spec().choices;
                let next = cycle(choices, field.raw(), step);
                self.form.set_value(path, next).map(|_| ())
            }
            _ => {
                self.mode = Mode::Editing;
                return None;
            }
        };
        match result {
            Ok(()) => {
                self.changed();
                None
            }
            Err(e) => Some(Action::Notify(Notification::error(e.to_string()))),
        }
    }

    fn save(&mut self) -> Option<Action> {
        match self.form.submission() {
            Ok(tree) => Some(Action::Save(tree)),
            Err(e) => notify(StatusMessage::error(format!("❌ Failed to save: {e}"))),
        }
    }

    fn test(&self) -> Option<Action> {
        match self.form.to_tree() {
            Ok(tree) => Some(Action::Test(tree)),
            Err(e) => notify(StatusMessage::error(format!("❌ Test failed: {e}"))),
        }
    }

    fn export(&self) -> Option<Action> {
        let result = std::env::current_dir()
            .map_err(|source| ipmon_core::CoreError::Io {
                path: PathBuf::from("."),
                source,
            })
            .and_then(|dir| self.controller.export(&self.form, &dir));
        notify(export_status(&result))
    }

    fn handle_browse(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_by(true);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_by(false);
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Right => self.activate(1),
            KeyCode::Left => self.activate(-1),
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('t') => self.test(),
            KeyCode::Char('R') => Some(Action::ShowConfirm(ConfirmAction::ResetDefaults)),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('i') => {
                self.mode = Mode::Importing(String::new());
                None
            }
            _ => None,
        }
    }

    // ── Editing mode ─────────────────────────────────────────────────

    fn handle_editing(&mut self, key: KeyEvent) -> Option<Action> {
        let field = self.current()?;
        let path = field.path();
        let mut raw = field.raw().to_owned();

        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => raw.push(c),
            KeyCode::Backspace => {
                raw.pop();
            }
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => return self.blur(),
            KeyCode::Down => {
                let notice = self.blur();
                self.move_by(true);
                return notice;
            }
            KeyCode::Up => {
                let notice = self.blur();
                self.move_by(false);
                return notice;
            }
            _ => return None,
        }

        // Inline errors come from the check; the only failure here is a
        // field disabled underneath us.
        if let Err(e) = self.form.set_value(path, &raw) {
            self.mode = Mode::Browse;
            return Some(Action::Notify(Notification::error(e.to_string())));
        }
        self.changed();
        None
    }

    /// Leave the field being edited.
    fn blur(&mut self) -> Option<Action> {
        self.mode = Mode::Browse;
        let path = self.current()?.path();
        let notice = self.form.blur(path);
        self.changed();
        notice.and_then(notify)
    }

    // ── Import prompt ────────────────────────────────────────────────

    fn handle_import(&mut self, key: KeyEvent) -> Option<Action> {
        let Mode::Importing(buffer) = &mut self.mode else {
            return None;
        };
        match key.code {
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Enter => {
                let path = PathBuf::from(buffer.trim());
                self.mode = Mode::Browse;
                let result = self.controller.import(&mut self.form, &path);
                if let Ok(report) = &result {
                    self.details = None;
                    tracing::debug!(applied = report.applied, "import applied to form");
                }
                return notify(import_status(&result));
            }
            _ => {}
        }
        None
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn field_item(&self, idx: usize, field: &FormField) -> ListItem<'static> {
        let active = idx == self.selected;
        let editing = active && self.mode == Mode::Editing;
        let enabled = field.is_enabled();

        let label_style = match (active, enabled) {
            (_, false) => theme::muted(),
            (true, true) => Style::default().fg(theme::CYAN),
            (false, true) => theme::text(),
        };
        let value_style = if enabled {
            Style::default().fg(theme::TEXT).add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };

        let mut spans = vec![Span::styled(
            format!("  {:<LABEL_WIDTH$}", field.label()),
            label_style,
        )];
        match field.kind() {
            FieldKind::Boolean => {
                let marker = if field.is_checked() { "[✓]" } else { "[ ]" };
                let style = if field.is_checked() {
                    Style::default().fg(theme::GREEN)
                } else {
                    theme::muted()
                };
                spans.push(Span::styled(marker, style));
            }
            FieldKind::Choice => {
                spans.push(Span::styled(format!("‹ {} ›", field.raw()), value_style));
            }
            _ => {
                spans.push(Span::styled(field.raw().to_owned(), value_style));
                if editing {
                    spans.push(Span::styled("█", Style::default().fg(theme::ACCENT)));
                }
            }
        }
        if !enabled {
            spans.push(Span::styled("  (disabled)", theme::muted()));
        }

        let mut text = Text::from(Line::from(spans));
        if let Some(err) = field.error() {
            text.push_line(Line::from(Span::styled(
                format!("    ✗ {err}"),
                theme::error(),
            )));
        }
        ListItem::new(text)
    }

    fn render_fields(&self, frame: &mut Frame, area: Rect) {
        let mut items = Vec::new();
        let mut selected_item = 0;
        let mut section = "";
        for (idx, field) in self.form.fields().iter().enumerate() {
            let this_section = field.spec().section();
            if this_section != section {
                section = this_section;
                items.push(ListItem::new(Line::from(Span::styled(
                    section.to_owned(),
                    theme::title(),
                ))));
            }
            if idx == self.selected {
                selected_item = items.len();
            }
            items.push(self.field_item(idx, field));
        }

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(theme::border(self.focused))
            .title(" Settings ")
            .title_style(theme::title());
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(theme::BG_HIGHLIGHT));
        let mut state = ListState::default().with_selected(Some(selected_item));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn control_spans(&self) -> Vec<Span<'static>> {
        let mut spans = vec![Span::raw(" ")];
        for (control, key, label, busy_label) in [
            (Control::Save, "s", "Save", "Saving..."),
            (Control::Test, "t", "Test", "Testing..."),
            (Control::Reset, "R", "Reset", "Restoring..."),
        ] {
            if self.busy.contains(&control) {
                let throbber = Throbber::default().throbber_style(Style::default().fg(theme::ACCENT));
                spans.push(throbber.to_symbol_span(&self.throbber));
                spans.push(Span::styled(format!("{busy_label}  "), Style::default().fg(theme::YELLOW)));
            } else {
                spans.push(Span::styled(format!("{key} "), theme::key_hint_key()));
                spans.push(Span::styled(format!("{label}  "), theme::key_hint()));
            }
        }
        spans.push(Span::styled("e ", theme::key_hint_key()));
        spans.push(Span::styled("Export  ", theme::key_hint()));
        spans.push(Span::styled("i ", theme::key_hint_key()));
        spans.push(Span::styled("Import", theme::key_hint()));
        spans
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(theme::border(false));

        let saved = self.last_saved.map_or_else(
            || "-".to_owned(),
            |t| t.format(LAST_SAVED_FORMAT).to_string(),
        );
        let mut lines = vec![
            Line::from(self.control_spans()),
            Line::from(vec![
                Span::styled(" Last saved: ", theme::muted()),
                Span::styled(saved, theme::text()),
            ]),
        ];

        if let Mode::Importing(buffer) = &self.mode {
            lines.push(Line::from(vec![
                Span::styled(" Import file: ", Style::default().fg(theme::CYAN)),
                Span::styled(buffer.clone(), theme::text()),
                Span::styled("█", Style::default().fg(theme::ACCENT)),
            ]));
        } else if let Some(details) = &self.details {
            let summary = details
                .entries()
                .into_iter()
                .map(|(check, result)| format!("{check}: {result}"))
                .collect::<Vec<_>>()
                .join(" · ");
            lines.push(Line::from(vec![
                Span::styled(" Last test: ", theme::muted()),
                Span::styled(summary, theme::text()),
            ]));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Neighbour of `current` in `choices`, wrapping around.
fn cycle<'a>(choices: &[&'a str], current: &str, step: isize) -> &'a str {
    let Some(len) = isize::try_from(choices.len()).ok().filter(|l| *l > 0) else {
        return "";
    };
    let idx = choices
        .iter()
        .position(|c| *c == current)
        .and_then(|i| isize::try_from(i).ok())
        .unwrap_or(0);
    let next = (idx + step).rem_euclid(len);
    usize::try_from(next)
        .ok()
        .and_then(|i| choices.get(i))
        .copied()
        .unwrap_or("")
}

impl Component for ConfigScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        if let Some(message) = self.controller.load_draft(&mut self.form) {
            action_tx.send(Action::Notify(message.into()))?;
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match self.mode {
            Mode::Browse => self.handle_browse(key),
            Mode::Editing => self.handle_editing(key),
            Mode::Importing(_) => self.handle_import(key),
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::BusyChanged(busy) => self.busy.clone_from(busy),
            Action::LastSavedChanged(at) => self.last_saved = *at,
            Action::TestFinished(outcome) => self.details.clone_from(&outcome.details),
            Action::ReloadDefaults => {
                self.controller.reload(&mut self.form);
                self.mode = Mode::Browse;
                self.details = None;
            }
            Action::Tick if !self.busy.is_empty() => self.throbber.calc_next(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let [fields, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(5)]).areas(area);
        self.render_fields(frame, fields);
        self.render_footer(frame, footer);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn captures_input(&self) -> bool {
        self.mode != Mode::Browse
    }

    fn hints(&self) -> &'static str {
        match self.mode {
            Mode::Browse => "j/k move  Enter edit/toggle  ←/→ choose",
            Mode::Editing => "type to edit  Enter/Esc done",
            Mode::Importing(_) => "type a path  Enter import  Esc cancel",
        }
    }
}
