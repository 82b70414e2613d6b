//! Application core: event loop, screen switching and action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph, Tabs};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ipmon_core::{ConfigController, ConfigTree, MonitorConfig, RefreshOutcome, ResetOutcome, StatusPoller};

use crate::action::{Action, ConfirmAction, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::config::ConfigScreen;
use crate::screens::status::StatusScreen;
use crate::theme;
use crate::tui::Tui;

/// How long a toast stays up.
const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    poller: StatusPoller,
    controller: ConfigController,
    /// Server shown in the status bar.
    server: String,
    data_cancel: CancellationToken,
    /// Open y/n dialog; it takes every key while shown.
    pending_confirm: Option<ConfirmAction>,
    notification: Option<(Notification, Instant)>,
}

impl App {
    pub fn new(poller: StatusPoller, controller: ConfigController, config: &MonitorConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let mut screens: HashMap<ScreenId, Box<dyn Component>> = HashMap::new();
        screens.insert(
            ScreenId::Status,
            Box::new(StatusScreen::new(&config.default_segment, config.poll_interval)),
        );
        screens.insert(
            ScreenId::Config,
            Box::new(ConfigScreen::new(controller.clone())),
        );

        Self {
            active_screen: ScreenId::Status,
            screens,
            running: true,
            help_visible: false,
            action_tx,
            action_rx,
            poller,
            controller,
            server: config.url.to_string(),
            data_cancel: CancellationToken::new(),
            pending_confirm: None,
            notification: None,
        }
    }

    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        if let Ok(size) = tui.size() {
            debug!(width = size.width, height = size.height, "terminal size");
        }
        self.init_screens()?;

        tokio::spawn(crate::data_bridge::run(
            self.poller.clone(),
            self.controller.clone(),
            self.action_tx.clone(),
            self.data_cancel.clone(),
        ));
        self.poller.start().await;

        let mut events = EventReader::new(Duration::from_millis(250), Duration::from_millis(33));
        info!("event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            let action = match event {
                Event::Key(key) => self.handle_key_event(key)?,
                Event::Resize(w, h) => {
                    debug!(w, h, "terminal resized");
                    None
                }
                Event::Tick => Some(Action::Tick),
                Event::Render => Some(Action::Render),
            };
            if let Some(action) = action {
                self.action_tx.send(action)?;
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;
                if matches!(action, Action::Render) {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        self.poller.shutdown().await;
        info!("event loop ended");
        Ok(())
    }

    // ── Input ────────────────────────────────────────────────────────

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.pending_confirm.is_some() {
            return Ok(match key.code {
                KeyCode::Char('y' | 'Y') => Some(Action::ConfirmYes),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(Action::ConfirmNo),
                _ => None,
            });
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        let typing = self
            .screens
            .get(&self.active_screen)
            .is_some_and(|s| s.captures_input());
        if !typing {
            match key.code {
                KeyCode::Char('q') => return Ok(Some(Action::Quit)),
                KeyCode::Char('?') => return Ok(Some(Action::ToggleHelp)),
                KeyCode::Char(c @ '1'..='9') => {
                    let n = u8::try_from(c).map_or(0, |b| b - b'0');
                    if let Some(screen) = ScreenId::from_number(n) {
                        return Ok(Some(Action::SwitchScreen(screen)));
                    }
                }
                KeyCode::Tab => {
                    return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
                }
                KeyCode::Esc if self.notification.is_some() => {
                    return Ok(Some(Action::DismissNotification));
                }
                _ => {}
            }
        }

        match self.screens.get_mut(&self.active_screen) {
            Some(screen) => screen.handle_key_event(key),
            None => Ok(None),
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::Render => {}
            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, shown)| shown.elapsed() >= NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
                for screen in self.screens.values_mut() {
                    screen.update(action)?;
                }
            }

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} → {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(target) {
                        screen.set_focused(true);
                    }
                }
            }
            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::SelectSegment(segment) => {
                self.poller.select_segment(segment.clone());
                self.refresh();
            }
            Action::RefreshNow => self.refresh(),

            Action::Save(tree) => self.save(tree.clone()),
            Action::Test(tree) => self.test(tree.clone()),

            Action::ShowConfirm(confirm) => self.pending_confirm = Some(*confirm),
            Action::ConfirmYes => {
                if let Some(confirm) = self.pending_confirm.take() {
                    self.execute_confirm(confirm);
                }
            }
            Action::ConfirmNo => self.pending_confirm = None,

            Action::Notify(n) => self.notification = Some((n.clone(), Instant::now())),
            Action::DismissNotification => self.notification = None,

            Action::ViewUpdated(_) | Action::PollStateChanged(_) | Action::SegmentChanged(_) => {
                self.forward(ScreenId::Status, action)?;
            }
            Action::BusyChanged(_)
            | Action::LastSavedChanged(_)
            | Action::TestFinished(_)
            | Action::ReloadDefaults => self.forward(ScreenId::Config, action)?,
        }
        Ok(())
    }

    /// Hand an action to one screen, queueing whatever it answers.
    fn forward(&mut self, target: ScreenId, action: &Action) -> Result<()> {
        if let Some(screen) = self.screens.get_mut(&target) {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    // ── Background operations ────────────────────────────────────────

    fn refresh(&self) {
        let handle = self.poller.refresh_now();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Ok(RefreshOutcome::Failed { error, retry_in }) = handle.await {
                let _ = tx.send(Action::Notify(Notification::error(format!(
                    "Refresh failed: {error} (retrying in {})",
                    humantime::format_duration(retry_in)
                ))));
            }
        });
    }

    fn save(&self, tree: ConfigTree) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let message = controller.save(&tree).await;
            let _ = tx.send(Action::Notify(message.into()));
        });
    }

    fn test(&self, tree: ConfigTree) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = controller.test(&tree).await;
            let _ = tx.send(Action::Notify(outcome.message.clone().into()));
            let _ = tx.send(Action::TestFinished(outcome));
        });
    }

    fn execute_confirm(&self, confirm: ConfirmAction) {
        match confirm {
            ConfirmAction::ResetDefaults => {
                let controller = self.controller.clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    // The dialog already asked.
                    match controller.reset_to_defaults(|_| true).await {
                        ResetOutcome::Cancelled => {}
                        ResetOutcome::Failed(message) => {
                            warn!(%message, "reset refused");
                            let _ = tx.send(Action::Notify(message.into()));
                        }
                        ResetOutcome::Reset { message, reload_in } => {
                            let _ = tx.send(Action::Notify(message.into()));
                            tokio::time::sleep(reload_in).await;
                            let _ = tx.send(Action::ReloadDefaults);
                        }
                    }
                });
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [content, tabs, status] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, content);
        }
        self.render_tab_bar(frame, tabs);
        self.render_status_bar(frame, status);

        if let Some((notification, _)) = &self.notification {
            render_notification(frame, area, notification);
        }
        if let Some(confirm) = self.pending_confirm {
            render_confirm_dialog(frame, area, confirm);
        }
        if self.help_visible {
            render_help(frame, area);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    theme::tab(id == self.active_screen),
                ))
            })
            .collect();
        let selected = ScreenId::ALL
            .iter()
            .position(|&s| s == self.active_screen)
            .unwrap_or(0);
        frame.render_widget(
            Tabs::new(titles)
                .divider(Span::styled(" ", theme::key_hint()))
                .select(selected),
            area,
        );
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let hints = self
            .screens
            .get(&self.active_screen)
            .map_or("", |s| s.hints());
        let line = Line::from(vec![
            Span::styled(" ● ", Style::default().fg(theme::GREEN)),
            Span::styled(self.server.clone(), theme::text()),
            Span::styled(format!(" │ {hints} │ ? help  q quit"), theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Rect of `width` x `height` centered in `area`, clipped to it.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_confirm_dialog(frame: &mut Frame, area: Rect, confirm: ConfirmAction) {
    let question = confirm.to_string();
    let width = u16::try_from(question.chars().count() + 6).unwrap_or(u16::MAX);
    let dialog = centered(area, width, 5);

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::YELLOW))
        .title(" Confirm ")
        .title_style(theme::title())
        .style(Style::default().bg(theme::BG_DARK));
    let text = vec![
        Line::from(Span::styled(format!(" {question}"), theme::text())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" y ", theme::key_hint_key()),
            Span::styled("confirm    ", theme::key_hint()),
            Span::styled("n ", theme::key_hint_key()),
            Span::styled("cancel", theme::key_hint()),
        ]),
    ];
    frame.render_widget(Clear, dialog);
    frame.render_widget(Paragraph::new(text).block(block), dialog);
}

/// Toast in the bottom-right corner, above the status bar.
fn render_notification(frame: &mut Frame, area: Rect, notification: &Notification) {
    let (color, icon) = match notification.level {
        NotificationLevel::Success => (theme::GREEN, "✓"),
        NotificationLevel::Error => (theme::RED, "✗"),
        NotificationLevel::Info => (theme::CYAN, "·"),
    };

    let len = u16::try_from(notification.message.chars().count()).unwrap_or(u16::MAX);
    let width = len.saturating_add(6).clamp(20, 80).min(area.width);
    let height = 3u16.min(area.height);
    let toast = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y + area.height.saturating_sub(height + 2),
        width,
        height,
    );

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme::BG_DARK));
    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(color)),
        Span::styled(notification.message.clone(), theme::text()),
    ]);
    frame.render_widget(Clear, toast);
    frame.render_widget(Paragraph::new(line).block(block), toast);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let rows: &[(&str, &str)] = &[
        ("1 / 2 / Tab", "Switch screen"),
        ("←/→", "Status: change segment"),
        ("r", "Status: refresh now"),
        ("j/k ↑/↓", "Move"),
        ("Enter / Space", "Config: edit, toggle or cycle"),
        ("s", "Config: save"),
        ("t", "Config: test"),
        ("R", "Config: restore defaults"),
        ("e / i", "Config: export / import"),
        ("Esc", "Dismiss notification"),
        ("q", "Quit"),
    ];
    let mut lines = vec![Line::from("")];
    lines.extend(rows.iter().map(|(key, what)| {
        Line::from(vec![
            Span::styled(format!("  {key:<15}"), theme::key_hint_key()),
            Span::styled(*what, theme::key_hint()),
        ])
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("  Esc or ? to close", theme::key_hint())));

    let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
    let popup = centered(area, 56, height);
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(theme::border(true))
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title())
        .style(Style::default().bg(theme::BG_DARK));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;

    fn app() -> App {
        let config = MonitorConfig::new("http://127.0.0.1:9".parse().unwrap());
        let poller = StatusPoller::from_config(&config).unwrap();
        let controller = ConfigController::from_config(&config).unwrap();
        App::new(poller, controller, &config)
    }

    fn press(app: &mut App, code: KeyCode) -> Option<Action> {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn number_keys_switch_screens() {
        let mut app = app();
        let action = press(&mut app, KeyCode::Char('2')).unwrap();
        app.process_action(&action).unwrap();
        assert_eq!(app.active_screen, ScreenId::Config);

        let action = press(&mut app, KeyCode::Tab).unwrap();
        app.process_action(&action).unwrap();
        assert_eq!(app.active_screen, ScreenId::Status);
    }

    #[test]
    fn confirm_dialog_takes_every_key() {
        let mut app = app();
        app.process_action(&Action::ShowConfirm(ConfirmAction::ResetDefaults))
            .unwrap();

        assert!(press(&mut app, KeyCode::Char('q')).is_none());
        assert!(matches!(press(&mut app, KeyCode::Esc), Some(Action::ConfirmNo)));

        app.process_action(&Action::ConfirmNo).unwrap();
        assert!(app.pending_confirm.is_none());
    }

    #[test]
    fn typing_in_a_field_is_not_a_shortcut() {
        let mut app = app();
        app.process_action(&Action::SwitchScreen(ScreenId::Config))
            .unwrap();
        // First field is a number; Enter starts editing it.
        assert!(press(&mut app, KeyCode::Enter).is_none());
        assert!(press(&mut app, KeyCode::Char('q')).is_none());
        assert!(app.running);
    }

    #[test]
    fn toasts_expire_after_five_seconds() {
        let mut app = app();
        app.process_action(&Action::Notify(Notification::success("saved")))
            .unwrap();
        app.process_action(&Action::Tick).unwrap();
        assert!(app.notification.is_some());

        let expired = Instant::now()
            .checked_sub(NOTIFICATION_TTL + Duration::from_millis(1))
            .unwrap();
        if let Some((_, shown)) = app.notification.as_mut() {
            *shown = expired;
        }
        app.process_action(&Action::Tick).unwrap();
        assert!(app.notification.is_none());
    }

    #[test]
    fn overlays_render_on_small_terminals() {
        use ratatui::Terminal;
        use ratatui::backend::TestBackend;

        let mut app = app();
        app.process_action(&Action::Notify(Notification::error("❌ Failed to save: disk full")))
            .unwrap();
        app.process_action(&Action::ShowConfirm(ConfirmAction::ResetDefaults))
            .unwrap();
        app.process_action(&Action::ToggleHelp).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(30, 8)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
    }
}
