//! Terminal input plus tick and render pacing, read on a background task.

use std::time::Duration;

use crossterm::event::{Event as TermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Slow clock for animations and toast expiry.
    Tick,
    /// Frame clock.
    Render,
}

/// Owns the reader task; dropping it stops the task.
pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    pub fn new(tick_rate: Duration, render_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(read_loop(tx, cancel.clone(), tick_rate, render_rate));
        Self { rx, cancel }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_loop(
    tx: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    tick_rate: Duration,
    render_rate: Duration,
) {
    let mut stream = EventStream::new();
    let mut tick = tokio::time::interval(tick_rate);
    let mut render = tokio::time::interval(render_rate);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            _ = tick.tick() => Event::Tick,
            _ = render.tick() => Event::Render,
            Some(Ok(term)) = stream.next() => match term {
                // Release and repeat events would double every keystroke
                TermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
                TermEvent::Resize(w, h) => Event::Resize(w, h),
                _ => continue,
            },
        };

        if tx.send(event).is_err() {
            break;
        }
    }
}
