//! Forwards poller and controller watch channels into the action loop.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ipmon_core::{ConfigController, StatusPoller};

use crate::action::Action;

/// Send the current state once, then every change until `cancel` fires
/// or the action channel closes.
pub async fn run(
    poller: StatusPoller,
    controller: ConfigController,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut view = poller.subscribe_view();
    let mut state = poller.subscribe_state();
    let mut segment = poller.subscribe_segment();
    let mut busy = controller.subscribe_busy();
    let mut last_saved = controller.subscribe_last_saved();

    let initial = [
        Action::ViewUpdated(view.borrow_and_update().clone()),
        Action::PollStateChanged(*state.borrow_and_update()),
        Action::SegmentChanged(segment.borrow_and_update().clone()),
        Action::BusyChanged(busy.borrow_and_update().clone()),
        Action::LastSavedChanged(*last_saved.borrow_and_update()),
    ];
    for action in initial {
        if action_tx.send(action).is_err() {
            return;
        }
    }

    loop {
        let action = tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = view.changed() => Action::ViewUpdated(view.borrow_and_update().clone()),
            Ok(()) = state.changed() => Action::PollStateChanged(*state.borrow_and_update()),
            Ok(()) = segment.changed() => {
                Action::SegmentChanged(segment.borrow_and_update().clone())
            }
            Ok(()) = busy.changed() => Action::BusyChanged(busy.borrow_and_update().clone()),
            Ok(()) = last_saved.changed() => {
                Action::LastSavedChanged(*last_saved.borrow_and_update())
            }
            else => break,
        };
        if action_tx.send(action).is_err() {
            break;
        }
    }
    debug!("data bridge stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ipmon_core::MonitorConfig;

    use super::*;

    fn parts() -> (StatusPoller, ConfigController) {
        let config = MonitorConfig::new("http://127.0.0.1:9".parse().unwrap());
        (
            StatusPoller::from_config(&config).unwrap(),
            ConfigController::from_config(&config).unwrap(),
        )
    }

    #[tokio::test]
    async fn initial_state_is_sent_first() {
        let (poller, controller) = parts();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(poller.clone(), controller, tx, cancel.clone()));

        assert!(matches!(rx.recv().await, Some(Action::ViewUpdated(_))));
        assert!(matches!(rx.recv().await, Some(Action::PollStateChanged(_))));
        assert!(matches!(rx.recv().await, Some(Action::SegmentChanged(s)) if s == "85"));
        assert!(matches!(rx.recv().await, Some(Action::BusyChanged(b)) if b.is_empty()));
        assert!(matches!(rx.recv().await, Some(Action::LastSavedChanged(None))));

        poller.select_segment("204");
        assert!(matches!(rx.recv().await, Some(Action::SegmentChanged(s)) if s == "204"));

        cancel.cancel();
        task.await.unwrap();
    }
}
