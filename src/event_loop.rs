use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::app::{App, AppEvent, HostOps, Notice};

/// Capacity of the hand-off queue between producers and the reducer.
pub const EVENT_QUEUE_CAPACITY: usize = 1;

pub type EventSender = mpsc::Sender<AppEvent>;
pub type EventReceiver = mpsc::Receiver<AppEvent>;

/// The bounded queue every producer (event stream, background requests,
/// input, signals) feeds and the reducer drains.
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_QUEUE_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The reducer asked to stop.
    Quit,
    /// Every sender is gone.
    Disconnected,
}

/// Feeds events to the reducer one at a time, in receipt order, and hands
/// each batch of notices to `on_notice` after the event that produced it.
///
/// Blocks the calling thread, which must not be a runtime worker.
pub fn run_event_loop<H, F>(
    app: &mut App,
    host: &mut H,
    events: &mut EventReceiver,
    mut on_notice: F,
) -> ExitReason
where
    H: HostOps,
    F: FnMut(&App, Notice),
{
    loop {
        let Some(event) = events.blocking_recv() else {
            debug!("event channel closed");
            return ExitReason::Disconnected;
        };

        app.handle_event(event, host);
        for notice in app.take_notices() {
            on_notice(app, notice);
        }

        if app.should_exit {
            info!("quit requested");
            return ExitReason::Quit;
        }
    }
}
