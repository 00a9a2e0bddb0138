use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::info;

use crate::app::{AppEvent, UserCommand};
use crate::event_loop::EventSender;

/// Stops the signal thread on drop.
pub struct SignalGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Turns SIGINT and SIGTERM into [`UserCommand::Quit`].
///
/// The receiver must be dropped before the guard, or a send blocked on a
/// full queue keeps the thread alive.
pub fn install_quit_handler(events: EventSender) -> io::Result<SignalGuard> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("opencode-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                info!(signal, "received termination signal");
                if events
                    .blocking_send(AppEvent::Command(UserCommand::Quit))
                    .is_err()
                {
                    break;
                }
            }
        })?;
    Ok(SignalGuard {
        handle,
        thread: Some(thread),
    })
}
