mod support;

use std::thread;

use opencode_api::events::ServerEvent;
use opencode_tui::app::{AppEvent, Notice, UserCommand};
use opencode_tui::event_loop::{event_queue, run_event_loop, ExitReason};
use pretty_assertions::assert_eq;

use support::{assistant, default_app, session, HostSpy};

#[test]
fn loop_applies_events_in_order_until_quit() {
    let mut app = default_app();
    let mut host = HostSpy::default();
    let (tx, mut rx) = event_queue();

    let producer = thread::spawn(move || {
        let events = [
            AppEvent::Command(UserCommand::SessionLoaded {
                session: session("ses_1"),
                messages: Vec::new(),
            }),
            AppEvent::Server(ServerEvent::MessageUpdated {
                info: assistant("msg_1", "ses_1", None),
            }),
            AppEvent::StreamFailed("closed".to_string()),
            AppEvent::Command(UserCommand::Quit),
            AppEvent::Server(ServerEvent::MessageUpdated {
                info: assistant("msg_2", "ses_1", None),
            }),
        ];
        for event in events {
            if tx.blocking_send(event).is_err() {
                break;
            }
        }
    });

    let mut notices = Vec::new();
    let reason = run_event_loop(&mut app, &mut host, &mut rx, |_, notice| notices.push(notice));
    drop(rx);
    producer.join().expect("producer thread");

    assert_eq!(reason, ExitReason::Quit);
    assert_eq!(app.messages().len(), 1);
    assert_eq!(notices, vec![Notice::StreamClosed("closed".to_string())]);
    assert_eq!(host.stop_requests, 1);
}

#[test]
fn loop_ends_when_all_senders_are_gone() {
    let mut app = default_app();
    let mut host = HostSpy::default();
    let (tx, mut rx) = event_queue();
    drop(tx);

    let reason = run_event_loop(&mut app, &mut host, &mut rx, |_, _| {});

    assert_eq!(reason, ExitReason::Disconnected);
}
