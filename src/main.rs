use std::io::{self, BufRead, IsTerminal, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use opencode_api::{ApiConfig, OpencodeClient};
use opencode_tui::app::{
    App, AppEvent, HostOps, Notice, Operation, Prompt, ToastLevel, UserCommand,
};
use opencode_tui::bootstrap::{build_app, fetch_inputs, BootstrapOptions};
use opencode_tui::commands::{input_to_action, InputAction};
use opencode_tui::config::{merge_piped_prompt, CliArgs, EnvConfig};
use opencode_tui::event_loop::{event_queue, run_event_loop, EventSender};
use opencode_tui::host::{RemoteEventSource, RemoteHost};
use opencode_tui::supervisor::StreamSupervisor;
use opencode_tui::logging;
use tracing::{info, warn};
use tui_state::StateStore;

const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let env = EnvConfig::from_env();

    let log_path = env.resolved_log_file();
    if let Err(error) = logging::init(&log_path) {
        eprintln!("warning: logging disabled ({}): {error}", log_path.display());
    }

    let interactive = io::stdin().is_terminal();
    let mut initial_prompt = args.prompt.clone();
    if !interactive {
        let mut piped = String::new();
        io::stdin()
            .read_to_string(&mut piped)
            .context("failed to read piped input")?;
        initial_prompt = merge_piped_prompt(initial_prompt, &piped);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("opencode-io")
        .build()
        .context("failed to start async runtime")?;

    let mut api_config = ApiConfig::new(env.server_url.clone());
    if let Ok(cwd) = std::env::current_dir() {
        api_config = api_config.with_directory(cwd.display().to_string());
    }
    if let Some(timeout) = env.request_timeout {
        api_config = api_config.with_timeout(timeout);
    }
    let client = OpencodeClient::new(api_config).context("invalid server configuration")?;
    info!(server = %client.base_url(), "starting");

    let store = StateStore::in_dir(&env.resolved_state_dir());
    let state = store.load_or_default();

    let inputs = runtime
        .block_on(fetch_inputs(&client))
        .with_context(|| format!("failed to reach opencode server at {}", client.base_url()))?;
    let options = BootstrapOptions {
        initial_model: args.model.clone(),
        initial_agent: args.agent.clone(),
        theme_override: env.theme.clone(),
    };
    let mut app = build_app(inputs, state, &options)?;

    let (events_tx, mut events_rx) = event_queue();
    let mut host = RemoteHost::new(
        client.clone(),
        runtime.handle().clone(),
        events_tx.clone(),
        store,
    );

    if let Some(session_id) = &args.session {
        match host.fetch_session(session_id) {
            Ok((session, messages)) => app.handle_command(
                UserCommand::SessionLoaded { session, messages },
                &mut host,
            ),
            Err(error) => app.handle_event(
                AppEvent::RequestFailed {
                    operation: Operation::LoadSession,
                    message: error.to_string(),
                },
                &mut host,
            ),
        }
    }

    let source = Arc::new(RemoteEventSource::new(client, runtime.handle().clone()));
    let supervisor = StreamSupervisor::spawn(source, events_tx.clone())
        .context("failed to start event stream thread")?;
    #[cfg(unix)]
    let signal_guard = opencode_tui::signals::install_quit_handler(events_tx.clone())
        .context("failed to install signal handlers")?;
    if interactive {
        spawn_input_reader(events_tx).context("failed to start input thread")?;
    } else {
        info!("stdin is piped; reading no commands");
        drop(events_tx);
    }

    print_status(&app, interactive);
    if let Some(prompt) = initial_prompt {
        app.handle_command(
            UserCommand::SubmitPrompt(Prompt::text(prompt)),
            &mut host,
        );
    }
    for notice in app.take_notices() {
        print_notice(&notice);
    }

    let reason = run_event_loop(&mut app, &mut host, &mut events_rx, |_, notice| {
        print_notice(&notice)
    });
    info!(?reason, renders = host.render_requests(), "event loop exited");
    if !host.stop_requested() {
        host.persist_state(app.state());
    }

    drop(events_rx);
    supervisor.shutdown();
    #[cfg(unix)]
    drop(signal_guard);
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    Ok(())
}

/// Reads lines from stdin until EOF, which quits. The thread is detached;
/// it ends with the process or on its next send after the reducer is gone.
fn spawn_input_reader(events: EventSender) -> io::Result<()> {
    thread::Builder::new()
        .name("opencode-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        warn!(%error, "failed to read input");
                        break;
                    }
                };
                match input_to_action(&line) {
                    Some(InputAction::Command(command)) => {
                        if events.blocking_send(AppEvent::Command(command)).is_err() {
                            return;
                        }
                    }
                    Some(InputAction::Message(message)) => eprintln!("{message}"),
                    None => {}
                }
            }
            let _ = events.blocking_send(AppEvent::Command(UserCommand::Quit));
        })?;
    Ok(())
}

fn print_status(app: &App, interactive: bool) {
    let model = app
        .selected_ids()
        .map(|(provider, model)| format!("{provider}/{model}"))
        .unwrap_or_else(|| "none".to_string());
    let session = app
        .session()
        .map(|session| session.id.as_str())
        .unwrap_or("new");
    let hint = if interactive {
        "/help for commands"
    } else {
        "ctrl+c to quit"
    };
    eprintln!(
        "agent {} | model {model} | session {session} | {hint}",
        app.agent_name()
    );
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::SessionCreated(session) => eprintln!("session {} created", session.id),
        Notice::Toast {
            level: ToastLevel::Info,
            message,
        } => eprintln!("{message}"),
        Notice::Toast {
            level: ToastLevel::Error,
            message,
        } => eprintln!("error: {message}"),
        Notice::StreamClosed(message) => eprintln!("event stream closed: {message}"),
    }
}
