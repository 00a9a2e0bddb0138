mod support;

use opencode_api::types::AgentMode;
use opencode_tui::app::UserCommand;
use opencode_tui::resolver::ResolutionSource;
use pretty_assertions::assert_eq;
use tui_state::{ModelUsage, PersistedState};

use support::{agent, agent_with_model, app_with, default_app, provider, snapshot, HostSpy};

fn cycle(app: &mut opencode_tui::App, host: &mut HostSpy, forward: bool) {
    app.handle_command(UserCommand::CycleAgent { forward }, host);
}

#[test]
fn cycling_skips_subagents_in_both_directions() {
    let mut app = default_app();
    let mut host = HostSpy::default();
    assert_eq!(app.agent_name(), "build");

    cycle(&mut app, &mut host, true);
    assert_eq!(app.agent_name(), "plan");
    cycle(&mut app, &mut host, true);
    assert_eq!(app.agent_name(), "build");
    cycle(&mut app, &mut host, false);
    assert_eq!(app.agent_name(), "plan");
}

#[test]
fn cycling_len_agents_times_returns_to_start() {
    let agents = vec![
        agent("build", AgentMode::Primary),
        agent("plan", AgentMode::Primary),
        agent("docs", AgentMode::All),
        agent("review", AgentMode::Primary),
    ];
    let len = agents.len();
    let mut app = app_with(
        snapshot(vec![provider("openai", &["gpt-4"])], &[]),
        agents,
        PersistedState::default(),
    );
    let mut host = HostSpy::default();

    for forward in [true, false] {
        let start = app.agent_index();
        let mut visited = Vec::new();
        for _ in 0..len {
            cycle(&mut app, &mut host, forward);
            visited.push(app.agent_index());
        }
        assert_eq!(app.agent_index(), start);
        visited.sort_unstable();
        visited.dedup();
        assert_eq!(visited.len(), len);
    }
}

#[test]
fn cycling_len_agents_times_with_evenly_spread_subagents_returns_to_start() {
    let agents = vec![
        agent("build", AgentMode::Primary),
        agent("general", AgentMode::Subagent),
        agent("plan", AgentMode::Primary),
        agent("explore", AgentMode::Subagent),
    ];
    let len = agents.len();
    let mut app = app_with(
        snapshot(vec![provider("openai", &["gpt-4"])], &[]),
        agents,
        PersistedState::default(),
    );
    let mut host = HostSpy::default();
    let start = app.agent_index();

    for _ in 0..len {
        cycle(&mut app, &mut host, true);
    }

    assert_eq!(app.agent_index(), start);
}

#[test]
fn cycling_once_per_selectable_agent_returns_to_start() {
    let agents = vec![
        agent("a", AgentMode::Primary),
        agent("b", AgentMode::Subagent),
        agent("c", AgentMode::All),
        agent("d", AgentMode::Subagent),
        agent("e", AgentMode::Primary),
    ];
    let selectable = agents.iter().filter(|agent| !agent.is_subagent()).count();
    let mut app = app_with(
        snapshot(vec![provider("openai", &["gpt-4"])], &[]),
        agents,
        PersistedState::default(),
    );
    let mut host = HostSpy::default();

    for forward in [true, false] {
        let start = app.agent_index();
        for _ in 0..selectable {
            cycle(&mut app, &mut host, forward);
            assert!(!app.current_agent().expect("agent").is_subagent());
        }
        assert_eq!(app.agent_index(), start);
    }
}

#[test]
fn all_subagents_leave_index_unchanged() {
    let mut app = app_with(
        snapshot(vec![provider("openai", &["gpt-4"])], &[]),
        vec![agent("x", AgentMode::Subagent), agent("y", AgentMode::Subagent)],
        PersistedState::default(),
    );
    let mut host = HostSpy::default();

    cycle(&mut app, &mut host, true);

    assert_eq!(app.agent_index(), 0);
    assert!(host.persisted.is_empty());
}

#[test]
fn cycling_with_no_agents_is_a_no_op() {
    let mut app = app_with(
        snapshot(vec![provider("openai", &["gpt-4"])], &[]),
        Vec::new(),
        PersistedState::default(),
    );
    let mut host = HostSpy::default();

    cycle(&mut app, &mut host, false);

    assert_eq!(app.agent_index(), 0);
    assert_eq!(host.render_requests, 0);
}

#[test]
fn agent_declared_model_replaces_selection() {
    let mut app = app_with(
        snapshot(
            vec![provider("openai", &["gpt-4", "gpt-5"]), provider("anthropic", &["claude"])],
            &[],
        ),
        vec![
            agent("build", AgentMode::Primary),
            agent_with_model("plan", "openai", "gpt-5"),
        ],
        PersistedState::default(),
    );
    let mut host = HostSpy::default();
    assert_eq!(app.selected_ids(), Some(("anthropic", "claude")));

    cycle(&mut app, &mut host, true);

    assert_eq!(app.selected_ids(), Some(("openai", "gpt-5")));
    assert_eq!(app.selection().source, ResolutionSource::Agent);
    let persisted = host.persisted.last().expect("state persisted");
    assert_eq!(persisted.agent, "plan");
}

#[test]
fn saved_agent_model_is_used_when_agent_declares_none() {
    let mut state = PersistedState::default();
    state.set_agent_model("plan", ModelUsage::new("openai", "gpt-4"));
    let mut app = app_with(
        snapshot(
            vec![provider("openai", &["gpt-4", "gpt-5"]), provider("anthropic", &["claude"])],
            &[],
        ),
        vec![agent("build", AgentMode::Primary), agent("plan", AgentMode::Primary)],
        state,
    );
    let mut host = HostSpy::default();

    cycle(&mut app, &mut host, true);

    assert_eq!(app.selected_ids(), Some(("openai", "gpt-4")));
    assert_eq!(app.state().provider, "openai");
    assert_eq!(app.state().model, "gpt-4");
}

#[test]
fn unresolvable_agent_model_keeps_previous_selection() {
    let mut app = app_with(
        snapshot(vec![provider("anthropic", &["claude"])], &[]),
        vec![
            agent("build", AgentMode::Primary),
            agent_with_model("plan", "openai", "gpt-5"),
        ],
        PersistedState::default(),
    );
    let mut host = HostSpy::default();
    let before = app.selection();

    cycle(&mut app, &mut host, true);

    assert_eq!(app.agent_name(), "plan");
    assert_eq!(app.selection(), before);
}
