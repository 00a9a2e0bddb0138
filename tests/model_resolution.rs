mod support;

use opencode_tui::resolver::{
    default_model_index, find_by_full_id, find_by_ids, find_provider, resolve, ModelSelection,
    ModelSignals, ProviderSnapshot, ResolutionSource,
};
use pretty_assertions::assert_eq;
use tui_state::ModelUsage;

use support::{provider, snapshot};

fn catalogue() -> ProviderSnapshot {
    snapshot(
        vec![
            provider("openai", &["gpt-4", "gpt-5"]),
            provider("anthropic", &["claude-haiku", "claude-sonnet"]),
            provider("google", &["gemini"]),
        ],
        &[("anthropic", "claude-sonnet")],
    )
}

fn ids(snapshot: &ProviderSnapshot, selection: Option<ModelSelection>) -> Option<(String, String)> {
    selection.and_then(|selection| {
        snapshot
            .get(selection)
            .map(|(provider, model)| (provider.id.clone(), model.id.clone()))
    })
}

fn pair(provider: &str, model: &str) -> Option<(String, String)> {
    Some((provider.to_string(), model.to_string()))
}

#[test]
fn each_tier_beats_every_later_tier() {
    let snapshot = catalogue();
    let recent = [ModelUsage::new("google", "gemini")];
    let all = ModelSignals {
        initial_model: Some("openai/gpt-4"),
        config_model: Some("openai/gpt-5"),
        recently_used: &recent,
        state_provider_model: Some(("anthropic", "claude-haiku")),
    };

    let selection = resolve(&snapshot, &all);
    assert_eq!(ids(&snapshot, selection), pair("openai", "gpt-4"));
    assert_eq!(selection.map(|s| s.source), Some(ResolutionSource::CommandLine));

    let no_flag = ModelSignals {
        initial_model: None,
        ..all
    };
    let selection = resolve(&snapshot, &no_flag);
    assert_eq!(ids(&snapshot, selection), pair("openai", "gpt-5"));
    assert_eq!(selection.map(|s| s.source), Some(ResolutionSource::Config));

    let no_config = ModelSignals {
        config_model: None,
        ..no_flag
    };
    let selection = resolve(&snapshot, &no_config);
    assert_eq!(ids(&snapshot, selection), pair("google", "gemini"));
    assert_eq!(selection.map(|s| s.source), Some(ResolutionSource::RecentlyUsed));

    let no_recent = ModelSignals {
        recently_used: &[],
        ..no_config
    };
    let selection = resolve(&snapshot, &no_recent);
    assert_eq!(ids(&snapshot, selection), pair("anthropic", "claude-haiku"));
    assert_eq!(selection.map(|s| s.source), Some(ResolutionSource::LegacyState));
}

#[test]
fn unmatched_override_and_config_fall_through_to_recent() {
    let snapshot = catalogue();
    let recent = [
        ModelUsage::new("openai", "gpt-5"),
        ModelUsage::new("google", "gemini"),
    ];
    let signals = ModelSignals {
        initial_model: Some("openai/missing"),
        config_model: Some("nobody/gpt-4"),
        recently_used: &recent,
        state_provider_model: Some(("google", "gemini")),
    };

    assert_eq!(ids(&snapshot, resolve(&snapshot, &signals)), pair("openai", "gpt-5"));
}

#[test]
fn stale_recent_entry_falls_through_to_legacy_state() {
    let snapshot = catalogue();
    let recent = [ModelUsage::new("retired", "model")];
    let signals = ModelSignals {
        recently_used: &recent,
        state_provider_model: Some(("google", "gemini")),
        ..ModelSignals::default()
    };

    assert_eq!(ids(&snapshot, resolve(&snapshot, &signals)), pair("google", "gemini"));
}

#[test]
fn fallback_prefers_anthropic_default() {
    let snapshot = catalogue();
    let selection = resolve(&snapshot, &ModelSignals::default());

    assert_eq!(ids(&snapshot, selection), pair("anthropic", "claude-sonnet"));
    assert_eq!(selection.map(|s| s.source), Some(ResolutionSource::Fallback));
}

#[test]
fn fallback_without_anthropic_uses_first_provider_with_models() {
    let snapshot = snapshot(
        vec![
            provider("empty", &[]),
            provider("openai", &["gpt-4", "gpt-5"]),
            provider("google", &["gemini"]),
        ],
        &[("openai", "gpt-5")],
    );

    assert_eq!(
        ids(&snapshot, resolve(&snapshot, &ModelSignals::default())),
        pair("openai", "gpt-5")
    );
}

#[test]
fn anthropic_without_models_is_skipped() {
    let snapshot = snapshot(
        vec![provider("openai", &["gpt-4"]), provider("anthropic", &[])],
        &[("anthropic", "claude")],
    );

    assert_eq!(
        ids(&snapshot, resolve(&snapshot, &ModelSignals::default())),
        pair("openai", "gpt-4")
    );
}

#[test]
fn resolution_is_total_for_any_snapshot_with_a_model() {
    let shapes: Vec<Vec<(&str, Vec<&str>)>> = vec![
        vec![("a", vec!["m"])],
        vec![("a", vec![]), ("b", vec!["m"])],
        vec![("a", vec![]), ("b", vec![]), ("c", vec!["x", "y"])],
        vec![("anthropic", vec![]), ("z", vec!["q"])],
    ];
    let recent = [ModelUsage::new("gone", "gone")];
    let signals = ModelSignals {
        initial_model: Some("gone/gone"),
        config_model: Some("malformed"),
        recently_used: &recent,
        state_provider_model: Some(("gone", "gone")),
    };

    for shape in shapes {
        let providers = shape
            .iter()
            .map(|(id, models)| provider(id, models))
            .collect();
        let snapshot = snapshot(providers, &[]);
        let selection = resolve(&snapshot, &signals).expect("a model is always found");
        assert!(snapshot.get(selection).is_some());
    }
}

#[test]
fn empty_snapshot_resolves_to_none() {
    let empty = snapshot(Vec::new(), &[]);
    assert_eq!(resolve(&empty, &ModelSignals::default()), None);

    let modelless = snapshot(vec![provider("openai", &[])], &[]);
    assert_eq!(resolve(&modelless, &ModelSignals::default()), None);
}

#[test]
fn lookup_helpers() {
    let snapshot = catalogue();
    let cases: &[(&str, Option<(usize, usize)>)] = &[
        ("openai/gpt-4", Some((0, 0))),
        ("anthropic/claude-sonnet", Some((1, 1))),
        ("openai/claude-sonnet", None),
        ("missing/gpt-4", None),
        ("openai", None),
        ("", None),
        ("openai/gpt-4/extra", None),
    ];
    for (full_id, expected) in cases {
        assert_eq!(find_by_full_id(&snapshot, full_id), *expected, "{full_id}");
    }

    assert_eq!(find_by_ids(&snapshot, "google", "gemini"), Some((2, 0)));
    assert_eq!(find_by_ids(&snapshot, "google", "gpt-4"), None);
    assert_eq!(find_provider(&snapshot, "anthropic"), Some(1));
    assert_eq!(find_provider(&snapshot, "azure"), None);
    assert_eq!(default_model_index(&snapshot, 1), Some(1));
    assert_eq!(default_model_index(&snapshot, 0), Some(0));
    assert_eq!(default_model_index(&snapshot, 9), None);
}
