use crate::app::{Prompt, UserCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Cancel,
    Compact,
    NextAgent,
    PreviousAgent,
    NewSession,
    Init,
    Delete(Option<String>),
    Model(Option<String>),
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str =
    "Commands: /help, /cancel, /compact, /agent, /agent-, /new, /init, /delete [session], /model provider/model, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed).to_string();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/cancel" => SlashCommand::Cancel,
        "/compact" => SlashCommand::Compact,
        "/agent" => SlashCommand::NextAgent,
        "/agent-" => SlashCommand::PreviousAgent,
        "/new" => SlashCommand::NewSession,
        "/init" => SlashCommand::Init,
        "/delete" => SlashCommand::Delete(words.next().map(str::to_owned)),
        "/model" => SlashCommand::Model(words.next().map(str::to_owned)),
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}

/// What a line of input asks the reducer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Command(UserCommand),
    /// Purely local output, such as help or usage errors.
    Message(String),
}

/// Maps one line of user input to an action. Blank lines map to nothing.
pub fn input_to_action(input: &str) -> Option<InputAction> {
    let Some(command) = parse_slash_command(input) else {
        if input.trim().is_empty() {
            return None;
        }
        return Some(InputAction::Command(UserCommand::SubmitPrompt(Prompt::text(
            input,
        ))));
    };

    let action = match command {
        SlashCommand::Help => InputAction::Message(HELP_TEXT.to_string()),
        SlashCommand::Cancel => InputAction::Command(UserCommand::Cancel),
        SlashCommand::Compact => InputAction::Command(UserCommand::CompactSession),
        SlashCommand::NextAgent => InputAction::Command(UserCommand::CycleAgent { forward: true }),
        SlashCommand::PreviousAgent => {
            InputAction::Command(UserCommand::CycleAgent { forward: false })
        }
        SlashCommand::NewSession => InputAction::Command(UserCommand::NewSession),
        SlashCommand::Init => InputAction::Command(UserCommand::InitializeProject),
        SlashCommand::Delete(session_id) => {
            InputAction::Command(UserCommand::DeleteSession { session_id })
        }
        SlashCommand::Model(Some(full_id)) => match full_id.split_once('/') {
            Some((provider_id, model_id)) => InputAction::Command(UserCommand::SelectModel {
                provider_id: provider_id.to_string(),
                model_id: model_id.to_string(),
            }),
            None => InputAction::Message(format!("expected provider/model, got {full_id}")),
        },
        SlashCommand::Model(None) => {
            InputAction::Message("usage: /model provider/model".to_string())
        }
        SlashCommand::Quit => InputAction::Command(UserCommand::Quit),
        SlashCommand::Unknown(command) => {
            InputAction::Message(format!("unknown command {command}. {HELP_TEXT}"))
        }
    };
    Some(action)
}
