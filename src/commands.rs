//! Slash-command parsing for the console prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Sessions,
    New,
    /// Zero-based index into the displayed session list.
    Switch(usize),
    /// Delete by displayed index, or the selected session when omitted.
    Delete(Option<usize>),
    User(String),
    Quit,
    Malformed {
        usage: &'static str,
    },
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed);

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/sessions" => SlashCommand::Sessions,
        "/new" => SlashCommand::New,
        "/switch" => match words.next().map(parse_index) {
            Some(Some(index)) => SlashCommand::Switch(index),
            _ => SlashCommand::Malformed {
                usage: "/switch <n>",
            },
        },
        "/delete" => match words.next() {
            None => SlashCommand::Delete(None),
            Some(argument) => match parse_index(argument) {
                Some(index) => SlashCommand::Delete(Some(index)),
                None => SlashCommand::Malformed {
                    usage: "/delete [n]",
                },
            },
        },
        "/user" => match words.next() {
            Some(user_id) => SlashCommand::User(user_id.to_string()),
            None => SlashCommand::Malformed { usage: "/user <id>" },
        },
        "/quit" => SlashCommand::Quit,
        unknown => SlashCommand::Unknown(unknown.to_string()),
    };

    Some(parsed)
}

/// Displayed session numbers are one-based.
fn parse_index(argument: &str) -> Option<usize> {
    argument
        .parse::<usize>()
        .ok()
        .filter(|position| *position >= 1)
        .map(|position| position - 1)
}
