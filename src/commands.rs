#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    New,
    Stock(String),
    Add(String),
    Remove(String),
    /// Empty argument lists the available sections.
    Section(String),
    Status,
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim().to_string()),
        None => (trimmed, String::new()),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/new" => SlashCommand::New,
        "/stock" => SlashCommand::Stock(argument),
        "/add" => SlashCommand::Add(argument),
        "/remove" => SlashCommand::Remove(argument),
        "/section" => SlashCommand::Section(argument),
        "/status" => SlashCommand::Status,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
