//! Command parsing
//!
//! Parses palette input into [`PaletteCommand`]s. A leading `/` or `:` is
//! accepted and ignored (e.g. `/quit`, `:help`).

use crate::error::{CommandError, CommandResult};

/// Commands that can be run from the command palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteCommand {
    /// Open the connection dialog, or connect directly to a URL
    Connect(Option<String>),
    Disconnect,
    /// Reload the tree node under the cursor (or the whole tree)
    Refresh,
    /// Open the filter dialog, or apply filter text directly
    Filter(Option<String>),
    ClearFilter,
    /// Open the search dialog, or search directly
    Search(Option<String>),
    Favorites,
    /// Save the editor content as a favorite
    Save(String),
    /// Recall the most recent history entry into the editor
    History,
    NewTab,
    CloseTab,
    Discover,
    /// Clear the query editor
    Clear,
    Help,
    Quit,
}

/// Names offered as completions, in display order
pub const COMMAND_NAMES: [&str; 15] = [
    "connect",
    "disconnect",
    "refresh",
    "filter",
    "clearfilter",
    "search",
    "favorites",
    "save",
    "history",
    "newtab",
    "closetab",
    "discover",
    "clear",
    "help",
    "quit",
];

/// Command names starting with `prefix`
pub fn completions(prefix: &str) -> Vec<&'static str> {
    let prefix = strip_prefix(prefix.trim_start());
    COMMAND_NAMES
        .iter()
        .copied()
        .filter(|name| name.starts_with(prefix))
        .collect()
}

fn strip_prefix(input: &str) -> &str {
    input
        .strip_prefix('/')
        .or_else(|| input.strip_prefix(':'))
        .unwrap_or(input)
}

/// Parse a command string into a [`PaletteCommand`]
pub fn parse_command(input: &str) -> CommandResult<PaletteCommand> {
    let input = strip_prefix(input.trim());
    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "" => Err(CommandError::Unknown(String::new())),
        "connect" | "c" => Ok(PaletteCommand::Connect(arg)),
        "disconnect" | "dc" => Ok(PaletteCommand::Disconnect),
        "refresh" | "r" => Ok(PaletteCommand::Refresh),
        "filter" | "f" => Ok(PaletteCommand::Filter(arg)),
        "clearfilter" | "cf" => Ok(PaletteCommand::ClearFilter),
        "search" | "s" => Ok(PaletteCommand::Search(arg)),
        "favorites" | "fav" => Ok(PaletteCommand::Favorites),
        "save" => arg
            .map(PaletteCommand::Save)
            .ok_or_else(|| CommandError::MissingArgument("save <name>".to_string())),
        "history" | "hist" => Ok(PaletteCommand::History),
        "newtab" | "nt" => Ok(PaletteCommand::NewTab),
        "closetab" | "ct" => Ok(PaletteCommand::CloseTab),
        "discover" => Ok(PaletteCommand::Discover),
        "clear" | "cl" => Ok(PaletteCommand::Clear),
        "help" | "h" | "?" => Ok(PaletteCommand::Help),
        "quit" | "q" | "exit" => Ok(PaletteCommand::Quit),
        unknown => Err(CommandError::Unknown(unknown.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh() {
        assert_eq!(parse_command("/refresh").unwrap(), PaletteCommand::Refresh);
        assert_eq!(parse_command("/r").unwrap(), PaletteCommand::Refresh);
    }

    #[test]
    fn test_parse_clear() {
        assert_eq!(parse_command("/clear").unwrap(), PaletteCommand::Clear);
        assert_eq!(parse_command("/cl").unwrap(), PaletteCommand::Clear);
    }

    #[test]
    fn test_parse_quit_variants() {
        assert_eq!(parse_command("/quit").unwrap(), PaletteCommand::Quit);
        assert_eq!(parse_command("/q").unwrap(), PaletteCommand::Quit);
        assert_eq!(parse_command("/exit").unwrap(), PaletteCommand::Quit);
    }

    #[test]
    fn test_parse_help() {
        assert_eq!(parse_command("/help").unwrap(), PaletteCommand::Help);
        assert_eq!(parse_command("/?").unwrap(), PaletteCommand::Help);
    }

    #[test]
    fn test_parse_connect_with_and_without_url() {
        assert_eq!(parse_command("connect").unwrap(), PaletteCommand::Connect(None));
        assert_eq!(
            parse_command("connect postgres://u@h/db").unwrap(),
            PaletteCommand::Connect(Some("postgres://u@h/db".to_string()))
        );
    }

    #[test]
    fn test_filter_argument_keeps_spaces() {
        assert_eq!(
            parse_command("filter age > 30 and name = 'x y'").unwrap(),
            PaletteCommand::Filter(Some("age > 30 and name = 'x y'".to_string()))
        );
        assert_eq!(parse_command("f").unwrap(), PaletteCommand::Filter(None));
    }

    #[test]
    fn test_save_requires_name() {
        assert!(matches!(
            parse_command("save"),
            Err(CommandError::MissingArgument(_))
        ));
        assert_eq!(
            parse_command("save active users").unwrap(),
            PaletteCommand::Save("active users".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        let result = parse_command("/foobar");
        assert!(matches!(result, Err(CommandError::Unknown(_))));
        assert!(matches!(parse_command("  "), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_parse_without_prefix() {
        assert_eq!(parse_command("quit").unwrap(), PaletteCommand::Quit);
        assert_eq!(parse_command(":newtab").unwrap(), PaletteCommand::NewTab);
    }

    #[test]
    fn test_completions() {
        assert_eq!(completions("c"), vec!["connect", "clearfilter", "closetab", "clear"]);
        assert_eq!(completions("/sa"), vec!["save"]);
        assert_eq!(completions("").len(), COMMAND_NAMES.len());
        assert!(completions("zz").is_empty());
    }
}
