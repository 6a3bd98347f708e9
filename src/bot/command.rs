use crate::config::ScanSettings;
use crate::scanner::source::normalize_reference;

pub const USAGE: &str = "🤔 **Usage:**\n\
`/top @channel_username [count]`\n\n\
**Examples:**\n\
`/top @durov` (scan the latest messages)\n\
`/top @durov 200` (scan the latest 200 messages)\n\n\
Send /cancel to stop a running scan.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopRequest {
    /// Reference as the user typed it.
    pub reference: String,
    pub limit: usize,
    /// The requested limit was lowered to the configured maximum.
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Top(TopRequest),
    Cancel,
    Help,
    /// `/top` with a missing or malformed reference.
    BadTop,
}

/// Parse a chat message. Returns `None` for anything that is not a known command.
pub fn parse(text: &str, settings: &ScanSettings) -> Option<Command> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    let name = head.strip_prefix('/')?;
    // `/top@mybot` addresses a specific bot in groups.
    let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();

    match name.as_str() {
        "top" => Some(parse_top(parts.next(), parts.next(), settings)),
        "cancel" => Some(Command::Cancel),
        "start" | "help" => Some(Command::Help),
        _ => None,
    }
}

fn parse_top(reference: Option<&str>, limit: Option<&str>, settings: &ScanSettings) -> Command {
    let Some(reference) = reference.filter(|r| is_reference(r)) else {
        return Command::BadTop;
    };

    let requested = limit
        .and_then(|l| l.parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(settings.default_limit);
    let clamped = requested > settings.max_limit;

    Command::Top(TopRequest {
        reference: reference.to_string(),
        limit: requested.min(settings.max_limit),
        clamped,
    })
}

fn is_reference(r: &str) -> bool {
    let explicit = r.starts_with('@') || r.contains("t.me/") || r.contains("telegram.me/");
    let name = normalize_reference(r);
    explicit
        && !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
