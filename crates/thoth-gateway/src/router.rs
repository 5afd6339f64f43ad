//! Text command routing: `//meeting <sub> ...` into [`Command`].

use thiserror::Error;
use thoth_core::MemberId;
use thoth_meetings::Command;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("\"{0}\" is not a valid command.")]
    UnknownCommand(String),

    #[error("\"{0}\" is not recognized as a meeting command.")]
    UnknownMeetingCommand(String),

    #[error("Missing {0} for that command.")]
    MissingArgument(&'static str),
}

/// Parse one chat message sent by `author`.
///
/// Returns `None` for messages that do not start with `prefix`.
pub fn route(prefix: &str, author: &MemberId, text: &str) -> Option<Result<Command, RouteError>> {
    let body = text.trim().strip_prefix(prefix)?;
    Some(route_body(author, body))
}

fn route_body(author: &MemberId, body: &str) -> Result<Command, RouteError> {
    let (head, rest) = split_word(body);
    match head {
        "meeting" => route_meeting(author, rest),
        other => Err(RouteError::UnknownCommand(other.to_string())),
    }
}

fn route_meeting(author: &MemberId, args: &str) -> Result<Command, RouteError> {
    let (sub, rest) = split_word(args);
    match sub {
        "add" => Ok(Command::ScheduleMeeting {
            fields: dash_fields(rest),
        }),
        "cancel" => Ok(Command::CancelNextMeeting),
        "next" => Ok(Command::DescribeNextMeeting),
        "list" => Ok(Command::ListPendingMeetings),
        // A missing password is just a wrong one.
        "signin" => Ok(Command::SignIn {
            member: author.clone(),
            password: split_word(rest).0.to_string(),
        }),
        "excuse" => match split_word(rest).0 {
            "" => Err(RouteError::MissingArgument("member")),
            target => Ok(Command::ExcuseMember {
                member: MemberId::from(strip_mention(target)),
            }),
        },
        "" => Err(RouteError::MissingArgument("subcommand")),
        other => Err(RouteError::UnknownMeetingCommand(other.to_string())),
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// `- start - location - hours - password` into its fields.
///
/// Fields are separated by a dash with whitespace on both sides, so dates such
/// as `2026-03-01` survive intact.
fn dash_fields(rest: &str) -> Vec<String> {
    let rest = rest.trim();
    let Some(rest) = rest.strip_prefix('-') else {
        return if rest.is_empty() {
            Vec::new()
        } else {
            vec![rest.to_string()]
        };
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return Vec::new();
    }
    rest.split(" - ").map(|f| f.trim().to_string()).collect()
}

/// `<@123>` / `<@!123>` mentions to the bare id.
fn strip_mention(target: &str) -> &str {
    target
        .strip_prefix("<@")
        .and_then(|t| t.strip_suffix('>'))
        .map(|t| t.trim_start_matches('!'))
        .unwrap_or(target)
}
