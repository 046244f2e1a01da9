//! Parsing of the interactive reader commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  play (p)            start reading the current page, or resume
  pause               pause reading
  resume (r)          resume paused reading
  stop (s)            stop reading and rewind
  seek <secs>         move by seconds, e.g. `seek -10`; `+10` / `-10` also work
  next (n)            go to the next page
  prev (b)            go to the previous page
  page <n> (g)        go to page n
  open <path> (o)     open another PDF
  backend <name>      switch speech to `local` or `murf`
  text (t)            print the current page text
  status              print the reader state
  help (h, ?)         show this help
  quit (q)            exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Resume,
    Stop,
    Seek(f64),
    Next,
    Previous,
    Page(usize),
    Open(String),
    Backend(SpeechBackend),
    Text,
    Status,
    Help,
    Quit,
}

/// Where speech comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// On-device synthesizer
    Local,
    /// Murf text-to-speech API
    Murf,
}

impl fmt::Display for SpeechBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechBackend::Local => write!(f, "local"),
            SpeechBackend::Murf => write!(f, "murf"),
        }
    }
}

impl FromStr for SpeechBackend {
    type Err = CommandError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(SpeechBackend::Local),
            "murf" => Ok(SpeechBackend::Murf),
            _ => Err(CommandError::InvalidArgument {
                command: "backend",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Unknown command `{0}` (type `help` for a list)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument for `{command}`: {value}")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    // Bare `+10` / `-10` is shorthand for seek.
    if word.starts_with(['+', '-']) && rest.is_empty() {
        return parse_seconds(word).map(|s| Some(Command::Seek(s)));
    }

    let command = match word.to_lowercase().as_str() {
        "play" | "p" => Command::Play,
        "pause" => Command::Pause,
        "resume" | "r" => Command::Resume,
        "stop" | "s" => Command::Stop,
        "seek" => Command::Seek(parse_seconds(required("seek", rest)?)?),
        "next" | "n" => Command::Next,
        "prev" | "previous" | "b" => Command::Previous,
        "page" | "g" => {
            let value = required("page", rest)?;
            let page = value
                .parse::<usize>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| CommandError::InvalidArgument {
                    command: "page",
                    value: value.to_string(),
                })?;
            Command::Page(page)
        }
        "open" | "o" => Command::Open(required("open", rest)?.to_string()),
        "backend" => Command::Backend(required("backend", rest)?.parse()?),
        "text" | "t" => Command::Text,
        "status" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn required<'a>(command: &'static str, rest: &'a str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

/// Accepts `10`, `+10`, `-2.5` and an optional trailing `s`.
fn parse_seconds(value: &str) -> Result<f64, CommandError> {
    let trimmed = value.trim_end_matches('s');
    trimmed
        .trim_start_matches('+')
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .ok_or_else(|| CommandError::InvalidArgument {
            command: "seek",
            value: value.to_string(),
        })
}
