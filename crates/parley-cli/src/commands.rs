use parley_types::{ChatConfigUpdate, ContextPolicyUpdate};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  <text>                  send a message
  /new [title]            start a new session
  /list                   list sessions
  /switch <n|id>          switch to a session
  /delete [n|id]          delete a session (default: current)
  /rename <title>         rename the current session
  /history                show the current session
  /regen                  regenerate the last reply
  /edit <n> <text>        replace message n
  /rm <n>                 delete message n
  /clear                  clear the current session
  /stats                  show context budget usage
  /set <key> <value>      change a setting (model, temperature, max_tokens,
                          system, max_messages, max_context_tokens,
                          summary_threshold, summary, summary_length)
  /help                   show this help
  /quit                   exit

Ctrl-C stops a reply that is still streaming.";

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Reference to a session or message: a 1-based list position or an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Id(String),
}

impl Target {
    fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => Target::Index(n),
            _ => Target::Id(raw.to_string()),
        }
    }

    /// Resolve against a list of ids
    pub fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<String> {
        let mut ids = ids.into_iter();
        match self {
            Target::Index(n) => ids.nth(n - 1).map(str::to_string),
            Target::Id(id) => ids.find(|candidate| candidate == id).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Chat(ChatConfigUpdate),
    Context(ContextPolicyUpdate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(String),
    New(Option<String>),
    List,
    Switch(Target),
    Delete(Option<Target>),
    Rename(String),
    History,
    Regenerate,
    Edit { index: usize, content: String },
    Remove(usize),
    Clear,
    Stats,
    Set(Setting),
    Help,
    Quit,
    Nothing,
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Command::Nothing);
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Send(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "new" => Command::New(non_empty(args)),
        "list" | "ls" => Command::List,
        "switch" | "sw" => match non_empty(args) {
            Some(target) => Command::Switch(Target::parse(&target)),
            None => return Err(CommandError::Usage("/switch <n|id>")),
        },
        "delete" | "del" => Command::Delete(non_empty(args).map(|t| Target::parse(&t))),
        "rename" => match non_empty(args) {
            Some(title) => Command::Rename(title),
            None => return Err(CommandError::Usage("/rename <title>")),
        },
        "history" | "h" => Command::History,
        "regen" | "regenerate" => Command::Regenerate,
        "edit" => {
            let (index, content) = args
                .split_once(char::is_whitespace)
                .ok_or(CommandError::Usage("/edit <n> <text>"))?;
            Command::Edit {
                index: parse_index(index).ok_or(CommandError::Usage("/edit <n> <text>"))?,
                content: content.trim().to_string(),
            }
        }
        "rm" => Command::Remove(parse_index(args).ok_or(CommandError::Usage("/rm <n>"))?),
        "clear" => Command::Clear,
        "stats" => Command::Stats,
        "set" => {
            let (key, value) = args
                .split_once(char::is_whitespace)
                .ok_or(CommandError::Usage("/set <key> <value>"))?;
            Command::Set(parse_setting(key, value.trim())?)
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(command)
}

fn non_empty(args: &str) -> Option<String> {
    (!args.is_empty()).then(|| args.to_string())
}

fn parse_index(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn parse_setting(key: &str, value: &str) -> Result<Setting, CommandError> {
    let invalid = || CommandError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let number = || value.parse::<usize>().map_err(|_| invalid());

    let setting = match key {
        "model" => Setting::Chat(ChatConfigUpdate {
            model: Some(value.to_string()),
            ..Default::default()
        }),
        "temperature" | "temp" => Setting::Chat(ChatConfigUpdate {
            temperature: Some(value.parse().map_err(|_| invalid())?),
            ..Default::default()
        }),
        "max_tokens" => Setting::Chat(ChatConfigUpdate {
            max_tokens: Some(value.parse().map_err(|_| invalid())?),
            ..Default::default()
        }),
        "system" => Setting::Chat(ChatConfigUpdate {
            system_message: Some(value.to_string()),
            ..Default::default()
        }),
        "max_messages" => Setting::Context(ContextPolicyUpdate {
            max_messages: Some(number()?),
            ..Default::default()
        }),
        "max_context_tokens" => Setting::Context(ContextPolicyUpdate {
            max_tokens: Some(number()?),
            ..Default::default()
        }),
        "summary_threshold" => Setting::Context(ContextPolicyUpdate {
            summary_threshold: Some(number()?),
            ..Default::default()
        }),
        "summary" => Setting::Context(ContextPolicyUpdate {
            enable_summary: Some(match value {
                "on" | "true" | "yes" => true,
                "off" | "false" | "no" => false,
                _ => return Err(invalid()),
            }),
            ..Default::default()
        }),
        "summary_length" => Setting::Context(ContextPolicyUpdate {
            summary_length: Some(number()?),
            ..Default::default()
        }),
        _ => return Err(invalid()),
    };

    Ok(setting)
}
