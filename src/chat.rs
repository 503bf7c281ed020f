// Line-mode chat: the same session as the terminal UI, driven from stdin.
// Useful when stdout is not a terminal or for scripting.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::constants::THINKING_INDICATOR;
use crate::conversation::Message;
use crate::orchestrator::Orchestrator;
use crate::preferences::{PreferenceChange, PreferenceError, PreferenceField};
use crate::transport::ChatTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Send(String),
    Set(PreferenceChange),
    Show,
    Help,
    Quit,
    Nothing,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: /set <field> <value>")]
    SetUsage,
    #[error("Usage: /clear <field>")]
    ClearUsage,
    #[error("Unknown command '{0}'. Type /help for a list of commands.")]
    Unknown(String),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
}

/// Interpret one input line. Lines starting with `/` are commands; anything
/// else is a message (blank lines do nothing).
pub fn parse_line(line: &str) -> Result<LineCommand, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LineCommand::Nothing);
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Ok(LineCommand::Send(trimmed.to_string()));
    };

    let (name, rest) = split_word(command);
    match name {
        "set" => {
            let (field, value) = split_word(rest);
            if field.is_empty() || value.is_empty() {
                return Err(CommandError::SetUsage);
            }
            let field: PreferenceField = field.parse()?;
            Ok(LineCommand::Set(PreferenceChange::parse(field, value)?))
        }
        "clear" => {
            let (field, _) = split_word(rest);
            if field.is_empty() {
                return Err(CommandError::ClearUsage);
            }
            let field: PreferenceField = field.parse()?;
            Ok(LineCommand::Set(PreferenceChange::clear(field)))
        }
        "prefs" | "preferences" => Ok(LineCommand::Show),
        "help" => Ok(LineCommand::Help),
        "quit" | "exit" => Ok(LineCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// First word and the trimmed remainder; values like "No Frills" keep their inner spaces.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], input[end..].trim()),
        None => (input, ""),
    }
}

fn print_message<W: Write>(out: &mut W, message: &Message) -> std::io::Result<()> {
    writeln!(out, "[{}] {}: {}", message.time_label(), message.role(), message.content())
}

fn print_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  /set <field> <value>   set a preference (country, diet, budget, prep_time, store)")?;
    writeln!(out, "  /clear <field>         clear a preference")?;
    writeln!(out, "  /prefs                 show current preferences")?;
    writeln!(out, "  /quit                  leave the chat")?;
    writeln!(out, "Anything else is sent to the assistant.")
}

/// Run the chat until `/quit` or end of input.
pub async fn run_line_chat<T, R, W>(orchestrator: &mut Orchestrator<T>, input: R, mut out: W) -> Result<()>
where
    T: ChatTransport,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!(session = %orchestrator.session().id(), "Starting line chat");
    for message in orchestrator.session().conversation() {
        print_message(&mut out, message)?;
    }

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(LineCommand::Send(text)) => {
                writeln!(out, "{}", THINKING_INDICATOR)?;
                out.flush()?;
                if orchestrator.submit(&text).await {
                    if let Some(reply) = orchestrator.session().conversation().last() {
                        print_message(&mut out, reply)?;
                    }
                }
            }
            Ok(LineCommand::Set(change)) => {
                orchestrator.update_preference(change);
                let field = change.field();
                writeln!(
                    out,
                    "{}: {}",
                    field.label(),
                    orchestrator.session().preferences().display_value(field)
                )?;
            }
            Ok(LineCommand::Show) => {
                let prefs = orchestrator.session().preferences();
                for field in PreferenceField::ALL {
                    writeln!(out, "{}: {}", field.label(), prefs.display_value(field))?;
                }
            }
            Ok(LineCommand::Help) => print_help(&mut out)?,
            Ok(LineCommand::Quit) => break,
            Ok(LineCommand::Nothing) => {}
            Err(e) => writeln!(out, "{}", e)?,
        }
        out.flush()?;
    }

    info!("Line chat finished.");
    Ok(())
}
