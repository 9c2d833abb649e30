//! Interactive chat loop
//!
//! Plain lines are sent as turns. Slash commands drive the rest of the
//! session: `/interpret`, `/reset`, `/network`, `/mermaid`,
//! `/select <id>`, `/quit`.

use anyhow::Result;
use cbn_core::{Orchestrator, TurnOutcome};
use cbn_model::{ConversationEntry, EntryKind, Sender};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Free text for the agent
    Message(String),
    /// Ask for an interpretation
    Interpret,
    /// Re-layout the view
    Reset,
    /// Print the network as JSON
    Network,
    /// Print the network as Mermaid
    Mermaid,
    /// Click a node or edge by id
    Select(String),
    /// Leave the session
    Quit,
    /// Unrecognised slash command
    Unknown(String),
    /// Blank line
    Empty,
}

impl ReplCommand {
    /// Parse one input line
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match (name, arg) {
            ("interpret", _) => Self::Interpret,
            ("reset", _) => Self::Reset,
            ("network", _) => Self::Network,
            ("mermaid", _) => Self::Mermaid,
            ("quit" | "exit", _) => Self::Quit,
            ("select", id) if !id.is_empty() => Self::Select(id.to_string()),
            _ => Self::Unknown(line.to_string()),
        }
    }
}

fn print_entry(out: &mut impl Write, entry: &ConversationEntry) -> std::io::Result<()> {
    let tag = match (entry.sender, entry.kind) {
        (Sender::User, _) => return Ok(()),
        (Sender::Bot, Some(EntryKind::Suggestion)) => "suggestion",
        (Sender::Bot, Some(EntryKind::Analysis)) => "analysis",
        (Sender::Bot, Some(EntryKind::Question)) => "question",
        (Sender::Bot, Some(EntryKind::Error)) => "error",
        (Sender::Bot, None) => "bot",
    };
    writeln!(out, "[{tag}] {}", entry.text)
}

/// Print entries appended since `printed`, returning the new count
async fn flush_new(
    orchestrator: &Orchestrator,
    out: &mut impl Write,
    printed: usize,
) -> Result<usize> {
    let conversation = orchestrator.conversation().await;
    for entry in conversation.iter().skip(printed) {
        print_entry(out, entry)?;
    }
    Ok(conversation.len())
}

/// Run the chat loop until `/quit` or end of input
///
/// # Errors
///
/// Fails on input or output errors. Turn failures are narrated instead.
pub async fn run_chat<R, W>(orchestrator: &Orchestrator, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut printed = flush_new(orchestrator, out, 0).await?;
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let command = ReplCommand::parse(&line);
        debug!(?command, "repl input");

        match command {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Message(text) => {
                if let TurnOutcome::Superseded { turn } = orchestrator.submit(&text).await {
                    writeln!(out, "(turn {turn} superseded)")?;
                }
            }
            ReplCommand::Interpret => {
                orchestrator.interpret().await;
            }
            ReplCommand::Reset => match orchestrator.reset_view().await {
                Some(viewport) => writeln!(
                    out,
                    "view reset: {:.0}x{:.0} around ({:.1}, {:.1})",
                    viewport.width, viewport.height, viewport.center.x, viewport.center.y
                )?,
                None => writeln!(out, "view reset: nothing to show")?,
            },
            ReplCommand::Network => {
                writeln!(out, "{}", orchestrator.network().await.to_json_pretty()?)?;
            }
            ReplCommand::Mermaid => {
                write!(out, "{}", orchestrator.network().await.to_mermaid())?;
            }
            ReplCommand::Select(id) => {
                let clicked = orchestrator.click_node(&id).await.is_ok()
                    || orchestrator.click_edge(&id).await.is_ok();
                if clicked {
                    orchestrator.process_view_events().await;
                } else {
                    writeln!(out, "no node or edge with id {id}")?;
                }
            }
            ReplCommand::Unknown(line) => {
                writeln!(out, "unknown command: {line}")?;
            }
        }

        printed = flush_new(orchestrator, out, printed).await?;
        out.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(
            ReplCommand::parse(" add rainfall "),
            ReplCommand::Message("add rainfall".to_string())
        );
        assert_eq!(ReplCommand::parse("/interpret"), ReplCommand::Interpret);
        assert_eq!(
            ReplCommand::parse("/select  water_quality"),
            ReplCommand::Select("water_quality".to_string())
        );
        assert_eq!(
            ReplCommand::parse("/select"),
            ReplCommand::Unknown("/select".to_string())
        );
        assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
    }

    #[test]
    fn user_entries_are_not_echoed() {
        let mut out = Vec::new();
        print_entry(&mut out, &ConversationEntry::user("hi")).unwrap();
        print_entry(
            &mut out,
            &ConversationEntry::bot("Why?").with_kind(EntryKind::Question),
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[question] Why?\n");
    }
}
