//! Startup helpers and the interactive terminal front end.
//!
//! The terminal loop is the composition root: it owns the
//! [`ChatController`] and drives it with one command per input line.

use std::collections::HashMap;
use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::core::config::ChatConfig;
use crate::chat::core::conversation::Conversation;
use crate::chat::core::ids::ConversationId;
use crate::chat::engine::ChatController;
use crate::chat::storage::open_blob_store;
use crate::chat::view::{ChatSnapshot, group_by_recency};

/// Initialize tracing on stderr, honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the terminal chat until `/quit` or end of input.
///
/// # Returns
/// `ExitCode::SUCCESS` on a clean exit, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting chatbot v{}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(run_session()) {
        tracing::error!("Chat session failed: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn run_session() -> anyhow::Result<()> {
    let config = ChatConfig::from_env().context("invalid CHATBOT_* configuration")?;
    let blob = open_blob_store(&config.storage).context("failed to open storage")?;
    let controller = ChatController::from_config(&config, blob)?;

    write_out(|out| writeln!(out, "{HELP}"))?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle(&controller, Command::parse(&line)).await? {
            break;
        }
    }

    controller.shutdown().await;
    Ok(())
}

const HELP: &str = "Commands: /new, /list, /select <n|id>, /delete <n|id>, /show, /help, /quit. \
Anything else is sent as a message.";

/// One line of terminal input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a new conversation.
    New,
    /// List conversations grouped by recency.
    List,
    /// Select by list position (1-based) or id.
    Select(String),
    /// Delete by list position (1-based) or id.
    Delete(String),
    /// Print the current conversation.
    Show,
    /// Print the command summary.
    Help,
    /// Leave the loop.
    Quit,
    /// Send a message.
    Send(String),
}

impl Command {
    /// Interpret an input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(head, rest)| (head, rest.trim()));
        match head {
            "/new" => Self::New,
            "/list" => Self::List,
            "/select" => Self::Select(rest.to_string()),
            "/delete" => Self::Delete(rest.to_string()),
            "/show" => Self::Show,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Send(line.to_string()),
        }
    }
}

/// Execute one command. Returns `false` when the loop should stop.
async fn handle(controller: &ChatController, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::New => {
            let id = controller.create().await;
            write_out(|out| writeln!(out, "Started conversation {id}"))?;
        }
        Command::List => {
            let snapshot = controller.snapshot().await;
            write_out(|out| render_list(out, &snapshot, Utc::now()))?;
        }
        Command::Select(target) => {
            let snapshot = controller.snapshot().await;
            match resolve_target(&snapshot.conversations, &target) {
                Some(id) => {
                    controller.select(id).await;
                    let selected = controller.snapshot().await;
                    write_out(|out| render_thread(out, selected.current_conversation.as_ref()))?;
                }
                None => write_out(|out| writeln!(out, "No conversation matches {target:?}"))?,
            }
        }
        Command::Delete(target) => {
            let snapshot = controller.snapshot().await;
            let deleted = match resolve_target(&snapshot.conversations, &target) {
                Some(id) => controller.delete(id).await,
                None => false,
            };
            write_out(|out| {
                if deleted {
                    writeln!(out, "Deleted.")
                } else {
                    writeln!(out, "No conversation matches {target:?}")
                }
            })?;
        }
        Command::Show => {
            let snapshot = controller.snapshot().await;
            write_out(|out| render_thread(out, snapshot.current_conversation.as_ref()))?;
        }
        Command::Help => write_out(|out| writeln!(out, "{HELP}"))?,
        Command::Quit => return Ok(false),
        Command::Send(text) => {
            if controller.send(&text).await.is_some() {
                write_out(|out| writeln!(out, "assistant is typing..."))?;
                controller.flush().await;
                let snapshot = controller.snapshot().await;
                write_out(|out| render_reply(out, &snapshot))?;
            }
        }
    }
    Ok(true)
}

fn write_out<F>(render: F) -> std::io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let mut out = std::io::stdout().lock();
    render(&mut out)?;
    out.flush()
}

/// Resolve a 1-based list position or a conversation id.
fn resolve_target(conversations: &[Conversation], target: &str) -> Option<ConversationId> {
    if let Ok(position) = target.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| conversations.get(index))
            .map(|c| c.id);
    }
    let id = target.parse::<ConversationId>().ok()?;
    conversations.iter().any(|c| c.id == id).then_some(id)
}

fn render_list(
    out: &mut dyn Write,
    snapshot: &ChatSnapshot,
    now: DateTime<Utc>,
) -> std::io::Result<()> {
    if snapshot.conversations.is_empty() {
        return writeln!(out, "No conversations yet.");
    }
    let positions: HashMap<ConversationId, usize> = snapshot
        .conversations
        .iter()
        .enumerate()
        .map(|(index, c)| (c.id, index + 1))
        .collect();
    let current = snapshot.current_conversation.as_ref().map(|c| c.id);

    for (group, rows) in group_by_recency(&snapshot.conversations, now) {
        writeln!(out, "{group}")?;
        for row in rows {
            let marker = if Some(row.id) == current { '*' } else { ' ' };
            let position = positions.get(&row.id).copied().unwrap_or_default();
            writeln!(
                out,
                "{marker} [{position}] {} ({} messages, {})",
                row.title,
                row.message_count,
                row.updated_at.format("%Y-%m-%d")
            )?;
        }
    }
    Ok(())
}

fn render_thread(out: &mut dyn Write, conversation: Option<&Conversation>) -> std::io::Result<()> {
    let Some(conversation) = conversation else {
        return writeln!(out, "No conversation selected.");
    };
    writeln!(out, "== {} ==", conversation.title)?;
    for message in &conversation.messages {
        writeln!(
            out,
            "[{}] {}: {}",
            message.timestamp.format("%H:%M"),
            message.role,
            message.content
        )?;
    }
    Ok(())
}

fn render_reply(out: &mut dyn Write, snapshot: &ChatSnapshot) -> std::io::Result<()> {
    if let Some(message) = snapshot
        .current_conversation
        .as_ref()
        .and_then(Conversation::last_message)
    {
        writeln!(out, "{}: {}", message.role, message.content)?;
    }
    if let Some(error) = &snapshot.error {
        writeln!(out, "warning: {error}")?;
    }
    Ok(())
}
