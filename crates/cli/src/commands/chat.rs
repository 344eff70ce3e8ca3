use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use ordercopilot_agent::ConversationEngine;
use ordercopilot_core::config::AppConfig;

use super::{load_catalog, CommandResult, EXIT_FAILURE};

pub const RESET_COMMAND: &str = "/reset";
pub const COMPLETE_COMMAND: &str = "/complete";
pub const QUIT_COMMAND: &str = "/quit";

/// Line-oriented chat over stdin/stdout. Every reply is written as one JSON line.
pub async fn run(config: &AppConfig, session_key: &str) -> CommandResult {
    let catalog = match load_catalog("chat", config) {
        Ok(catalog) => catalog,
        Err(failure) => return failure,
    };
    let engine = match ConversationEngine::from_config(config, catalog) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::integration_failure("chat", &error);
        }
    };
    let idle_ttl = config.sessions.idle_ttl_secs.map(Duration::from_secs);

    let reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    match run_session(&engine, session_key, reader, &mut writer, idle_ttl).await {
        Ok(turns) => CommandResult::success("chat", format!("{turns} messages handled")),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), EXIT_FAILURE),
    }
}

/// Feeds each input line to `engine` until EOF or `/quit`; returns the number of
/// buyer messages handled.
pub async fn run_session<R, W>(
    engine: &ConversationEngine,
    session_key: &str,
    reader: R,
    writer: &mut W,
    idle_ttl: Option<Duration>,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut turns = 0;

    while let Some(line) = lines.next_line().await? {
        let reply = match line.trim() {
            QUIT_COMMAND => break,
            RESET_COMMAND => json!({ "kind": "session_reset", "removed": engine.reset(session_key).await }),
            COMPLETE_COMMAND => match engine.complete(session_key).await {
                Ok(outcome) => json!({ "kind": "session_completed", "state": outcome.to }),
                Err(error) => json!({ "kind": "error", "message": error.to_string() }),
            },
            _ => {
                turns += 1;
                serde_json::to_value(engine.handle_message(session_key, &line).await)?
            }
        };

        writer.write_all(serde_json::to_string(&reply)?.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        if let Some(idle_ttl) = idle_ttl {
            let evicted = engine.evict_idle(idle_ttl).await;
            if evicted > 0 {
                info!(event_name = "chat.sessions_evicted", evicted, "idle sessions evicted");
            }
        }
    }

    Ok(turns)
}
