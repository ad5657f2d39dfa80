//! Console front end: colored terminal output and a line-based command reader.

use super::UserInterface;
use crate::agent::AgentContext;
use crate::error::{BotError, Result};
use crate::instruction::InstructionOutcome;
use crate::modules::session;
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info};

/// Terminal user interface
#[derive(Debug, Clone, Copy)]
pub struct ConsoleInterface {
    color: bool,
}

impl Default for ConsoleInterface {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConsoleInterface {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: String, styled: impl FnOnce(&str) -> String) -> String {
        if self.color {
            styled(&text)
        } else {
            text
        }
    }
}

impl UserInterface for ConsoleInterface {
    fn notify(&self, message: &str) {
        info!(target: "mbot::ui", notification = true, "{}", message);
        println!("{}", self.paint(message.to_string(), |t| t.green().to_string()));
    }

    fn log(&self, message: &str) {
        info!(target: "mbot::ui", "{}", message);
        println!("{}", message);
    }

    fn log_error(&self, err: &BotError) {
        error!(target: "mbot::ui", error = %err, "Instruction failed");
        eprintln!("{}", self.paint(err.to_string(), |t| t.red().to_string()));
    }

    fn log_chat_message(&self, username: &str, message: &str) {
        info!(target: "mbot::chat", username, "{}", message);
        let name = self.paint(format!("<{}>", username), |t| t.bold().to_string());
        println!("{} {}", name, message);
    }

    fn log_whisper(&self, username: &str, message: &str) {
        info!(target: "mbot::chat", username, whisper = true, "{}", message);
        let line = format!("{} whispers: {}", username, message);
        println!("{}", self.paint(line, |t| t.italic().dimmed().to_string()));
    }
}

/// Read commands from `reader` until `exit` or end of input.
///
/// Each command name is dispatched in its own task, so a new line preempts
/// whatever is running. On `exit` a running instruction is interrupted by
/// quitting the game. Returns once every spawned dispatch has settled.
pub async fn serve_commands<R>(agent: Arc<AgentContext>, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut running = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "exit" {
            if agent.manager().doing_instruction() {
                quit(&agent).await;
            }
            break;
        }

        if line == "help" {
            let names = agent.commands().names().join(", ");
            agent.ui().notify(&format!("Commands: {}", names));
            continue;
        }

        if let Some(message) = line.strip_prefix("chat ") {
            send_chat(&agent, message).await;
            continue;
        }

        let name = line.to_string();
        debug!(command = %name, "Console command");
        let agent = Arc::clone(&agent);
        running.push(tokio::spawn(async move {
            run_command(&agent, &name).await;
        }));
        running.retain(|task| !task.is_finished());
    }

    for task in running {
        let _ = task.await;
    }
    Ok(())
}

async fn send_chat(agent: &AgentContext, message: &str) {
    let sent = match agent.connection() {
        Ok(connection) => connection.chat(message).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        debug!(error = %e, "Chat failed");
        agent
            .ui()
            .log_error(&BotError::ActionFailed("Could not send message".to_string()));
    }
}

async fn quit(agent: &AgentContext) {
    let call = json!({"module": session::NAME, "instruction": "quit"});
    if let Err(e) = agent.dispatch_value(&call).await {
        agent.ui().log_error(&e);
    }
}

async fn run_command(agent: &AgentContext, name: &str) {
    match agent.dispatch(name).await {
        Ok(InstructionOutcome::Completed) => {
            agent.ui().notify(&format!("Finished command {}", name))
        }
        Ok(InstructionOutcome::Interrupted) => {
            agent.ui().log(&format!("Command {} was interrupted", name))
        }
        Ok(InstructionOutcome::Failed(_)) => {}
        Err(e) => agent.ui().log_error(&e),
    }
}
