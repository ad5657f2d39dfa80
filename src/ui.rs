//! User interfaces
//!
//! The agent reports progress, failures and in-game chat through a
//! [`UserInterface`]. Commands flow the other way: an interface hands command
//! names to the agent's instruction manager.

pub mod console;

pub use console::{serve_commands, ConsoleInterface};

use crate::error::BotError;
use tracing::{error, info};

/// Notification surface the agent reports to
pub trait UserInterface: Send + Sync {
    /// Message meant for the operator
    fn notify(&self, message: &str);

    /// Diagnostic line
    fn log(&self, message: &str) {
        info!(target: "mbot::ui", "{}", message);
    }

    /// Failure of an instruction or UI operation
    fn log_error(&self, error: &BotError) {
        error!(target: "mbot::ui", error = %error, "Instruction failed");
    }

    /// Public chat line seen in the world
    fn log_chat_message(&self, username: &str, message: &str);

    /// Private message addressed to the bot
    fn log_whisper(&self, username: &str, message: &str);
}

/// Routes everything into `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterface;

impl UserInterface for TracingInterface {
    fn notify(&self, message: &str) {
        info!(target: "mbot::ui", notification = true, "{}", message);
    }

    fn log_chat_message(&self, username: &str, message: &str) {
        info!(target: "mbot::chat", username, "{}", message);
    }

    fn log_whisper(&self, username: &str, message: &str) {
        info!(target: "mbot::chat", username, whisper = true, "{}", message);
    }
}
