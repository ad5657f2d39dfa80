//! Error types for the agent.
//!
//! A single `BotError` covers instruction resolution, cooperative interruption,
//! action-level failures and startup/configuration failures. Resolution errors
//! reach the caller of `dispatch`; action errors are routed to the user
//! interface; configuration errors abort agent startup.

use std::io;
use thiserror::Error;

/// Top-level agent error
#[derive(Debug, Error)]
pub enum BotError {
    /// Command name is not present in the command table
    #[error("Invalid Command Name: {0}")]
    InvalidCommandName(String),

    /// Instruction contents are not a JSON object
    #[error("Invalid contents: {0}")]
    InvalidContents(String),

    /// `module` field missing or not a string
    #[error("Invalid Module Name")]
    InvalidModuleName,

    /// No module with this name is registered
    #[error("Invalid Module: {0}")]
    UnknownModule(String),

    /// `instruction` field missing or not a string
    #[error("Invalid Instruction Name")]
    InvalidInstructionName,

    /// Module exists but exposes no instruction with this name
    #[error("Invalid Instruction: {module}.{instruction}")]
    UnknownInstruction {
        /// Module name
        module: String,
        /// Instruction name
        instruction: String,
    },

    /// Payload could not be decoded into the instruction's arguments
    #[error("Invalid args for {module}.{instruction}: {detail}")]
    InvalidArgs {
        /// Module name
        module: String,
        /// Instruction name
        instruction: String,
        /// Decoder message
        detail: String,
    },

    /// A running instruction observed a preemption request
    #[error("{0} Interrupted")]
    Interrupted(String),

    /// A module's declared dependency is not registered
    #[error("{module} requires {required}, which must be mounted")]
    MissingDependency {
        /// Module declaring the dependency
        module: String,
        /// Missing dependency
        required: String,
    },

    /// Two modules share a name
    #[error("Module {0} is already registered")]
    DuplicateModule(String),

    /// A module registered the same instruction twice
    #[error("Instruction {module}.{instruction} is already registered")]
    DuplicateInstruction {
        /// Module name
        module: String,
        /// Instruction name
        instruction: String,
    },

    /// Module was mounted a second time
    #[error("Module {0} is already mounted")]
    AlreadyMounted(String),

    /// Module used before mount, or its agent is gone
    #[error("Module {0} is not mounted")]
    NotMounted(String),

    /// No live game connection
    #[error("Bot is not connected")]
    NotConnected,

    /// Navigation engine could not reach the goal
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Block search returned nothing
    #[error("Could not find any blocks of that type")]
    NoBlocksFound,

    /// Block name unknown to the world
    #[error("Invalid Block Name: {0}")]
    UnknownBlock(String),

    /// Inventory holds no tool able to harvest the block
    #[error("No tool to harvest block {0}")]
    NoHarvestTool(String),

    /// Generic action failure reported by a collaborator
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Layered configuration failed to load
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BotError {
    /// True for the distinguished interruption error
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BotError::Interrupted(_))
    }

    /// True for errors raised while resolving a command, before any state change
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            BotError::InvalidCommandName(_)
                | BotError::InvalidContents(_)
                | BotError::InvalidModuleName
                | BotError::UnknownModule(_)
                | BotError::InvalidInstructionName
                | BotError::UnknownInstruction { .. }
                | BotError::InvalidArgs { .. }
        )
    }
}

/// Result type using BotError
pub type Result<T> = std::result::Result<T, BotError>;
