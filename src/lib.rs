//! mbot: an extensible game automation agent
//!
//! Behaviour comes from modules that register named instructions. Instructions
//! run one at a time through the [`InstructionManager`]; a new instruction
//! interrupts the running one and starts only after it has settled.

pub mod agent;
pub mod config;
pub mod error;
pub mod instruction;
pub mod interrupt;
pub mod logging;
pub mod module;
pub mod modules;
pub mod tooling;
pub mod types;
pub mod ui;
pub mod world;

pub use agent::AgentContext;
pub use error::{BotError, Result};
pub use instruction::{CommandTable, InstructionCall, InstructionManager, InstructionOutcome};
pub use interrupt::InterruptToken;
pub use module::{ActionSet, Module, ModuleBase, ModuleRegistry};
