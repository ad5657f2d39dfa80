//! Built-in modules
//!
//! - `mbot`: session control (quit, chat, status report)
//! - `utility`: waiting helpers and validated block search
//! - `mover`: movement rules and navigation
//! - `miner`: mining, digging and item collection
//! - `health`: auto-eat and leaving the game before dying

pub mod health;
pub mod miner;
pub mod mover;
pub mod session;
pub mod utility;

pub use health::Health;
pub use miner::Miner;
pub use mover::Mover;
pub use session::Session;
pub use utility::Utility;

use crate::config::AgentSettings;
use crate::error::Result;
use crate::module::ModuleRegistry;
use std::sync::Arc;

/// Registry holding every built-in module
pub fn default_registry(settings: &AgentSettings) -> Result<ModuleRegistry> {
    ModuleRegistry::builder()
        .register(Arc::new(Session::new()))
        .register(Arc::new(Utility::new()))
        .register(Arc::new(Mover::new()))
        .register(Arc::new(Miner::new()))
        .register(Arc::new(Health::new(&settings.health)))
        .build()
}
