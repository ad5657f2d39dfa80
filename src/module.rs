//! Module contract
//!
//! A module is a pluggable unit that groups related instructions and reacts to
//! agent lifecycle events. Modules are composed, not subclassed: shared
//! behaviour lives in [`ModuleBase`], and a module reaches the capabilities of
//! another through [`ModuleRegistry::capability`].

pub mod actions;
pub mod registry;

pub use actions::{ActionFuture, ActionHandler, ActionSet, NoArgs, PreparedAction};
pub use registry::{ModuleDescriptor, ModuleRegistry, ModuleRegistryBuilder};

use crate::agent::AgentContext;
use crate::error::{BotError, Result};
use crate::world::GameConnection;
use async_trait::async_trait;
use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Module name, unique within a registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

/// Instruction name, unique within a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(String);

macro_rules! name_type {
    ($ty:ident) => {
        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_type!(ModuleId);
name_type!(ActionId);

/// Lifecycle and action-table contract implemented by every module.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Shared module state (name, dependencies, agent back-reference)
    fn base(&self) -> &ModuleBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Names of modules that must be registered alongside this one
    fn required_modules(&self) -> &[String] {
        self.base().required_modules()
    }

    /// Bind the module to its agent. Called once during assembly.
    fn mount(&self, agent: &Arc<AgentContext>) -> Result<()> {
        self.base().mount(agent)
    }

    /// Called once the game connection is established.
    ///
    /// The default verifies that every required module is registered.
    fn on_create_bot(&self, registry: &ModuleRegistry) -> Result<()> {
        self.base().verify_dependencies(registry)
    }

    /// Called once the bot's entity is present in the world.
    async fn on_spawn(&self) -> Result<()> {
        Ok(())
    }

    /// Declare the instructions this module exposes.
    fn register_actions(self: Arc<Self>, actions: &mut ActionSet);
}

/// State every module carries
pub struct ModuleBase {
    id: ModuleId,
    required: Vec<String>,
    agent: OnceLock<Weak<AgentContext>>,
}

impl ModuleBase {
    pub fn new(name: &str, required: &[&str]) -> Self {
        Self {
            id: ModuleId::new(name),
            required: required.iter().map(|r| r.to_string()).collect(),
            agent: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn required_modules(&self) -> &[String] {
        &self.required
    }

    pub fn mount(&self, agent: &Arc<AgentContext>) -> Result<()> {
        self.agent
            .set(Arc::downgrade(agent))
            .map_err(|_| BotError::AlreadyMounted(self.name().to_string()))
    }

    pub fn is_mounted(&self) -> bool {
        self.agent.get().is_some()
    }

    /// The owning agent, if mounted and still alive
    pub fn agent(&self) -> Result<Arc<AgentContext>> {
        self.agent
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| BotError::NotMounted(self.name().to_string()))
    }

    /// Current game connection of the owning agent
    pub fn connection(&self) -> Result<Arc<dyn GameConnection>> {
        self.agent()?.connection()
    }

    /// Fail with `MissingDependency` naming the first absent requirement
    pub fn verify_dependencies(&self, registry: &ModuleRegistry) -> Result<()> {
        for required in &self.required {
            if !registry.contains(required) {
                return Err(BotError::MissingDependency {
                    module: self.name().to_string(),
                    required: required.clone(),
                });
            }
        }
        Ok(())
    }
}
