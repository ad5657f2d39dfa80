//! Module registry
//!
//! Maps module names to mounted modules and `(module, instruction)` pairs to
//! typed handlers. Duplicate names are rejected when the registry is built.

use super::actions::{ActionHandler, ActionSet, PreparedAction};
use super::{ActionId, Module, ModuleId};
use crate::error::{BotError, Result};
use crate::instruction::InstructionCall;
use serde::Serialize;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct ModuleEntry {
    module: Arc<dyn Module>,
    capability: Arc<dyn Any + Send + Sync>,
    actions: HashMap<ActionId, ActionHandler>,
}

/// Registered modules, keyed by name
pub struct ModuleRegistry {
    entries: HashMap<ModuleId, ModuleEntry>,
    order: Vec<ModuleId>,
}

/// Summary of a registered module, for listing
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub requires: Vec<String>,
    pub instructions: Vec<String>,
}

impl ModuleRegistry {
    pub fn builder() -> ModuleRegistryBuilder {
        ModuleRegistryBuilder::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.entries.get(name).map(|entry| &entry.module)
    }

    /// Modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.module))
    }

    /// Concrete handle to another module, for modules that build on each other
    pub fn capability<T: Module>(&self, name: &str) -> Result<Arc<T>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| BotError::UnknownModule(name.to_string()))?;
        Arc::clone(&entry.capability).downcast::<T>().map_err(|_| {
            BotError::ConfigError(format!(
                "module {} is not a {}",
                name,
                type_name::<T>()
            ))
        })
    }

    /// Instruction names of one module, sorted
    pub fn instructions(&self, module: &str) -> Result<Vec<&str>> {
        let entry = self
            .entries
            .get(module)
            .ok_or_else(|| BotError::UnknownModule(module.to_string()))?;
        let mut names: Vec<&str> = entry.actions.keys().map(ActionId::as_str).collect();
        names.sort_unstable();
        Ok(names)
    }

    pub fn resolve(&self, module: &str, instruction: &str) -> Result<&ActionHandler> {
        let entry = self
            .entries
            .get(module)
            .ok_or_else(|| BotError::UnknownModule(module.to_string()))?;
        entry
            .actions
            .get(instruction)
            .ok_or_else(|| BotError::UnknownInstruction {
                module: module.to_string(),
                instruction: instruction.to_string(),
            })
    }

    /// Resolve a call and decode its arguments. Nothing runs yet.
    pub fn prepare(&self, call: &InstructionCall) -> Result<PreparedAction> {
        let handler = self.resolve(&call.module, &call.instruction)?;
        handler(call.args.clone())
    }

    pub fn describe(&self) -> Vec<ModuleDescriptor> {
        self.order
            .iter()
            .filter_map(|id| {
                let entry = self.entries.get(id)?;
                let mut instructions: Vec<String> =
                    entry.actions.keys().map(|a| a.to_string()).collect();
                instructions.sort_unstable();
                Some(ModuleDescriptor {
                    name: id.to_string(),
                    requires: entry.module.required_modules().to_vec(),
                    instructions,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.order)
            .finish()
    }
}

/// Collects modules; validation happens in [`build`](Self::build)
#[derive(Default)]
pub struct ModuleRegistryBuilder {
    pending: Vec<(Arc<dyn Module>, Arc<dyn Any + Send + Sync>, ActionSet)>,
}

impl ModuleRegistryBuilder {
    pub fn register<M: Module>(mut self, module: Arc<M>) -> Self {
        let mut actions = ActionSet::new(module.base().id().clone());
        Arc::clone(&module).register_actions(&mut actions);
        let capability: Arc<dyn Any + Send + Sync> = module.clone();
        let module: Arc<dyn Module> = module;
        self.pending.push((module, capability, actions));
        self
    }

    pub fn build(self) -> Result<ModuleRegistry> {
        let mut entries = HashMap::with_capacity(self.pending.len());
        let mut order = Vec::with_capacity(self.pending.len());

        for (module, capability, actions) in self.pending {
            let id = actions.module().clone();
            if entries.contains_key(&id) {
                return Err(BotError::DuplicateModule(id.to_string()));
            }

            let mut table = HashMap::new();
            for (action, handler) in actions.into_handlers() {
                if table.contains_key(&action) {
                    return Err(BotError::DuplicateInstruction {
                        module: id.to_string(),
                        instruction: action.to_string(),
                    });
                }
                table.insert(action, handler);
            }

            debug!(module = %id, instructions = table.len(), "Registered module");
            order.push(id.clone());
            entries.insert(
                id,
                ModuleEntry {
                    module,
                    capability,
                    actions: table,
                },
            );
        }

        Ok(ModuleRegistry { entries, order })
    }
}
