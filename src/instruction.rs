//! Instruction calls and the command table.
//!
//! An [`InstructionCall`] names a module, one of its instructions and an
//! argument payload. The [`CommandTable`] maps short command names to calls and
//! is loaded from `commands.json`.

pub mod manager;

pub use manager::{InstructionManager, InstructionOutcome, ManagerState};

use crate::error::{BotError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A resolved `{module, instruction, args}` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionCall {
    pub module: String,
    pub instruction: String,
    #[serde(default = "empty_args", deserialize_with = "null_as_empty")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Map::new())
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(if value.is_null() { empty_args() } else { value })
}

impl InstructionCall {
    pub fn new(module: impl Into<String>, instruction: impl Into<String>, args: Value) -> Self {
        Self {
            module: module.into(),
            instruction: instruction.into(),
            args,
        }
    }

    /// Validate raw JSON contents.
    ///
    /// Checks shape only; whether the module and instruction exist is up to the
    /// registry.
    pub fn from_value(contents: &Value) -> Result<Self> {
        let object = contents
            .as_object()
            .ok_or_else(|| BotError::InvalidContents(contents.to_string()))?;

        let module = object
            .get("module")
            .and_then(Value::as_str)
            .ok_or(BotError::InvalidModuleName)?;

        let instruction = object
            .get("instruction")
            .and_then(Value::as_str)
            .ok_or(BotError::InvalidInstructionName)?;

        let args = match object.get("args") {
            None | Some(Value::Null) => empty_args(),
            Some(args) => args.clone(),
        };

        Ok(Self::new(module, instruction, args))
    }

    /// `module.instruction`, used in logs and interruption messages
    pub fn label(&self) -> String {
        format!("{}.{}", self.module, self.instruction)
    }
}

impl fmt::Display for InstructionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.instruction)
    }
}

/// Named shortcuts for instruction calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTable {
    commands: HashMap<String, InstructionCall>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BotError::ConfigError(format!(
                "Failed to read command table {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, call: InstructionCall) -> &mut Self {
        self.commands.insert(name.into(), call);
        self
    }

    pub fn get(&self, name: &str) -> Result<&InstructionCall> {
        self.commands
            .get(name)
            .ok_or_else(|| BotError::InvalidCommandName(name.to_string()))
    }

    /// Command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(name, call)` pairs sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstructionCall)> + '_ {
        self.names().into_iter().filter_map(move |name| {
            self.commands.get(name).map(|call| (name, call))
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
