//! Movement rules handed to the navigation engine.

use crate::error::{BotError, Result};
use crate::types::Block;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Movement options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Movements {
    pub can_dig: bool,
    pub allow_parkour: bool,
    pub allow_sprinting: bool,
    pub can_move_diagonally: bool,
    pub max_drop_down: u32,
    pub blocks_cant_break: BTreeSet<String>,
    pub blocks_to_avoid: BTreeSet<String>,
}

impl Default for Movements {
    fn default() -> Self {
        Self {
            can_dig: true,
            allow_parkour: true,
            allow_sprinting: true,
            can_move_diagonally: true,
            max_drop_down: 4,
            blocks_cant_break: ["bedrock", "chest"].into_iter().map(String::from).collect(),
            blocks_to_avoid: ["fire", "lava", "wheat"].into_iter().map(String::from).collect(),
        }
    }
}

/// Changes to apply on top of a [`Movements`]
///
/// `set` replaces fields; `add` extends set-valued fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementsSettings {
    #[serde(default)]
    pub set: Option<Map<String, Value>>,
    #[serde(default)]
    pub add: Option<Map<String, Value>>,
}

impl MovementsSettings {
    pub fn is_empty(&self) -> bool {
        self.set.as_ref().map_or(true, Map::is_empty) && self.add.as_ref().map_or(true, Map::is_empty)
    }
}

impl Movements {
    /// Whether digging through `block` is allowed
    pub fn safe_to_break(&self, block: &Block) -> bool {
        self.can_dig && block.name != "air" && !self.blocks_cant_break.contains(&block.name)
    }

    /// Apply `settings`; on error `self` is unchanged
    pub fn apply(&mut self, settings: &MovementsSettings) -> Result<()> {
        let mut value = serde_json::to_value(&*self)?;
        if let Value::Object(fields) = &mut value {
            if let Some(set) = &settings.set {
                for (key, new_value) in set {
                    if !fields.contains_key(key) {
                        return Err(unknown(key));
                    }
                    fields.insert(key.clone(), new_value.clone());
                }
            }

            if let Some(add) = &settings.add {
                for (key, extra) in add {
                    match (fields.get_mut(key), extra) {
                        (Some(Value::Array(existing)), Value::Array(extra)) => {
                            existing.extend(extra.iter().cloned())
                        }
                        (Some(Value::Array(_)), _) => {
                            return Err(BotError::ConfigError(format!(
                                "Movement setting {} expects a list",
                                key
                            )))
                        }
                        (Some(_), _) => {
                            return Err(BotError::ConfigError(format!(
                                "Movement setting {} is not a set",
                                key
                            )))
                        }
                        (None, _) => return Err(unknown(key)),
                    }
                }
            }
        }

        *self = serde_json::from_value(value)
            .map_err(|e| BotError::ConfigError(format!("Invalid movement settings: {}", e)))?;
        Ok(())
    }
}

fn unknown(key: &str) -> BotError {
    BotError::ConfigError(format!("Unknown movement setting: {}", key))
}
