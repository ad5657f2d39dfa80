//! Capability traits for the game connection and the navigation engine.

use super::{Goal, Movements};
use crate::error::Result;
use crate::types::{Block, BlockPos, Entity, EntityId, ItemStack};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events published by a game connection
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// The bot's entity is present in the world
    Spawn,
    Health { health: f32, food: f32 },
    Chat { username: String, message: String },
    Whisper { username: String, message: String },
    /// An entity left the world (picked up, despawned)
    EntityGone(EntityId),
    PhysicsTick,
    /// Connection closed
    End { reason: String },
}

/// Extra predicate applied by [`BlockQuery`]
pub type BlockFilter = Arc<dyn Fn(&Block) -> bool + Send + Sync>;

/// Block search around the bot
#[derive(Clone)]
pub struct BlockQuery {
    /// Accepted block names
    pub matching: Vec<String>,
    /// Search radius in blocks
    pub max_distance: f64,
    /// Maximum number of results
    pub count: usize,
    pub filter: Option<BlockFilter>,
}

impl BlockQuery {
    pub fn new<I, S>(matching: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matching: matching.into_iter().map(Into::into).collect(),
            max_distance: 16.0,
            count: 1,
            filter: None,
        }
    }

    pub fn max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Add a predicate, combined with any existing one
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Block) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(match self.filter.take() {
            Some(previous) => Arc::new(move |block: &Block| previous(block) && filter(block)),
            None => Arc::new(filter),
        });
        self
    }

    /// Whether `block` passes the name match and the extra filter
    pub fn accepts(&self, block: &Block) -> bool {
        self.matching.iter().any(|name| *name == block.name)
            && self.filter.as_ref().map(|f| f(block)).unwrap_or(true)
    }
}

impl fmt::Debug for BlockQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockQuery")
            .field("matching", &self.matching)
            .field("max_distance", &self.max_distance)
            .field("count", &self.count)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Auto-eat plugin options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoEatOptions {
    pub priority: String,
    /// Food level at which eating starts
    pub start_at: f32,
    pub banned_food: Vec<String>,
}

impl AutoEatOptions {
    pub fn starting_at(start_at: f32) -> Self {
        Self {
            priority: "foodPoints".to_string(),
            start_at,
            banned_food: Vec::new(),
        }
    }
}

/// What to hold while digging a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestTool {
    BareHand,
    Tool(ItemStack),
    /// Nothing in the inventory can harvest the block
    Unavailable,
}

/// Game connection provider
#[async_trait]
pub trait GameConnection: Send + Sync {
    fn username(&self) -> String;

    fn position(&self) -> BlockPos;

    fn health(&self) -> f32;

    fn food(&self) -> f32;

    fn block_at(&self, pos: BlockPos) -> Option<Block>;

    /// Whether the world knows a block type with this name
    fn is_known_block(&self, name: &str) -> bool;

    /// Matching blocks ordered by distance from the bot
    fn find_blocks(&self, query: &BlockQuery) -> Vec<Block>;

    fn entity(&self, id: EntityId) -> Option<Entity>;

    /// Closest dropped-item entity carrying `item`
    fn nearest_dropped_item(&self, item: &str) -> Option<Entity>;

    fn inventory(&self) -> Vec<ItemStack>;

    fn held_item(&self) -> Option<ItemStack>;

    fn best_harvest_tool(&self, block: &Block) -> HarvestTool;

    async fn equip(&self, item: &ItemStack) -> Result<()>;

    /// Dig the block at `pos`. Fails if digging is stopped first.
    async fn dig(&self, pos: BlockPos) -> Result<()>;

    fn stop_digging(&self);

    async fn chat(&self, message: &str) -> Result<()>;

    /// Enable auto-eat with options, or disable it with `None`
    fn set_auto_eat(&self, options: Option<AutoEatOptions>);

    fn auto_eat(&self) -> Option<AutoEatOptions>;

    /// Enter the world; `WorldEvent::Spawn` follows
    async fn join(&self) -> Result<()>;

    async fn quit(&self) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<WorldEvent>;

    fn navigator(&self) -> Arc<dyn Navigator>;
}

/// Navigation engine
#[async_trait]
pub trait Navigator: Send + Sync {
    fn set_movements(&self, movements: Movements);

    fn movements(&self) -> Movements;

    /// Travel until `goal` is satisfied. Fails if stopped or unreachable.
    async fn goto(&self, goal: Goal) -> Result<()>;

    /// Pursue `goal` without waiting (e.g. follow an entity); `None` clears it
    fn set_goal(&self, goal: Option<Goal>);

    /// Abandon the current goal
    fn stop(&self);

    fn is_moving(&self) -> bool;
}
