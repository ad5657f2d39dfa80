//! Simulated world
//!
//! A deterministic in-memory [`GameConnection`] driven by a tokio ticker.
//! Each physics tick moves the bot one block toward its navigation goal and
//! picks up dropped items within reach. Digging takes a fixed number of ticks
//! and leaves a dropped item where the block was.

use super::contract::{AutoEatOptions, BlockQuery, GameConnection, HarvestTool, Navigator, WorldEvent};
use super::{Goal, Movements};
use crate::config::SimulationConfig;
use crate::error::{BotError, Result};
use crate::types::{Block, BlockPos, Entity, EntityId, ItemStack};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

const KNOWN_BLOCKS: &[&str] = &[
    "air",
    "bedrock",
    "chest",
    "coal_ore",
    "cobblestone",
    "dirt",
    "grass_block",
    "gravel",
    "iron_ore",
    "lava",
    "oak_log",
    "sand",
    "stone",
    "water",
];

const STOPPED: &str = "Path was stopped before it could be completed";
const GOAL_CHANGED: &str = "Goal was changed before it could be completed";

struct Travel {
    goal: Goal,
    steps: u32,
    /// Present for `goto`; absent for fire-and-forget goals
    done: Option<oneshot::Sender<Result<()>>>,
}

struct SimState {
    username: String,
    position: BlockPos,
    health: f32,
    food: f32,
    blocks: HashMap<BlockPos, String>,
    known_blocks: BTreeSet<String>,
    entities: HashMap<EntityId, Entity>,
    next_entity: u64,
    inventory: Vec<ItemStack>,
    held: Option<ItemStack>,
    auto_eat: Option<AutoEatOptions>,
    joined: bool,
    movements: Movements,
    travel: Option<Travel>,
}

enum Step {
    Arrived,
    Move(BlockPos),
    Lost,
    Exhausted,
}

impl SimState {
    fn locate(&self, id: EntityId) -> Option<BlockPos> {
        self.entities.get(&id).map(|e| e.position)
    }

    fn finish_travel(&mut self, result: Result<()>) {
        if let Some(done) = self.travel.take().and_then(|t| t.done) {
            let _ = done.send(result);
        }
    }

    fn replace_travel(&mut self, travel: Travel) {
        self.finish_travel(Err(BotError::Navigation(GOAL_CHANGED.to_string())));
        self.travel = Some(travel);
    }

    fn advance_travel(&mut self, max_steps: u32) {
        let step = match &self.travel {
            None => return,
            Some(travel) => {
                let locate = |id| self.locate(id);
                if travel.goal.is_satisfied(self.position, &locate) {
                    Step::Arrived
                } else if travel.done.is_some() && travel.steps >= max_steps {
                    Step::Exhausted
                } else {
                    match travel.goal.heading(self.position, &locate) {
                        Some(target) => Step::Move(target),
                        None => Step::Lost,
                    }
                }
            }
        };

        match step {
            Step::Arrived => {
                // Fire-and-forget goals (follow) stay active.
                if self.travel.as_ref().map_or(false, |t| t.done.is_some()) {
                    self.finish_travel(Ok(()));
                }
            }
            Step::Move(target) => {
                self.position =
                    step_toward(self.position, target, self.movements.can_move_diagonally);
                if let Some(travel) = self.travel.as_mut() {
                    travel.steps += 1;
                }
            }
            Step::Exhausted => self.finish_travel(Err(BotError::Navigation(
                "Took too long to reach the goal".to_string(),
            ))),
            Step::Lost => self.finish_travel(Err(BotError::Navigation(
                "Goal target is no longer in the world".to_string(),
            ))),
        }
    }

    fn pick_up_items(&mut self, events: &mut Vec<WorldEvent>) {
        let position = self.position;
        let reachable: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.dropped_item.is_some() && e.position.distance(&position) <= 1.0)
            .map(|e| e.id)
            .collect();

        for id in reachable {
            if let Some(item) = self.entities.remove(&id).and_then(|e| e.dropped_item) {
                add_to_inventory(&mut self.inventory, &item, 1);
                debug!(entity = %id, item = %item, "Picked up item");
                events.push(WorldEvent::EntityGone(id));
            }
        }
    }

    fn spawn_item(&mut self, position: BlockPos, item: &str) -> EntityId {
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        self.entities.insert(
            id,
            Entity {
                id,
                position,
                dropped_item: Some(item.to_string()),
            },
        );
        id
    }
}

fn add_to_inventory(inventory: &mut Vec<ItemStack>, item: &str, count: u32) {
    match inventory.iter_mut().find(|stack| stack.name == item) {
        Some(stack) => stack.count += count,
        None => inventory.push(ItemStack::new(item, count)),
    }
}

/// One block toward `to`; without diagonal moves, one axis at a time
fn step_toward(from: BlockPos, to: BlockPos, diagonal: bool) -> BlockPos {
    let (dx, dy, dz) = (
        (to.x - from.x).signum(),
        (to.y - from.y).signum(),
        (to.z - from.z).signum(),
    );
    let next = if diagonal {
        from.offset(dx, dy, dz)
    } else if dx != 0 {
        from.offset(dx, 0, 0)
    } else if dz != 0 {
        from.offset(0, 0, dz)
    } else {
        from.offset(0, dy, 0)
    };
    // Standing on the target without satisfying the goal: step up off it.
    if next == from {
        from.offset(0, 1, 0)
    } else {
        next
    }
}

fn harvest_suffix(block: &str) -> Option<(&'static str, bool)> {
    match block {
        "bedrock" | "air" | "water" | "lava" => None,
        "stone" | "cobblestone" | "coal_ore" | "iron_ore" => Some(("_pickaxe", true)),
        "dirt" | "grass_block" | "sand" | "gravel" => Some(("_shovel", false)),
        "oak_log" | "chest" => Some(("_axe", false)),
        _ => Some(("", false)),
    }
}

struct SimInner {
    config: SimulationConfig,
    state: Mutex<SimState>,
    events: broadcast::Sender<WorldEvent>,
    dig_stop: Notify,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SimInner {
    fn tick_length(&self) -> Duration {
        Duration::from_millis(self.config.tick_ms.max(1))
    }

    fn tick(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            state.advance_travel(self.config.max_path_length);
            state.pick_up_items(&mut events);
        }
        events.push(WorldEvent::PhysicsTick);
        for event in events {
            let _ = self.events.send(event);
        }
    }

    fn emit(&self, event: WorldEvent) {
        let _ = self.events.send(event);
    }

    fn ensure_joined(&self) -> Result<()> {
        if self.state.lock().joined {
            Ok(())
        } else {
            Err(BotError::NotConnected)
        }
    }
}

/// In-memory world; clones share state
#[derive(Clone)]
pub struct SimulatedWorld {
    inner: Arc<SimInner>,
}

impl SimulatedWorld {
    /// Empty world with the bot standing at the origin
    pub fn new(username: &str, config: SimulationConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(SimInner {
                config,
                state: Mutex::new(SimState {
                    username: username.to_string(),
                    position: BlockPos::default(),
                    health: 20.0,
                    food: 20.0,
                    blocks: HashMap::new(),
                    known_blocks: KNOWN_BLOCKS.iter().map(|b| b.to_string()).collect(),
                    entities: HashMap::new(),
                    next_entity: 0,
                    inventory: Vec::new(),
                    held: None,
                    auto_eat: None,
                    joined: false,
                    movements: Movements::default(),
                    travel: None,
                }),
                events,
                dig_stop: Notify::new(),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Small quarry: bedrock floor, three stone layers with coal, a dirt
    /// surface and a tree, with the bot standing on top holding basic tools.
    pub fn demo(username: &str, config: SimulationConfig) -> Self {
        let world = Self::new(username, config);
        for x in -4..=4 {
            for z in -4..=4 {
                world.place_block(BlockPos::new(x, 0, z), "bedrock");
                for y in 1..=3 {
                    let name = if (x + z + y) % 7 == 0 { "coal_ore" } else { "stone" };
                    world.place_block(BlockPos::new(x, y, z), name);
                }
                world.place_block(BlockPos::new(x, 4, z), "dirt");
            }
        }
        for y in 5..=7 {
            world.place_block(BlockPos::new(3, y, 3), "oak_log");
        }
        world.teleport(BlockPos::new(0, 5, 0));
        world.give(ItemStack::new("iron_pickaxe", 1));
        world.give(ItemStack::new("stone_shovel", 1));
        world.give(ItemStack::new("bread", 8));
        world
    }

    pub fn place_block(&self, pos: BlockPos, name: &str) {
        let mut state = self.inner.state.lock();
        state.known_blocks.insert(name.to_string());
        state.blocks.insert(pos, name.to_string());
    }

    pub fn remove_block(&self, pos: BlockPos) -> Option<String> {
        self.inner.state.lock().blocks.remove(&pos)
    }

    pub fn give(&self, stack: ItemStack) {
        let mut state = self.inner.state.lock();
        add_to_inventory(&mut state.inventory, &stack.name, stack.count);
    }

    pub fn teleport(&self, pos: BlockPos) {
        self.inner.state.lock().position = pos;
    }

    /// Drop an item entity at `pos`
    pub fn drop_item(&self, pos: BlockPos, item: &str) -> EntityId {
        self.inner.state.lock().spawn_item(pos, item)
    }

    /// Change health and food, publishing a health event
    pub fn set_health(&self, health: f32, food: f32) {
        {
            let mut state = self.inner.state.lock();
            state.health = health;
            state.food = food;
        }
        self.inner.emit(WorldEvent::Health { health, food });
    }

    /// Another player says something in public chat
    pub fn inject_chat(&self, username: &str, message: &str) {
        self.inner.emit(WorldEvent::Chat {
            username: username.to_string(),
            message: message.to_string(),
        });
    }

    /// Another player whispers to the bot
    pub fn inject_whisper(&self, username: &str, message: &str) {
        self.inner.emit(WorldEvent::Whisper {
            username: username.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_joined(&self) -> bool {
        self.inner.state.lock().joined
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.inner.config
    }

    fn start_ticker(&self) {
        let weak: Weak<SimInner> = Arc::downgrade(&self.inner);
        let period = self.inner.tick_length();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(inner) => inner.tick(),
                    None => break,
                }
            }
        });
        if let Some(previous) = self.inner.ticker.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl std::fmt::Debug for SimulatedWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SimulatedWorld")
            .field("username", &state.username)
            .field("position", &state.position)
            .field("joined", &state.joined)
            .field("blocks", &state.blocks.len())
            .finish()
    }
}

#[async_trait]
impl GameConnection for SimulatedWorld {
    fn username(&self) -> String {
        self.inner.state.lock().username.clone()
    }

    fn position(&self) -> BlockPos {
        self.inner.state.lock().position
    }

    fn health(&self) -> f32 {
        self.inner.state.lock().health
    }

    fn food(&self) -> f32 {
        self.inner.state.lock().food
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        self.inner.state.lock().blocks.get(&pos).map(|name| Block {
            name: name.clone(),
            position: pos,
        })
    }

    fn is_known_block(&self, name: &str) -> bool {
        self.inner.state.lock().known_blocks.contains(name)
    }

    fn find_blocks(&self, query: &BlockQuery) -> Vec<Block> {
        let state = self.inner.state.lock();
        let origin = state.position;
        let mut found: Vec<Block> = state
            .blocks
            .iter()
            .filter(|(pos, _)| origin.distance(pos) <= query.max_distance)
            .map(|(pos, name)| Block {
                name: name.clone(),
                position: *pos,
            })
            .filter(|block| query.accepts(block))
            .collect();
        found.sort_by(|a, b| {
            origin
                .distance(&a.position)
                .total_cmp(&origin.distance(&b.position))
                .then_with(|| (a.position.x, a.position.y, a.position.z).cmp(&(b.position.x, b.position.y, b.position.z)))
        });
        found.truncate(query.count);
        found
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.inner.state.lock().entities.get(&id).cloned()
    }

    fn nearest_dropped_item(&self, item: &str) -> Option<Entity> {
        let state = self.inner.state.lock();
        let origin = state.position;
        state
            .entities
            .values()
            .filter(|e| e.dropped_item.as_deref() == Some(item))
            .min_by(|a, b| {
                origin
                    .distance(&a.position)
                    .total_cmp(&origin.distance(&b.position))
            })
            .cloned()
    }

    fn inventory(&self) -> Vec<ItemStack> {
        self.inner.state.lock().inventory.clone()
    }

    fn held_item(&self) -> Option<ItemStack> {
        self.inner.state.lock().held.clone()
    }

    fn best_harvest_tool(&self, block: &Block) -> HarvestTool {
        let Some((suffix, required)) = harvest_suffix(&block.name) else {
            return HarvestTool::Unavailable;
        };
        let state = self.inner.state.lock();
        let tool = (!suffix.is_empty())
            .then(|| state.inventory.iter().find(|s| s.name.ends_with(suffix)))
            .flatten();
        match (tool, required) {
            (Some(stack), _) => HarvestTool::Tool(ItemStack::new(stack.name.clone(), 1)),
            (None, true) => HarvestTool::Unavailable,
            (None, false) => HarvestTool::BareHand,
        }
    }

    async fn equip(&self, item: &ItemStack) -> Result<()> {
        self.inner.ensure_joined()?;
        let mut state = self.inner.state.lock();
        if !state.inventory.iter().any(|s| s.name == item.name) {
            return Err(BotError::ActionFailed(format!(
                "{} is not in the inventory",
                item.name
            )));
        }
        state.held = Some(item.clone());
        Ok(())
    }

    async fn dig(&self, pos: BlockPos) -> Result<()> {
        self.inner.ensure_joined()?;
        let name = self
            .inner
            .state
            .lock()
            .blocks
            .get(&pos)
            .cloned()
            .ok_or_else(|| BotError::ActionFailed(format!("No block to dig at {}", pos)))?;

        let duration = self.inner.tick_length() * self.inner.config.dig_ticks;
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.inner.dig_stop.notified() => {
                return Err(BotError::ActionFailed("Digging aborted".to_string()));
            }
        }

        let mut state = self.inner.state.lock();
        if state.blocks.remove(&pos).is_some() {
            let id = state.spawn_item(pos, &name);
            debug!(block = %name, position = %pos, entity = %id, "Block dug");
        }
        Ok(())
    }

    fn stop_digging(&self) {
        self.inner.dig_stop.notify_waiters();
    }

    async fn chat(&self, message: &str) -> Result<()> {
        self.inner.ensure_joined()?;
        let username = self.username();
        self.inner.emit(WorldEvent::Chat {
            username,
            message: message.to_string(),
        });
        Ok(())
    }

    fn set_auto_eat(&self, options: Option<AutoEatOptions>) {
        self.inner.state.lock().auto_eat = options;
    }

    fn auto_eat(&self) -> Option<AutoEatOptions> {
        self.inner.state.lock().auto_eat.clone()
    }

    async fn join(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.joined {
                return Ok(());
            }
            state.joined = true;
            info!(username = %state.username, position = %state.position, "Joined simulated world");
        }
        self.start_ticker();
        self.inner.emit(WorldEvent::Spawn);
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.joined = false;
            state.finish_travel(Err(BotError::NotConnected));
        }
        if let Some(ticker) = self.inner.ticker.lock().take() {
            ticker.abort();
        }
        self.inner.emit(WorldEvent::End {
            reason: "quit".to_string(),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.inner.events.subscribe()
    }

    fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::new(SimNavigator {
            inner: Arc::clone(&self.inner),
        })
    }
}

struct SimNavigator {
    inner: Arc<SimInner>,
}

#[async_trait]
impl Navigator for SimNavigator {
    fn set_movements(&self, movements: Movements) {
        self.inner.state.lock().movements = movements;
    }

    fn movements(&self) -> Movements {
        self.inner.state.lock().movements.clone()
    }

    async fn goto(&self, goal: Goal) -> Result<()> {
        let arrival = {
            let mut state = self.inner.state.lock();
            if !state.joined {
                return Err(BotError::NotConnected);
            }
            let at = state.position;
            let target = {
                let locate = |id| state.locate(id);
                if goal.is_satisfied(at, &locate) {
                    return Ok(());
                }
                goal.heading(at, &locate)
            }
            .ok_or_else(|| BotError::Navigation("Goal cannot be located".to_string()))?;

            if at.distance(&target) > f64::from(self.inner.config.max_path_length) {
                return Err(BotError::Navigation(format!("No path to {}", target)));
            }

            let (done, arrival) = oneshot::channel();
            state.replace_travel(Travel {
                goal,
                steps: 0,
                done: Some(done),
            });
            arrival
        };

        arrival
            .await
            .unwrap_or_else(|_| Err(BotError::Navigation(STOPPED.to_string())))
    }

    fn set_goal(&self, goal: Option<Goal>) {
        let mut state = self.inner.state.lock();
        match goal {
            Some(goal) => state.replace_travel(Travel {
                goal,
                steps: 0,
                done: None,
            }),
            None => state.finish_travel(Err(BotError::Navigation(STOPPED.to_string()))),
        }
    }

    fn stop(&self) {
        self.inner
            .state
            .lock()
            .finish_travel(Err(BotError::Navigation(STOPPED.to_string())));
    }

    fn is_moving(&self) -> bool {
        self.inner.state.lock().travel.is_some()
    }
}
