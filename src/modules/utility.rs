//! Utility module: block search and interruptible waits.

use crate::error::{BotError, Result};
use crate::interrupt::InterruptToken;
use crate::module::{ActionSet, Module, ModuleBase};
use crate::types::{Block, EntityId};
use crate::world::{BlockQuery, GameConnection, WorldEvent};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

pub const NAME: &str = "utility";

#[derive(Debug, Deserialize)]
pub struct WaitArgs {
    pub milliseconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct WaitForPhysicsTicksArgs {
    pub count: u32,
}

pub struct Utility {
    base: ModuleBase,
}

impl Default for Utility {
    fn default() -> Self {
        Self::new()
    }
}

impl Utility {
    pub fn new() -> Self {
        Self {
            base: ModuleBase::new(NAME, &[]),
        }
    }

    /// Search for blocks, rejecting names the world does not know.
    pub fn find_blocks(&self, query: &BlockQuery) -> Result<Vec<Block>> {
        let connection = self.base.connection()?;
        if let Some(unknown) = query
            .matching
            .iter()
            .find(|name| !connection.is_known_block(name))
        {
            return Err(BotError::UnknownBlock(unknown.clone()));
        }
        let found = connection.find_blocks(query);
        debug!(matching = ?query.matching, found = found.len(), "Block search");
        Ok(found)
    }

    pub async fn wait(&self, duration: Duration, token: &InterruptToken) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = token.interrupted() => Err(BotError::Interrupted("wait".to_string())),
        }
    }

    /// Wait until `count` physics ticks have passed
    pub async fn wait_for_physics_ticks(&self, count: u32, token: &InterruptToken) -> Result<()> {
        let mut events = self.base.connection()?.subscribe();
        let mut remaining = count;
        while remaining > 0 {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(WorldEvent::PhysicsTick) => remaining -= 1,
                    Ok(WorldEvent::End { .. }) | Err(RecvError::Closed) => {
                        return Err(BotError::NotConnected)
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream lagged while counting physics ticks");
                    }
                },
                _ = token.interrupted() => {
                    return Err(BotError::Interrupted("waitForPhysicsTicks".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Wait until entity `id` leaves the world.
    ///
    /// `events` must be subscribed before whatever makes the entity go away is
    /// started, so the removal cannot be missed.
    pub async fn wait_for_entity_gone(
        &self,
        connection: &dyn GameConnection,
        mut events: broadcast::Receiver<WorldEvent>,
        id: EntityId,
        token: &InterruptToken,
    ) -> Result<()> {
        if connection.entity(id).is_none() {
            return Ok(());
        }
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(WorldEvent::EntityGone(gone)) if gone == id => return Ok(()),
                    Ok(WorldEvent::End { .. }) | Err(RecvError::Closed) => {
                        return Err(BotError::NotConnected)
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        if connection.entity(id).is_none() {
                            return Ok(());
                        }
                    }
                },
                _ = token.interrupted() => {
                    return Err(BotError::Interrupted("waitForEntityGone".to_string()));
                }
            }
        }
    }
}

impl Module for Utility {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn register_actions(self: Arc<Self>, actions: &mut ActionSet) {
        let this = Arc::clone(&self);
        actions.add("wait", move |args: WaitArgs, token: InterruptToken| {
            let this = Arc::clone(&this);
            async move {
                this.wait(Duration::from_millis(args.milliseconds), &token)
                    .await
            }
        });

        let this = self;
        actions.add(
            "waitForPhysicsTicks",
            move |args: WaitForPhysicsTicksArgs, token: InterruptToken| {
                let this = Arc::clone(&this);
                async move { this.wait_for_physics_ticks(args.count, &token).await }
            },
        );
    }
}
