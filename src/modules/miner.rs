//! Miner module: find, reach, dig and collect blocks.

use super::mover::{self, Mover};
use super::utility::{self, Utility};
use crate::error::{BotError, Result};
use crate::interrupt::InterruptToken;
use crate::module::{ActionSet, Module, ModuleBase};
use crate::types::{Block, BlockPos};
use crate::world::{BlockQuery, Goal, HarvestTool, MovementsSettings};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const NAME: &str = "miner";

/// Ticks to wait after digging for the dropped item to appear
const SETTLE_TICKS: u32 = 10;

/// One block name or several
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Matching {
    One(String),
    Many(Vec<String>),
}

impl Matching {
    pub fn names(&self) -> Vec<String> {
        match self {
            Matching::One(name) => vec![name.clone()],
            Matching::Many(names) => names.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindBlocksOptions {
    pub matching: Matching,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_max_distance() -> f64 {
    16.0
}

fn default_count() -> usize {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineBlocksArgs {
    pub find_blocks_options: FindBlocksOptions,
    /// Only mine blocks the current movements may break
    #[serde(default = "default_true")]
    pub safe_block_filter: bool,
    /// Unlimited when absent
    #[serde(default)]
    pub number_of_blocks_to_mine: Option<usize>,
    #[serde(default)]
    pub reset_and_apply_movements: bool,
    #[serde(default)]
    pub movements: Option<MovementsSettings>,
    /// Search again after every mined block instead of working through the
    /// previous search results
    #[serde(default)]
    pub search_after_mine: bool,
    #[serde(default)]
    pub min_height: Option<i32>,
    #[serde(default)]
    pub max_height: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DigArgs {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectBlockArgs {
    pub block_name: String,
    /// Unlimited when absent
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub reset_and_apply_movements: bool,
    #[serde(default)]
    pub movements: Option<MovementsSettings>,
}

pub struct Miner {
    base: ModuleBase,
}

impl Default for Miner {
    fn default() -> Self {
        Self::new()
    }
}

impl Miner {
    pub fn new() -> Self {
        Self {
            base: ModuleBase::new(NAME, &[utility::NAME, mover::NAME]),
        }
    }

    fn mover(&self) -> Result<Arc<Mover>> {
        self.base.agent()?.registry().capability::<Mover>(mover::NAME)
    }

    fn utility(&self) -> Result<Arc<Utility>> {
        self.base
            .agent()?
            .registry()
            .capability::<Utility>(utility::NAME)
    }

    /// Block search honouring the height window and the safe-to-break filter
    pub fn find_blocks(&self, args: &MineBlocksArgs) -> Result<Vec<Block>> {
        let options = &args.find_blocks_options;
        let (min, max) = (
            args.min_height.unwrap_or(i32::MIN),
            args.max_height.unwrap_or(i32::MAX),
        );
        let query = BlockQuery::new(options.matching.names())
            .max_distance(options.max_distance)
            .count(options.count)
            .filter(move |block| (min..=max).contains(&block.position.y));

        if args.safe_block_filter {
            self.mover()?.find_safe_to_break_blocks(query)
        } else {
            self.utility()?.find_blocks(&query)
        }
    }

    /// Mine until the requested number of blocks is reached or interrupted.
    ///
    /// A block that cannot be mined is reported and skipped. A search pass in
    /// which no block could be mined ends the instruction.
    pub async fn mine_blocks(&self, args: MineBlocksArgs, token: &InterruptToken) -> Result<()> {
        if args.reset_and_apply_movements {
            self.mover()?
                .reset_and_apply_movements(args.movements.as_ref())?;
        }
        let ui = Arc::clone(self.base.agent()?.ui());
        let target = args.number_of_blocks_to_mine.unwrap_or(usize::MAX);
        let mut mined = 0;

        while mined < target {
            token.fail_if_interrupted("mineBlocks")?;
            let blocks = self.find_blocks(&args)?;
            if blocks.is_empty() {
                return Err(BotError::NoBlocksFound);
            }
            token.fail_if_interrupted("mineBlocks")?;

            let mut mined_this_pass = 0;
            for block in blocks {
                if mined >= target {
                    break;
                }
                match self.mine_block(block.position, token).await {
                    Ok(()) => {
                        mined += 1;
                        mined_this_pass += 1;
                        token.fail_if_interrupted("mineBlocks")?;
                        if args.search_after_mine {
                            break;
                        }
                    }
                    Err(e) => {
                        token.fail_if_interrupted("mineBlocks")?;
                        ui.log_error(&e);
                    }
                }
            }

            if mined_this_pass == 0 {
                return Err(BotError::ActionFailed(
                    "None of the blocks found could be mined".to_string(),
                ));
            }
        }

        info!(mined, "Finished mining");
        Ok(())
    }

    /// Reach, dig and collect the block at `pos`
    pub async fn mine_block(&self, pos: BlockPos, token: &InterruptToken) -> Result<()> {
        let agent = self.base.agent()?;
        let ui = agent.ui();

        ui.log(&format!("Moving to mine block at position {}", pos));
        self.mover()?.goto(Goal::mine_block(pos), token).await?;

        let connection = agent.connection()?;
        let block = connection
            .block_at(pos)
            .ok_or_else(|| BotError::ActionFailed(format!("No block at {}", pos)))?;

        ui.log("Equipping harvesting tool");
        match connection.best_harvest_tool(&block) {
            HarvestTool::Unavailable => return Err(BotError::NoHarvestTool(block.name)),
            HarvestTool::Tool(item) => connection.equip(&item).await?,
            HarvestTool::BareHand => {}
        }
        token.fail_if_interrupted("mineBlock")?;

        ui.log("Digging block");
        self.dig(pos, token).await?;
        ui.log("Finished digging block");
        token.fail_if_interrupted("mineBlock")?;

        self.utility()?
            .wait_for_physics_ticks(SETTLE_TICKS, token)
            .await?;
        token.fail_if_interrupted("mineBlock")?;

        ui.log("Collecting block");
        self.collect_block(&block.name, Some(1), token).await?;
        ui.log("Finished collecting block");
        Ok(())
    }

    /// Dig the block at `pos`; an interrupt stops digging.
    pub async fn dig(&self, pos: BlockPos, token: &InterruptToken) -> Result<()> {
        let connection = self.base.connection()?;

        let stopper = Arc::clone(&connection);
        let _stop = token.stop_guard(move || stopper.stop_digging());

        debug!(position = %pos, "Digging");
        if let Err(e) = connection.dig(pos).await {
            token.fail_if_interrupted("dig")?;
            return Err(e);
        }
        Ok(())
    }

    /// Follow dropped `item` entities until `count` have been picked up or
    /// none are left.
    pub async fn collect_block(
        &self,
        item: &str,
        count: Option<u32>,
        token: &InterruptToken,
    ) -> Result<()> {
        let agent = self.base.agent()?;
        let ui = agent.ui();
        let connection = agent.connection()?;
        let navigator = connection.navigator();
        let utility = self.utility()?;

        for _ in 0..count.unwrap_or(u32::MAX) {
            token.fail_if_interrupted("collectBlock")?;

            let Some(entity) = connection.nearest_dropped_item(item) else {
                ui.log("There is no entity, we are finished");
                break;
            };

            let events = connection.subscribe();
            let stopper = Arc::clone(&navigator);
            let _stop = token.stop_guard(move || stopper.stop());
            navigator.set_goal(Some(Goal::Follow {
                entity: entity.id,
                range: 0.0,
            }));

            let gone = utility
                .wait_for_entity_gone(connection.as_ref(), events, entity.id, token)
                .await;
            navigator.set_goal(None);
            gone?;

            ui.log("Collected one entity");
        }
        Ok(())
    }
}

impl Module for Miner {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn register_actions(self: Arc<Self>, actions: &mut ActionSet) {
        let this = Arc::clone(&self);
        actions.add("mineBlocks", move |args: MineBlocksArgs, token: InterruptToken| {
            let this = Arc::clone(&this);
            async move { this.mine_blocks(args, &token).await }
        });

        let this = Arc::clone(&self);
        actions.add("dig", move |args: DigArgs, token: InterruptToken| {
            let this = Arc::clone(&this);
            async move { this.dig(BlockPos::new(args.x, args.y, args.z), &token).await }
        });

        let this = self;
        actions.add(
            "collectBlock",
            move |args: CollectBlockArgs, token: InterruptToken| {
                let this = Arc::clone(&this);
                async move {
                    if args.reset_and_apply_movements {
                        this.mover()?
                            .reset_and_apply_movements(args.movements.as_ref())?;
                    }
                    this.collect_block(&args.block_name, args.count, &token)
                        .await
                }
            },
        );
    }
}
