//! Mover module: owns the movement rules and drives the navigator.

use super::utility::{self, Utility};
use crate::error::Result;
use crate::interrupt::InterruptToken;
use crate::module::{ActionSet, Module, ModuleBase, NoArgs};
use crate::types::{Block, BlockPos};
use crate::world::{BlockQuery, Goal, Movements, MovementsSettings};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "mover";

#[derive(Debug, Deserialize)]
pub struct GotoPositionArgs {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Zero means the exact block
    #[serde(default)]
    pub range: f64,
}

pub struct Mover {
    base: ModuleBase,
    movements: Mutex<Movements>,
}

impl Default for Mover {
    fn default() -> Self {
        Self::new()
    }
}

impl Mover {
    pub fn new() -> Self {
        Self {
            base: ModuleBase::new(NAME, &[utility::NAME]),
            movements: Mutex::new(Movements::default()),
        }
    }

    pub fn movements(&self) -> Movements {
        self.movements.lock().clone()
    }

    /// Hand the stored movements to the navigator
    pub fn apply_movements(&self) -> Result<()> {
        let movements = self.movements();
        self.base.connection()?.navigator().set_movements(movements);
        Ok(())
    }

    /// Replace the stored movements with the defaults plus `settings`.
    /// Nothing changes if `settings` is invalid.
    pub fn set_movements(&self, settings: &MovementsSettings) -> Result<()> {
        let mut movements = Movements::default();
        movements.apply(settings)?;
        debug!(?movements, "Movements updated");
        *self.movements.lock() = movements;
        Ok(())
    }

    pub fn reset_and_apply_movements(&self, settings: Option<&MovementsSettings>) -> Result<()> {
        self.set_movements(settings.unwrap_or(&MovementsSettings::default()))?;
        self.apply_movements()
    }

    /// Travel until `goal` is satisfied.
    ///
    /// An interrupt stops the navigator; the resulting failure is reported as
    /// an interruption.
    pub async fn goto(&self, goal: Goal, token: &InterruptToken) -> Result<()> {
        token.fail_if_interrupted("goto")?;
        let navigator = self.base.connection()?.navigator();

        let stopper = Arc::clone(&navigator);
        let _stop = token.stop_guard(move || stopper.stop());

        debug!(?goal, "Navigating");
        if let Err(e) = navigator.goto(goal).await {
            token.fail_if_interrupted("goto")?;
            return Err(e);
        }
        Ok(())
    }

    /// Block search limited to blocks the current movements may break
    pub fn find_safe_to_break_blocks(&self, query: BlockQuery) -> Result<Vec<Block>> {
        let movements = self.movements();
        let query = query.filter(move |block| movements.safe_to_break(block));
        self.utility()?.find_blocks(&query)
    }

    fn utility(&self) -> Result<Arc<Utility>> {
        self.base
            .agent()?
            .registry()
            .capability::<Utility>(utility::NAME)
    }
}

#[async_trait]
impl Module for Mover {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    async fn on_spawn(&self) -> Result<()> {
        self.apply_movements()
    }

    fn register_actions(self: Arc<Self>, actions: &mut ActionSet) {
        let this = Arc::clone(&self);
        actions.add("applyMovements", move |_: NoArgs, _: InterruptToken| {
            let this = Arc::clone(&this);
            async move { this.apply_movements() }
        });

        let this = Arc::clone(&self);
        actions.add(
            "setMovements",
            move |settings: MovementsSettings, _: InterruptToken| {
                let this = Arc::clone(&this);
                async move { this.reset_and_apply_movements(Some(&settings)) }
            },
        );

        let this = self;
        actions.add(
            "gotoPosition",
            move |args: GotoPositionArgs, token: InterruptToken| {
                let this = Arc::clone(&this);
                async move {
                    let pos = BlockPos::new(args.x, args.y, args.z);
                    let goal = if args.range <= 0.0 {
                        Goal::Block(pos)
                    } else {
                        Goal::Near {
                            pos,
                            range: args.range,
                        }
                    };
                    this.goto(goal, &token).await
                }
            },
        );
    }
}
