//! Session module (`mbot`): leave the game, chat, report status.

use crate::error::Result;
use crate::interrupt::InterruptToken;
use crate::module::{ActionSet, Module, ModuleBase, NoArgs};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = "mbot";

#[derive(Debug, Deserialize)]
pub struct ChatArgs {
    pub message: String,
}

pub struct Session {
    base: ModuleBase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            base: ModuleBase::new(NAME, &[]),
        }
    }

    pub async fn quit(&self) -> Result<()> {
        info!("Leaving the game");
        self.base.agent()?.quit().await
    }

    pub async fn chat(&self, message: &str) -> Result<()> {
        self.base.connection()?.chat(message).await
    }

    /// Notify position, health and food
    pub fn report(&self) -> Result<()> {
        let agent = self.base.agent()?;
        let connection = agent.connection()?;
        agent.ui().notify(&format!(
            "Position {}, health {}, food {}",
            connection.position(),
            connection.health(),
            connection.food()
        ));
        Ok(())
    }
}

impl Module for Session {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn register_actions(self: Arc<Self>, actions: &mut ActionSet) {
        let this = Arc::clone(&self);
        actions.add("quit", move |_: NoArgs, _: InterruptToken| {
            let this = Arc::clone(&this);
            async move { this.quit().await }
        });

        let this = Arc::clone(&self);
        actions.add("chat", move |args: ChatArgs, _: InterruptToken| {
            let this = Arc::clone(&this);
            async move { this.chat(&args.message).await }
        });

        let this = self;
        actions.add("report", move |_: NoArgs, _: InterruptToken| {
            let this = Arc::clone(&this);
            async move { this.report() }
        });
    }
}
