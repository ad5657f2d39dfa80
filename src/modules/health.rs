//! Health module: auto-eat and leaving the game before dying.

use crate::agent::AgentContext;
use crate::config::HealthConfig;
use crate::error::Result;
use crate::interrupt::InterruptToken;
use crate::module::{ActionSet, Module, ModuleBase};
use crate::world::{AutoEatOptions, GameConnection, WorldEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const NAME: &str = "health";

/// Health at or above which eating can wait longer
const HEALTHY: f32 = 18.0;

#[derive(Debug, Deserialize)]
pub struct ExitBeforeDeathArgs {
    pub set: bool,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    10.0
}

#[derive(Debug, Deserialize)]
pub struct AutoEatArgs {
    pub set: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthState {
    pub auto_eat: bool,
    pub exit_before_death: bool,
    pub exit_threshold: f32,
    /// A quit has already been dispatched for this session
    pub quitting: bool,
}

pub struct Health {
    base: ModuleBase,
    state: Arc<Mutex<HealthState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Health {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            base: ModuleBase::new(NAME, &[]),
            state: Arc::new(Mutex::new(HealthState {
                auto_eat: config.auto_eat,
                exit_before_death: config.exit_before_death,
                exit_threshold: config.exit_threshold,
                quitting: false,
            })),
            listener: Mutex::new(None),
        }
    }

    pub fn state(&self) -> HealthState {
        self.state.lock().clone()
    }

    pub fn set_exit_before_death(&self, set: bool, threshold: f32) {
        let mut state = self.state.lock();
        state.exit_before_death = set;
        state.exit_threshold = threshold;
    }

    /// Turn auto-eat on or off, applying it right away when connected
    pub fn set_auto_eat(&self, set: bool) {
        self.state.lock().auto_eat = set;
        if let Ok(connection) = self.base.connection() {
            let health = connection.health();
            apply_auto_eat(connection.as_ref(), set, health);
        }
    }
}

/// Eat sooner when hurt
fn auto_eat_options(health: f32) -> AutoEatOptions {
    if health >= HEALTHY {
        AutoEatOptions::starting_at(14.0)
    } else {
        AutoEatOptions::starting_at(19.0)
    }
}

fn apply_auto_eat(connection: &dyn GameConnection, enabled: bool, health: f32) {
    connection.set_auto_eat(enabled.then(|| auto_eat_options(health)));
}

fn on_health(
    agent: &Arc<AgentContext>,
    connection: &dyn GameConnection,
    state: &Mutex<HealthState>,
    health: f32,
) {
    agent.ui().log(&format!("Health: {}", health));

    let (auto_eat, quit) = {
        let mut state = state.lock();
        let quit = state.exit_before_death && health < state.exit_threshold && !state.quitting;
        if quit {
            state.quitting = true;
        }
        (state.auto_eat, quit)
    };
    apply_auto_eat(connection, auto_eat, health);

    if quit {
        agent.ui().notify("Bot low in health, quitting");
        let agent = Arc::clone(agent);
        tokio::spawn(async move {
            let call = json!({"module": super::session::NAME, "instruction": "quit"});
            if let Err(e) = agent.dispatch_value(&call).await {
                agent.ui().log_error(&e);
            }
        });
    }
}

async fn listen(
    agent: Weak<AgentContext>,
    connection: Arc<dyn GameConnection>,
    mut events: broadcast::Receiver<WorldEvent>,
    state: Arc<Mutex<HealthState>>,
) {
    loop {
        match events.recv().await {
            Ok(WorldEvent::Health { health, .. }) => {
                let Some(agent) = agent.upgrade() else {
                    break;
                };
                on_health(&agent, connection.as_ref(), &state, health);
            }
            Ok(WorldEvent::End { .. }) | Err(RecvError::Closed) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Health listener lagged");
            }
        }
    }
    debug!("Health listener stopped");
}

#[async_trait]
impl Module for Health {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    async fn on_spawn(&self) -> Result<()> {
        let agent = self.base.agent()?;
        let connection = agent.connection()?;
        self.state.lock().quitting = false;

        let auto_eat = self.state.lock().auto_eat;
        apply_auto_eat(connection.as_ref(), auto_eat, connection.health());

        let events = connection.subscribe();
        let task = tokio::spawn(listen(
            Arc::downgrade(&agent),
            connection,
            events,
            Arc::clone(&self.state),
        ));
        if let Some(previous) = self.listener.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn register_actions(self: Arc<Self>, actions: &mut ActionSet) {
        let this = Arc::clone(&self);
        actions.add(
            "exitBeforeDeath",
            move |args: ExitBeforeDeathArgs, _: InterruptToken| {
                let this = Arc::clone(&this);
                async move {
                    this.set_exit_before_death(args.set, args.threshold);
                    Ok(())
                }
            },
        );

        let this = self;
        actions.add("autoEat", move |args: AutoEatArgs, _: InterruptToken| {
            let this = Arc::clone(&this);
            async move {
                this.set_auto_eat(args.set);
                Ok(())
            }
        });
    }
}

impl Drop for Health {
    fn drop(&mut self) {
        if let Some(task) = self.listener.get_mut().take() {
            task.abort();
        }
    }
}
