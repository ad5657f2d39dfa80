//! Agent context
//!
//! Owns everything one bot needs: settings, the module registry, the command
//! table, the user interface, the instruction manager and the current game
//! connection. Modules hold a weak reference back to it.

use crate::config::AgentSettings;
use crate::error::{BotError, Result};
use crate::instruction::{CommandTable, InstructionCall, InstructionManager, InstructionOutcome};
use crate::module::{Module, ModuleRegistry};
use crate::ui::UserInterface;
use crate::world::{GameConnection, WorldEvent};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct AgentContext {
    settings: AgentSettings,
    registry: Arc<ModuleRegistry>,
    commands: Arc<CommandTable>,
    ui: Arc<dyn UserInterface>,
    manager: InstructionManager,
    connection: RwLock<Option<Arc<dyn GameConnection>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl AgentContext {
    /// Build the context and mount every registered module on it
    pub fn assemble(
        settings: AgentSettings,
        registry: ModuleRegistry,
        commands: CommandTable,
        ui: Arc<dyn UserInterface>,
    ) -> Result<Arc<Self>> {
        let registry = Arc::new(registry);
        let commands = Arc::new(commands);
        let manager = InstructionManager::new(
            Arc::clone(&registry),
            Arc::clone(&commands),
            Arc::clone(&ui),
        );
        let agent = Arc::new(Self {
            settings,
            registry,
            commands,
            ui,
            manager,
            connection: RwLock::new(None),
            forwarder: Mutex::new(None),
        });

        for module in agent.registry.modules() {
            module.mount(&agent)?;
        }
        debug!(modules = agent.registry.len(), commands = agent.commands.len(), "Agent assembled");
        Ok(agent)
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    pub fn ui(&self) -> &Arc<dyn UserInterface> {
        &self.ui
    }

    pub fn manager(&self) -> &InstructionManager {
        &self.manager
    }

    pub fn connection(&self) -> Result<Arc<dyn GameConnection>> {
        self.connection.read().clone().ok_or(BotError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Enter the world through `connection`.
    ///
    /// Runs every module's creation hook (any failure aborts), joins, waits
    /// for the spawn event, runs the spawn hooks and starts forwarding chat
    /// to the user interface.
    pub async fn create_bot(self: &Arc<Self>, connection: Arc<dyn GameConnection>) -> Result<()> {
        *self.connection.write() = Some(Arc::clone(&connection));
        if let Err(e) = self.start(&connection).await {
            error!(error = %e, "Could not create bot");
            self.connection.write().take();
            return Err(e);
        }
        self.ui.log("Spawned");
        Ok(())
    }

    async fn start(&self, connection: &Arc<dyn GameConnection>) -> Result<()> {
        let modules: Vec<Arc<dyn Module>> = self.registry.modules().cloned().collect();
        for module in &modules {
            module.on_create_bot(&self.registry)?;
        }

        let mut events = connection.subscribe();
        connection.join().await?;
        wait_for_spawn(&mut events).await?;

        for module in &modules {
            module.on_spawn().await?;
        }

        let task = tokio::spawn(forward_chat(
            connection.username(),
            connection.subscribe(),
            Arc::clone(&self.ui),
        ));
        if let Some(previous) = self.forwarder.lock().replace(task) {
            previous.abort();
        }
        info!(username = %connection.username(), "Bot created");
        Ok(())
    }

    /// Leave the world and drop the connection
    pub async fn quit(&self) -> Result<()> {
        let connection = self.connection.write().take().ok_or(BotError::NotConnected)?;
        connection.quit().await
    }

    /// Run the command stored under `name`
    pub async fn dispatch(&self, name: &str) -> Result<InstructionOutcome> {
        self.manager.dispatch_command(name).await
    }

    pub async fn dispatch_call(&self, call: InstructionCall) -> Result<InstructionOutcome> {
        self.manager.dispatch_call(call).await
    }

    pub async fn dispatch_value(&self, contents: &Value) -> Result<InstructionOutcome> {
        self.manager.dispatch_value(contents).await
    }
}

impl Drop for AgentContext {
    fn drop(&mut self) {
        if let Some(task) = self.forwarder.get_mut().take() {
            task.abort();
        }
    }
}

async fn wait_for_spawn(events: &mut broadcast::Receiver<WorldEvent>) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(WorldEvent::Spawn) => return Ok(()),
            Ok(WorldEvent::End { reason }) => {
                return Err(BotError::ActionFailed(format!(
                    "Connection ended before spawning: {}",
                    reason
                )))
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed events while joining"),
            Err(RecvError::Closed) => return Err(BotError::NotConnected),
        }
    }
}

/// Chat and whispers from other players go to the user interface
async fn forward_chat(
    own_name: String,
    mut events: broadcast::Receiver<WorldEvent>,
    ui: Arc<dyn UserInterface>,
) {
    loop {
        match events.recv().await {
            Ok(WorldEvent::Chat { username, message }) if username != own_name => {
                ui.log_chat_message(&username, &message)
            }
            Ok(WorldEvent::Whisper { username, message }) if username != own_name => {
                ui.log_whisper(&username, &message)
            }
            Ok(WorldEvent::End { reason }) => {
                debug!(%reason, "Connection ended");
                break;
            }
            Err(RecvError::Closed) => break,
            _ => {}
        }
    }
}
