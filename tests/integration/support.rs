//! Shared fixtures: a recording user interface and agents on a fast world.

use mbot::config::{AgentSettings, SimulationConfig};
use mbot::modules::default_registry;
use mbot::ui::UserInterface;
use mbot::world::SimulatedWorld;
use mbot::{AgentContext, BotError, CommandTable};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
pub struct RecordingInterface {
    pub notes: Mutex<Vec<String>>,
    pub logs: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub chat: Mutex<Vec<(String, String)>>,
    pub whispers: Mutex<Vec<(String, String)>>,
}

impl RecordingInterface {
    pub fn notes(&self) -> Vec<String> {
        self.notes.lock().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl UserInterface for RecordingInterface {
    fn notify(&self, message: &str) {
        self.notes.lock().push(message.to_string());
    }

    fn log(&self, message: &str) {
        self.logs.lock().push(message.to_string());
    }

    fn log_error(&self, error: &BotError) {
        self.errors.lock().push(error.to_string());
    }

    fn log_chat_message(&self, username: &str, message: &str) {
        self.chat
            .lock()
            .push((username.to_string(), message.to_string()));
    }

    fn log_whisper(&self, username: &str, message: &str) {
        self.whispers
            .lock()
            .push((username.to_string(), message.to_string()));
    }
}

/// Settings with a 10ms tick and quick digging
pub fn fast_settings() -> AgentSettings {
    AgentSettings {
        simulation: SimulationConfig {
            tick_ms: 10,
            dig_ticks: 2,
            max_path_length: 64,
            demo_world: false,
        },
        ..AgentSettings::default()
    }
}

pub fn world(settings: &AgentSettings) -> SimulatedWorld {
    SimulatedWorld::new(
        &settings.connection.username,
        settings.simulation.clone(),
    )
}

pub fn commands(json: &str) -> CommandTable {
    CommandTable::from_json(json).unwrap()
}

/// Agent with every built-in module, spawned into `world`
pub async fn spawn_agent(
    world: &SimulatedWorld,
    settings: AgentSettings,
    commands: CommandTable,
) -> (Arc<AgentContext>, Arc<RecordingInterface>) {
    let ui = Arc::new(RecordingInterface::default());
    let registry = default_registry(&settings).unwrap();
    let agent =
        AgentContext::assemble(settings, registry, commands, ui.clone() as Arc<dyn UserInterface>)
            .unwrap();
    agent.create_bot(Arc::new(world.clone())).await.unwrap();
    (agent, ui)
}
