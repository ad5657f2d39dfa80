//! CLI Tooling
//!
//! `mbot run` connects a bot to the simulated world and serves console
//! commands. The other subcommands inspect the command table and the
//! built-in modules without connecting.

use crate::agent::AgentContext;
use crate::config::{AgentSettings, ConfigLoader};
use crate::error::BotError;
use crate::instruction::{CommandTable, InstructionCall};
use crate::logging::LoggingConfig;
use crate::module::{ModuleDescriptor, ModuleRegistry};
use crate::modules::default_registry;
use crate::ui::{serve_commands, ConsoleInterface, UserInterface};
use crate::world::SimulatedWorld;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};

/// mbot - Minecraft instruction bot
#[derive(Parser)]
#[command(name = "mbot")]
#[command(about = "Run a bot that executes named instructions, one at a time")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (JSON)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Command table file (defaults to commands.json beside the settings)
    #[arg(long)]
    pub commands: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// `base` with the logging flags applied on top
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.cli_file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the simulated world and read commands from stdin
    Run,
    /// Inspect the command table
    Commands {
        #[command(subcommand)]
        command: CommandsCommands,
    },
    /// List modules, their dependencies and instructions
    Modules {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum CommandsCommands {
    /// List every named command
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Resolve every command against the modules without running it
    Check,
}

/// CLI context for executing commands
pub struct CliContext {
    settings: AgentSettings,
    commands_path: PathBuf,
    /// The command table path was given explicitly and must exist
    commands_required: bool,
}

impl CliContext {
    pub fn new(settings: Option<PathBuf>, commands: Option<PathBuf>) -> Result<Self, BotError> {
        let loaded = ConfigLoader::load(settings.as_deref())?;
        let commands_required = commands.is_some() || loaded.commands_file.is_some();
        let commands_path = commands
            .unwrap_or_else(|| ConfigLoader::commands_path(&loaded, settings.as_deref()));
        Ok(Self {
            settings: loaded,
            commands_path,
            commands_required,
        })
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: &Commands) -> Result<String, BotError> {
        match command {
            Commands::Run => self.handle_run().await,
            Commands::Commands { command } => match command {
                CommandsCommands::List { format } => self.handle_commands_list(format),
                CommandsCommands::Check => self.handle_commands_check(),
            },
            Commands::Modules { format } => self.handle_modules(format),
        }
    }

    fn load_commands(&self) -> Result<CommandTable, BotError> {
        if self.commands_path.is_file() || self.commands_required {
            return CommandTable::load(&self.commands_path);
        }
        warn!(
            path = %self.commands_path.display(),
            "No command table found, starting with no commands"
        );
        Ok(CommandTable::new())
    }

    async fn handle_run(&self) -> Result<String, BotError> {
        let settings = self.settings.clone();
        let registry = default_registry(&settings)?;
        let commands = self.load_commands()?;

        let username = settings.connection.username.clone();
        let simulation = settings.simulation.clone();
        let world = if simulation.demo_world {
            SimulatedWorld::demo(&username, simulation)
        } else {
            SimulatedWorld::new(&username, simulation)
        };

        let ui: Arc<dyn UserInterface> = Arc::new(ConsoleInterface::new(settings.logging.color));
        let agent = AgentContext::assemble(settings, registry, commands, ui)?;
        agent.create_bot(Arc::new(world)).await?;
        info!(username = %username, "Serving console commands");
        agent
            .ui()
            .notify("Type a command name, 'chat <message>', 'help' or 'exit'");

        serve_commands(Arc::clone(&agent), BufReader::new(tokio::io::stdin())).await?;

        if agent.is_connected() {
            agent.quit().await?;
        }
        Ok("Disconnected".to_string())
    }

    fn handle_commands_list(&self, format: &str) -> Result<String, BotError> {
        let commands = self.load_commands()?;
        match format {
            "json" => Ok(format_commands_json(&commands)),
            _ => Ok(format_commands_text(&commands)),
        }
    }

    fn handle_commands_check(&self) -> Result<String, BotError> {
        let commands = self.load_commands()?;
        let registry = default_registry(&self.settings)?;
        Ok(format_check_results(&check_commands(&registry, &commands)))
    }

    fn handle_modules(&self, format: &str) -> Result<String, BotError> {
        let modules = default_registry(&self.settings)?.describe();
        match format {
            "json" => Ok(format_modules_json(&modules)),
            _ => Ok(format_modules_text(&modules)),
        }
    }
}

/// Resolution result per command, in name order
pub fn check_commands(
    registry: &ModuleRegistry,
    commands: &CommandTable,
) -> Vec<(String, Result<(), BotError>)> {
    commands
        .iter()
        .map(|(name, call)| (name.to_string(), registry.prepare(call).map(|_| ())))
        .collect()
}

fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn args_summary(call: &InstructionCall) -> String {
    serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_string())
}

fn format_commands_text(commands: &CommandTable) -> String {
    if commands.is_empty() {
        return "No commands defined.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Name", "Module", "Instruction", "Args"]);
    for (name, call) in commands.iter() {
        table.add_row(vec![
            name.to_string(),
            call.module.clone(),
            call.instruction.clone(),
            args_summary(call),
        ]);
    }
    format!(
        "{}\n{}\n\nTotal: {} command(s)",
        heading("Commands"),
        table,
        commands.len()
    )
}

fn format_commands_json(commands: &CommandTable) -> String {
    let list: Vec<_> = commands
        .iter()
        .map(|(name, call)| {
            json!({
                "name": name,
                "module": call.module,
                "instruction": call.instruction,
                "args": call.args,
            })
        })
        .collect();
    let out = json!({ "commands": list, "total": commands.len() });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
}

fn format_check_results(results: &[(String, Result<(), BotError>)]) -> String {
    if results.is_empty() {
        return "No commands defined.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Name", "Status"]);
    let mut invalid = 0;
    for (name, result) in results {
        let status = match result {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                invalid += 1;
                e.to_string()
            }
        };
        table.add_row(vec![name.clone(), status]);
    }
    let summary = if invalid == 0 {
        format!("{}", "All commands resolve".green())
    } else {
        format!("{}", format!("{} of {} command(s) invalid", invalid, results.len()).red())
    };
    format!("{}\n{}\n\n{}", heading("Command check"), table, summary)
}

fn format_modules_text(modules: &[ModuleDescriptor]) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Module", "Requires", "Instructions"]);
    for module in modules {
        let requires = if module.requires.is_empty() {
            "-".to_string()
        } else {
            module.requires.join(", ")
        };
        table.add_row(vec![
            module.name.clone(),
            requires,
            module.instructions.join(", "),
        ]);
    }
    format!("{}\n{}", heading("Modules"), table)
}

fn format_modules_json(modules: &[ModuleDescriptor]) -> String {
    let out = json!({ "modules": modules, "total": modules.len() });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
}
