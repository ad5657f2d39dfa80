use super::support::{commands, fast_settings, spawn_agent, world, RecordingInterface};
use mbot::modules::{Miner, Mover, Utility};
use mbot::ui::UserInterface;
use mbot::world::GameConnection;
use mbot::{AgentContext, BotError, InstructionOutcome, Module, ModuleRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_missing_dependency_prevents_creation() {
    let settings = fast_settings();
    let world = world(&settings);
    let registry = ModuleRegistry::builder()
        .register(Arc::new(Utility::new()))
        .register(Arc::new(Miner::new()))
        .build()
        .unwrap();
    let ui = Arc::new(RecordingInterface::default());
    let agent = AgentContext::assemble(
        settings,
        registry,
        commands("{}"),
        ui as Arc<dyn UserInterface>,
    )
    .unwrap();

    let err = agent.create_bot(Arc::new(world.clone())).await.unwrap_err();
    assert!(matches!(
        err,
        BotError::MissingDependency { ref module, ref required } if module == "miner" && required == "mover"
    ));
    assert!(!world.is_joined());
    assert!(!agent.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_modules_mount_once() {
    let settings = fast_settings();
    let registry = ModuleRegistry::builder()
        .register(Arc::new(Utility::new()))
        .register(Arc::new(Mover::new()))
        .build()
        .unwrap();
    let ui = Arc::new(RecordingInterface::default());
    let agent = AgentContext::assemble(settings, registry, commands("{}"), ui).unwrap();

    let mover = agent.registry().get("mover").unwrap();
    assert!(matches!(
        mover.mount(&agent),
        Err(BotError::AlreadyMounted(ref name)) if name == "mover"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_spawn_runs_module_hooks() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    assert!(world.is_joined());
    assert!(agent.is_connected());
    assert_eq!(ui.logs(), vec!["Spawned"]);
    // health enables auto-eat, mover hands its movements to the navigator
    assert_eq!(world.auto_eat().map(|o| o.start_at), Some(14.0));
    assert_eq!(world.navigator().movements(), mbot::world::Movements::default());
}

#[tokio::test(start_paused = true)]
async fn test_chat_from_others_is_forwarded() {
    let settings = fast_settings();
    let world = world(&settings);
    let (_agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    world.inject_chat("steve", "hello bot");
    world.chat("talking to myself").await.unwrap();
    world.inject_whisper("alex", "psst");
    world.inject_whisper("mbot", "echo");
    sleep(Duration::from_millis(1)).await;

    assert_eq!(
        *ui.chat.lock(),
        vec![("steve".to_string(), "hello bot".to_string())]
    );
    assert_eq!(
        *ui.whispers.lock(),
        vec![("alex".to_string(), "psst".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_quit_command_leaves_the_world() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(
        &world,
        settings,
        commands(
            r#"{
                "quit": {"module": "mbot", "instruction": "quit"},
                "report": {"module": "mbot", "instruction": "report"}
            }"#,
        ),
    )
    .await;

    assert_eq!(agent.dispatch("quit").await.unwrap(), InstructionOutcome::Completed);
    assert!(!world.is_joined());
    assert!(!agent.is_connected());

    let outcome = agent.dispatch("report").await.unwrap();
    assert_eq!(
        outcome,
        InstructionOutcome::Failed("Bot is not connected".to_string())
    );
    assert_eq!(ui.errors(), vec!["Bot is not connected"]);
}
