use super::support::{commands, fast_settings, spawn_agent, world};
use mbot::instruction::InstructionOutcome;
use mbot::ui::serve_commands;
use mbot::world::{GameConnection, WorldEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn test_console_dispatches_named_commands() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(
        &world,
        settings,
        commands(r#"{"report": {"module": "mbot", "instruction": "report"}}"#),
    )
    .await;
    let mut events = world.subscribe();

    let input: &[u8] = b"help\n\nreport\nchat hello there\nfly\nexit\nreport\n";
    serve_commands(Arc::clone(&agent), input).await.unwrap();

    let notes = ui.notes();
    assert_eq!(notes[0], "Commands: report");
    assert_eq!(
        notes
            .iter()
            .filter(|n| *n == "Finished command report")
            .count(),
        1
    );
    assert_eq!(ui.errors(), vec!["Invalid Command Name: fly"]);

    let mut said = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WorldEvent::Chat { username, message } = event {
            said.push((username, message));
        }
    }
    assert_eq!(said, vec![("mbot".to_string(), "hello there".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_console_chat_requires_connection() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;
    agent.quit().await.unwrap();

    let input: &[u8] = b"chat anyone there?\n";
    serve_commands(Arc::clone(&agent), input).await.unwrap();

    assert_eq!(ui.errors(), vec!["Action failed: Could not send message"]);
}

#[tokio::test(start_paused = true)]
async fn test_console_exit_interrupts_running_instruction() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(
        &world,
        settings,
        commands(
            r#"{"nap": {"module": "utility", "instruction": "wait",
                "args": {"milliseconds": 600000}}}"#,
        ),
    )
    .await;

    let started = Instant::now();
    let nap = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.dispatch("nap").await })
    };
    while !agent.manager().doing_instruction() {
        sleep(Duration::from_millis(1)).await;
    }

    let input: &[u8] = b"exit\n";
    serve_commands(Arc::clone(&agent), input).await.unwrap();

    assert_eq!(nap.await.unwrap().unwrap(), InstructionOutcome::Interrupted);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!agent.is_connected());
    assert!(!world.is_joined());
    assert_eq!(ui.errors(), vec!["wait Interrupted"]);
}
