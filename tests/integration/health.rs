use super::support::{commands, fast_settings, spawn_agent, world};
use mbot::config::{AgentSettings, HealthConfig};
use mbot::world::GameConnection;
use mbot::InstructionOutcome;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

fn exit_early() -> AgentSettings {
    AgentSettings {
        health: HealthConfig {
            exit_before_death: true,
            exit_threshold: 10.0,
            ..HealthConfig::default()
        },
        ..fast_settings()
    }
}

#[tokio::test(start_paused = true)]
async fn test_low_health_quits() {
    let settings = exit_early();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    world.set_health(12.0, 20.0);
    sleep(Duration::from_millis(20)).await;
    assert!(world.is_joined());

    world.set_health(8.0, 20.0);
    sleep(Duration::from_millis(20)).await;

    assert!(!world.is_joined());
    assert!(!agent.is_connected());
    assert_eq!(ui.notes(), vec!["Bot low in health, quitting"]);
    assert!(ui.logs().contains(&"Health: 8".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_low_health_interrupts_running_instruction() {
    let settings = exit_early();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let runner = std::sync::Arc::clone(&agent);
    let wait = tokio::spawn(async move {
        runner
            .dispatch_value(&json!({"module": "utility", "instruction": "wait", "args": {"milliseconds": 5000}}))
            .await
    });
    sleep(Duration::from_millis(20)).await;

    world.set_health(3.0, 20.0);
    assert_eq!(wait.await.unwrap().unwrap(), InstructionOutcome::Interrupted);
    sleep(Duration::from_millis(20)).await;

    assert!(!world.is_joined());
    assert_eq!(ui.errors(), vec!["wait Interrupted"]);
}

#[tokio::test(start_paused = true)]
async fn test_auto_eat_tracks_health() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;
    assert_eq!(world.auto_eat().map(|o| o.start_at), Some(14.0));

    world.set_health(11.0, 12.0);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(world.auto_eat().map(|o| o.start_at), Some(19.0));

    world.set_health(19.0, 12.0);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(world.auto_eat().map(|o| o.start_at), Some(14.0));

    let outcome = agent
        .dispatch_value(&json!({"module": "health", "instruction": "autoEat", "args": {"set": false}}))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert!(world.auto_eat().is_none());

    world.set_health(5.0, 2.0);
    sleep(Duration::from_millis(20)).await;
    assert!(world.auto_eat().is_none());
    // exit-before-death is off by default
    assert!(world.is_joined());
}

#[tokio::test(start_paused = true)]
async fn test_exit_before_death_instruction() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = agent
        .dispatch_value(&json!({
            "module": "health",
            "instruction": "exitBeforeDeath",
            "args": {"set": true, "threshold": 15}
        }))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);

    world.set_health(14.0, 20.0);
    sleep(Duration::from_millis(20)).await;
    assert!(!world.is_joined());
}
