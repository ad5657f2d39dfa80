use super::support::{commands, fast_settings, spawn_agent, world};
use mbot::config::AgentSettings;
use mbot::instruction::ManagerState;
use mbot::types::BlockPos;
use mbot::world::GameConnection;
use mbot::InstructionOutcome;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_new_command_interrupts_navigation() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let traveller = Arc::clone(&agent);
    let travel = tokio::spawn(async move {
        traveller
            .dispatch_value(&json!({
                "module": "mover",
                "instruction": "gotoPosition",
                "args": {"x": 40, "y": 0, "z": 0}
            }))
            .await
    });

    sleep(Duration::from_millis(55)).await;
    assert_eq!(agent.manager().state(), ManagerState::Running);
    assert_eq!(
        agent.manager().current_instruction().as_deref(),
        Some("mover.gotoPosition")
    );

    let outcome = agent
        .dispatch_value(&json!({"module": "utility", "instruction": "wait", "args": {"milliseconds": 10}}))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);

    assert_eq!(travel.await.unwrap().unwrap(), InstructionOutcome::Interrupted);
    assert_eq!(ui.errors(), vec!["goto Interrupted"]);
    assert!(!world.navigator().is_moving());
    assert!(world.position().x < 40);
    assert_eq!(agent.manager().state(), ManagerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_new_command_stops_digging() {
    let settings = AgentSettings {
        simulation: mbot::config::SimulationConfig {
            dig_ticks: 100,
            ..fast_settings().simulation
        },
        ..fast_settings()
    };
    let world = world(&settings);
    world.place_block(BlockPos::new(1, 0, 0), "dirt");
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let digger = Arc::clone(&agent);
    let dig = tokio::spawn(async move {
        digger
            .dispatch_value(&json!({"module": "miner", "instruction": "dig", "args": {"x": 1, "y": 0, "z": 0}}))
            .await
    });

    sleep(Duration::from_millis(100)).await;
    let outcome = agent
        .dispatch_value(&json!({"module": "mbot", "instruction": "report"}))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);

    assert_eq!(dig.await.unwrap().unwrap(), InstructionOutcome::Interrupted);
    assert_eq!(ui.errors(), vec!["dig Interrupted"]);
    assert!(world.block_at(BlockPos::new(1, 0, 0)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_commands_runs_only_the_last_to_completion() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;

    let mut tasks = Vec::new();
    for ms in [500u64, 400, 300, 50] {
        let agent = Arc::clone(&agent);
        tasks.push(tokio::spawn(async move {
            agent
                .dispatch_value(&json!({"module": "utility", "instruction": "wait", "args": {"milliseconds": ms}}))
                .await
        }));
        sleep(Duration::from_millis(5)).await;
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.unwrap().unwrap());
    }
    assert_eq!(
        outcomes,
        vec![
            InstructionOutcome::Interrupted,
            InstructionOutcome::Interrupted,
            InstructionOutcome::Interrupted,
            InstructionOutcome::Completed,
        ]
    );
    assert_eq!(agent.manager().state(), ManagerState::Idle);
}
