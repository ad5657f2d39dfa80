use super::support::{commands, fast_settings, spawn_agent, world};
use mbot::instruction::ManagerState;
use mbot::types::BlockPos;
use mbot::world::GameConnection;
use mbot::{BotError, InstructionOutcome};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_report_command_notifies_status() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(
        &world,
        settings,
        commands(r#"{"report": {"module": "mbot", "instruction": "report"}}"#),
    )
    .await;

    let outcome = agent.dispatch("report").await.unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert_eq!(ui.notes(), vec!["Position (0, 0, 0), health 20, food 20"]);
    assert_eq!(agent.manager().state(), ManagerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_resolution_errors_reach_the_caller() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let err = agent.dispatch("dance").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid Command Name: dance");

    let err = agent.dispatch_value(&json!(["utility", "wait"])).await.unwrap_err();
    assert!(matches!(err, BotError::InvalidContents(_)));

    let err = agent.dispatch_value(&json!({"module": 7})).await.unwrap_err();
    assert!(matches!(err, BotError::InvalidModuleName));

    let err = agent
        .dispatch_value(&json!({"module": "utility"}))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::InvalidInstructionName));

    let err = agent
        .dispatch_value(&json!({"module": "builder", "instruction": "build"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid Module: builder");

    let err = agent
        .dispatch_value(&json!({"module": "utility", "instruction": "wait", "args": {}}))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::InvalidArgs { .. }));

    assert!(ui.errors().is_empty());
    assert_eq!(agent.manager().state(), ManagerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_goto_position_moves_the_bot() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = agent
        .dispatch_value(&json!({
            "module": "mover",
            "instruction": "gotoPosition",
            "args": {"x": 3, "y": 0, "z": -2}
        }))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert_eq!(world.position(), BlockPos::new(3, 0, -2));
}

#[tokio::test(start_paused = true)]
async fn test_set_movements_reaches_the_navigator() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;
    assert!(world.navigator().movements().can_move_diagonally);

    let outcome = agent
        .dispatch_value(&json!({
            "module": "mover",
            "instruction": "setMovements",
            "args": {"set": {"canMoveDiagonally": false}, "add": {"blocksCantBreak": ["glass"]}}
        }))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);

    let movements = world.navigator().movements();
    assert!(!movements.can_move_diagonally);
    assert!(movements.blocks_cant_break.contains("glass"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_instruction_is_reported_once() {
    let settings = fast_settings();
    let world = world(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = agent
        .dispatch_value(&json!({
            "module": "mover",
            "instruction": "setMovements",
            "args": {"set": {"canFly": true}}
        }))
        .await
        .unwrap();
    assert!(matches!(outcome, InstructionOutcome::Failed(ref m) if m.contains("canFly")));
    assert_eq!(ui.errors().len(), 1);

    let outcome = agent
        .dispatch_value(&json!({"module": "utility", "instruction": "wait", "args": {"milliseconds": 20}}))
        .await
        .unwrap();
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert_eq!(ui.errors().len(), 1);
}
