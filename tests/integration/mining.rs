use super::support::{commands, fast_settings, spawn_agent, world};
use mbot::types::{BlockPos, ItemStack};
use mbot::world::{GameConnection, SimulatedWorld};
use mbot::config::AgentSettings;
use mbot::{AgentContext, InstructionOutcome};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Bot at (0, 1, 0) above a row of stone
fn quarry(settings: &AgentSettings) -> SimulatedWorld {
    let world = world(settings);
    for x in 0..3 {
        world.place_block(BlockPos::new(x, 0, 0), "stone");
    }
    world.teleport(BlockPos::new(0, 1, 0));
    world
}

fn mine(args: Value) -> Value {
    json!({"module": "miner", "instruction": "mineBlocks", "args": args})
}

fn count_of(world: &SimulatedWorld, item: &str) -> u32 {
    world
        .inventory()
        .iter()
        .find(|stack| stack.name == item)
        .map_or(0, |stack| stack.count)
}

async fn dispatch(agent: &Arc<AgentContext>, contents: Value) -> InstructionOutcome {
    agent.dispatch_value(&contents).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_mine_blocks_digs_and_collects() {
    let settings = fast_settings();
    let world = quarry(&settings);
    world.give(ItemStack::new("iron_pickaxe", 1));
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = dispatch(
        &agent,
        mine(json!({
            "findBlocksOptions": {"matching": "stone", "maxDistance": 8},
            "numberOfBlocksToMine": 2
        })),
    )
    .await;
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert!(ui.errors().is_empty());

    assert!(world.block_at(BlockPos::new(0, 0, 0)).is_none());
    assert!(world.block_at(BlockPos::new(1, 0, 0)).is_none());
    assert!(world.block_at(BlockPos::new(2, 0, 0)).is_some());
    assert_eq!(count_of(&world, "stone"), 2);
    assert_eq!(world.held_item().map(|i| i.name), Some("iron_pickaxe".to_string()));

    let logs = ui.logs();
    assert!(logs.contains(&"Moving to mine block at position (0, 0, 0)".to_string()));
    assert_eq!(logs.iter().filter(|l| *l == "Finished digging block").count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mine_blocks_respects_height_window() {
    let settings = fast_settings();
    let world = quarry(&settings);
    world.place_block(BlockPos::new(0, 2, 1), "stone");
    world.give(ItemStack::new("iron_pickaxe", 1));
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = dispatch(
        &agent,
        mine(json!({
            "findBlocksOptions": {"matching": ["stone"]},
            "numberOfBlocksToMine": 1,
            "minHeight": 2
        })),
    )
    .await;
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert!(world.block_at(BlockPos::new(0, 2, 1)).is_none());
    assert!(world.block_at(BlockPos::new(0, 0, 0)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_mine_blocks_without_matches() {
    let settings = fast_settings();
    let world = quarry(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = dispatch(&agent, mine(json!({"findBlocksOptions": {"matching": "iron_ore"}}))).await;
    assert_eq!(
        outcome,
        InstructionOutcome::Failed("Could not find any blocks of that type".to_string())
    );

    let outcome = dispatch(&agent, mine(json!({"findBlocksOptions": {"matching": "unobtainium"}}))).await;
    assert_eq!(
        outcome,
        InstructionOutcome::Failed("Invalid Block Name: unobtainium".to_string())
    );
    assert_eq!(ui.errors().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unbreakable_blocks_are_filtered() {
    let settings = fast_settings();
    let world = world(&settings);
    world.place_block(BlockPos::new(0, -1, 0), "bedrock");
    let (agent, _ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = dispatch(&agent, mine(json!({"findBlocksOptions": {"matching": "bedrock"}}))).await;
    assert_eq!(
        outcome,
        InstructionOutcome::Failed("Could not find any blocks of that type".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_block_failures_are_logged_and_skipped() {
    let settings = fast_settings();
    let world = quarry(&settings);
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    // No pickaxe: the only block found cannot be harvested.
    let outcome = dispatch(&agent, mine(json!({"findBlocksOptions": {"matching": "stone"}}))).await;
    assert!(matches!(outcome, InstructionOutcome::Failed(_)));
    assert_eq!(
        ui.errors()[0],
        "No tool to harvest block stone".to_string()
    );
    assert_eq!(ui.errors().len(), 2);
    assert!(world.block_at(BlockPos::new(0, 0, 0)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_mining_is_interruptible() {
    let settings = AgentSettings {
        simulation: mbot::config::SimulationConfig {
            dig_ticks: 100,
            ..fast_settings().simulation
        },
        ..fast_settings()
    };
    let world = quarry(&settings);
    world.give(ItemStack::new("iron_pickaxe", 1));
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let miner = Arc::clone(&agent);
    let mining = tokio::spawn(async move {
        dispatch(&miner, mine(json!({"findBlocksOptions": {"matching": "stone"}}))).await
    });
    sleep(Duration::from_millis(200)).await;

    let outcome = dispatch(&agent, json!({"module": "mbot", "instruction": "report"})).await;
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert_eq!(mining.await.unwrap(), InstructionOutcome::Interrupted);
    assert_eq!(ui.errors(), vec!["mineBlocks Interrupted"]);
    assert!(world.block_at(BlockPos::new(0, 0, 0)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_collect_block_follows_dropped_items() {
    let settings = fast_settings();
    let world = world(&settings);
    world.drop_item(BlockPos::new(3, 0, 0), "dirt");
    world.drop_item(BlockPos::new(6, 0, 0), "dirt");
    world.drop_item(BlockPos::new(0, 0, 9), "sand");
    let (agent, ui) = spawn_agent(&world, settings, commands("{}")).await;

    let outcome = dispatch(
        &agent,
        json!({"module": "miner", "instruction": "collectBlock", "args": {"blockName": "dirt"}}),
    )
    .await;
    assert_eq!(outcome, InstructionOutcome::Completed);
    assert_eq!(count_of(&world, "dirt"), 2);
    assert_eq!(count_of(&world, "sand"), 0);

    let logs = ui.logs();
    assert_eq!(logs.iter().filter(|l| *l == "Collected one entity").count(), 2);
    assert_eq!(logs.last().map(String::as_str), Some("There is no entity, we are finished"));
    assert!(!world.navigator().is_moving());
}
