//! At most one instruction runs at a time, whatever the arrival pattern.

use super::support::RecordingInterface;
use mbot::instruction::ManagerState;
use mbot::module::{ActionSet, Module, ModuleBase};
use mbot::{CommandTable, InstructionCall, InstructionManager, InstructionOutcome, InterruptToken, ModuleRegistry};
use proptest::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Occupancy {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Deserialize)]
struct WorkArgs {
    ms: u64,
}

struct Probe {
    base: ModuleBase,
    occupancy: Arc<Occupancy>,
}

impl Module for Probe {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn register_actions(self: Arc<Self>, actions: &mut ActionSet) {
        let occupancy = Arc::clone(&self.occupancy);
        actions.add("work", move |args: WorkArgs, token: InterruptToken| {
            let occupancy = Arc::clone(&occupancy);
            async move {
                let now = occupancy.active.fetch_add(1, Ordering::SeqCst) + 1;
                occupancy.peak.fetch_max(now, Ordering::SeqCst);
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(args.ms)) => {}
                    _ = token.interrupted() => {}
                }
                occupancy.active.fetch_sub(1, Ordering::SeqCst);
                token.fail_if_interrupted("work")
            }
        });
    }
}

fn run_burst(jobs: Vec<(u64, u64)>) -> (usize, Vec<InstructionOutcome>, ManagerState) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let occupancy = Arc::new(Occupancy::default());
        let registry = ModuleRegistry::builder()
            .register(Arc::new(Probe {
                base: ModuleBase::new("probe", &[]),
                occupancy: Arc::clone(&occupancy),
            }))
            .build()
            .unwrap();
        let manager = Arc::new(InstructionManager::new(
            Arc::new(registry),
            Arc::new(CommandTable::new()),
            Arc::new(RecordingInterface::default()),
        ));

        let mut tasks = Vec::new();
        for (gap, ms) in jobs {
            tokio::time::sleep(Duration::from_millis(gap)).await;
            let manager = Arc::clone(&manager);
            tasks.push(tokio::spawn(async move {
                manager
                    .dispatch_call(InstructionCall::new("probe", "work", json!({"ms": ms})))
                    .await
            }));
        }

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap().unwrap());
        }
        (occupancy.peak.load(Ordering::SeqCst), outcomes, manager.state())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_single_flight(jobs in prop::collection::vec((0u64..40, 1u64..60), 1..10)) {
        let count = jobs.len();
        let (peak, outcomes, state) = run_burst(jobs);

        prop_assert!(peak <= 1);
        prop_assert_eq!(outcomes.len(), count);
        prop_assert_eq!(outcomes.last(), Some(&InstructionOutcome::Completed));
        prop_assert!(outcomes
            .iter()
            .all(|o| matches!(o, InstructionOutcome::Completed | InstructionOutcome::Interrupted)));
        prop_assert_eq!(state, ManagerState::Idle);
    }
}
