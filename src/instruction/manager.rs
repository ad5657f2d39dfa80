//! Instruction Manager
//!
//! Runs at most one instruction at a time. A dispatch that arrives while an
//! instruction is running raises the shared interrupt, waits for the running
//! instruction to settle and acknowledge, and only then starts its own
//! instruction. Further dispatches queue behind that handshake in arrival
//! order.
//!
//! Instruction failures (interruptions included) are reported through
//! [`UserInterface::log_error`] and never reach the dispatch caller, who gets
//! an [`InstructionOutcome`] instead. Only resolution errors are returned.

use super::{CommandTable, InstructionCall};
use crate::error::Result;
use crate::interrupt::{InterruptHandle, InterruptToken};
use crate::module::ModuleRegistry;
use crate::ui::UserInterface;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Observable manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Nothing running
    Idle,
    /// An instruction is running
    Running,
    /// An interrupt is outstanding; the running instruction has not settled yet
    Interrupting,
}

/// How a dispatched instruction settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionOutcome {
    Completed,
    /// Preempted by a later dispatch
    Interrupted,
    /// Failed with the given message (already reported through the UI)
    Failed(String),
}

#[derive(Debug, Default)]
struct Busy {
    doing_instruction: bool,
    current: Option<String>,
}

/// Single-flight executor for instruction calls
pub struct InstructionManager {
    registry: Arc<ModuleRegistry>,
    commands: Arc<CommandTable>,
    ui: Arc<dyn UserInterface>,
    /// One token for the manager's lifetime, reset by each acknowledgement
    interrupt: InterruptToken,
    busy: Mutex<Busy>,
    /// Serialises the start of instructions; FIFO
    turn: tokio::sync::Mutex<()>,
}

impl InstructionManager {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        commands: Arc<CommandTable>,
        ui: Arc<dyn UserInterface>,
    ) -> Self {
        Self {
            registry,
            commands,
            ui,
            interrupt: InterruptToken::new(),
            busy: Mutex::new(Busy::default()),
            turn: tokio::sync::Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    pub fn interrupt(&self) -> &InterruptToken {
        &self.interrupt
    }

    pub fn doing_instruction(&self) -> bool {
        self.busy.lock().doing_instruction
    }

    /// Label of the running instruction, if any
    pub fn current_instruction(&self) -> Option<String> {
        self.busy.lock().current.clone()
    }

    pub fn state(&self) -> ManagerState {
        let busy = self.busy.lock();
        if !busy.doing_instruction {
            ManagerState::Idle
        } else if self.interrupt.has_interrupt() {
            ManagerState::Interrupting
        } else {
            ManagerState::Running
        }
    }

    /// Run the call stored under `name` in the command table
    pub async fn dispatch_command(&self, name: &str) -> Result<InstructionOutcome> {
        let call = self.commands.get(name)?.clone();
        debug!(command = name, instruction = %call, "Resolved command");
        self.dispatch_call(call).await
    }

    /// Run a call given as raw JSON contents
    pub async fn dispatch_value(&self, contents: &Value) -> Result<InstructionOutcome> {
        let call = InstructionCall::from_value(contents)?;
        self.dispatch_call(call).await
    }

    /// Run a call, preempting whatever is running.
    ///
    /// Resolves once the call's own instruction settles.
    pub async fn dispatch_call(&self, call: InstructionCall) -> Result<InstructionOutcome> {
        // Resolution failures leave the state and the token untouched.
        let prepared = self.registry.prepare(&call)?;
        let label = call.label();

        let settle = {
            let _turn = self.turn.lock().await;

            let handshake = {
                let mut busy = self.busy.lock();
                if busy.doing_instruction {
                    Some(self.interrupt.arm())
                } else {
                    busy.doing_instruction = true;
                    None
                }
            };

            if let Some(handle) = handshake {
                info!(
                    instruction = %label,
                    interrupting = ?self.current_instruction(),
                    "Interrupting running instruction"
                );
                let mut handoff = Handoff {
                    busy: &self.busy,
                    handle: Some(handle),
                };
                self.interrupt.fire_stop_callback();
                handoff.wait().await;
            }

            self.busy.lock().current = Some(label.clone());
            Settle { manager: self }
        };

        info!(instruction = %label, "Starting instruction");
        let result = prepared(self.interrupt.clone()).await;

        let outcome = match result {
            Ok(()) => {
                debug!(instruction = %label, "Instruction completed");
                InstructionOutcome::Completed
            }
            Err(err) => {
                self.ui.log_error(&err);
                if err.is_interrupted() {
                    InstructionOutcome::Interrupted
                } else {
                    InstructionOutcome::Failed(err.to_string())
                }
            }
        };

        drop(settle);
        Ok(outcome)
    }
}

impl std::fmt::Debug for InstructionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionManager")
            .field("state", &self.state())
            .field("current", &self.current_instruction())
            .finish()
    }
}

/// Settles the manager when the running instruction ends or its dispatch is dropped.
struct Settle<'a> {
    manager: &'a InstructionManager,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let manager = self.manager;
        let mut busy = manager.busy.lock();
        busy.current = None;
        manager.interrupt.clear_on_interrupt();

        // An outstanding interrupt means a dispatcher is waiting; busy passes to it.
        if manager.interrupt.has_interrupt() {
            if !manager.interrupt.acknowledge() {
                busy.doing_instruction = false;
            }
        } else {
            busy.doing_instruction = false;
        }
    }
}

/// Pending interrupt handshake of a preempting dispatch.
///
/// If the dispatch is dropped after the acknowledgement was delivered, busy
/// was already handed over and is released here.
struct Handoff<'a> {
    busy: &'a Mutex<Busy>,
    handle: Option<InterruptHandle>,
}

impl Handoff<'_> {
    async fn wait(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.await;
        }
        self.handle = None;
    }
}

impl Drop for Handoff<'_> {
    fn drop(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        // Acknowledgement is sent under this lock, so either it already
        // arrived or it finds the receiver gone.
        let mut busy = self.busy.lock();
        if handle.try_delivered() {
            busy.doing_instruction = false;
            busy.current = None;
        }
        drop(handle);
    }
}
