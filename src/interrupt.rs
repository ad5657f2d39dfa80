//! Interrupt Token
//!
//! Cooperative cancellation and rendezvous between the instruction manager and
//! the instruction it is running. The manager raises an interrupt and awaits
//! the returned [`InterruptHandle`]; the running instruction observes the flag
//! at its own safe suspension points (or through its stop callback), unwinds,
//! and the manager then acknowledges, which releases the handle.
//!
//! Interruption is advisory. An instruction that never checks the token and
//! never yields will hold the agent until it finishes on its own.

use crate::error::BotError;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{oneshot, watch};
use tracing::debug;

/// Hook invoked when an interrupt is requested (e.g. stop the current travel goal)
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

struct TokenState {
    has_interrupt: bool,
    on_interrupt: Option<StopCallback>,
    callee: Option<oneshot::Sender<()>>,
}

struct Inner {
    state: Mutex<TokenState>,
    /// Mirrors `has_interrupt` for async waiters
    flag: watch::Sender<bool>,
}

/// Single-use-per-request cooperative interrupt, reset by [`InterruptToken::acknowledge`].
///
/// Cloning yields another handle to the same token.
#[derive(Clone)]
pub struct InterruptToken {
    inner: Arc<Inner>,
}

impl Default for InterruptToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterruptToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("InterruptToken")
            .field("has_interrupt", &state.has_interrupt)
            .field("has_stop_callback", &state.on_interrupt.is_some())
            .finish()
    }
}

impl InterruptToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(TokenState {
                    has_interrupt: false,
                    on_interrupt: None,
                    callee: None,
                }),
                flag,
            }),
        }
    }

    /// True while a preemption request is outstanding and not yet acknowledged
    pub fn has_interrupt(&self) -> bool {
        self.inner.state.lock().has_interrupt
    }

    /// Install the stop callback, replacing any previous one
    pub fn set_on_interrupt<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().on_interrupt = Some(Arc::new(callback));
    }

    /// Remove the stop callback
    pub fn clear_on_interrupt(&self) {
        self.inner.state.lock().on_interrupt = None;
    }

    /// Install a stop callback for the lifetime of the returned guard.
    ///
    /// Dropping the guard clears the callback unless another one has replaced it.
    pub fn stop_guard<F>(&self, callback: F) -> StopGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: StopCallback = Arc::new(callback);
        self.inner.state.lock().on_interrupt = Some(Arc::clone(&callback));
        StopGuard {
            token: self.clone(),
            callback,
        }
    }

    /// Fail with `Interrupted(label)` if an interrupt is outstanding.
    ///
    /// Call at safe suspension points between sub-steps.
    pub fn fail_if_interrupted(&self, label: &str) -> Result<(), BotError> {
        if self.has_interrupt() {
            return Err(BotError::Interrupted(label.to_string()));
        }
        Ok(())
    }

    /// Completes once an interrupt has been requested.
    ///
    /// Returns immediately if one is already outstanding.
    pub async fn interrupted(&self) {
        let mut rx = self.inner.flag.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|raised| *raised).await;
    }

    /// Request that the running instruction stop.
    ///
    /// Sets `has_interrupt`, invokes the stop callback (if any) synchronously and
    /// returns a handle that completes when [`acknowledge`](Self::acknowledge) is
    /// called. Precondition: an instruction is running and no other request is
    /// outstanding.
    pub fn request_interrupt(&self) -> InterruptHandle {
        let handle = self.arm();
        self.fire_stop_callback();
        handle
    }

    /// Raise the flag and register the waiter without running the stop callback.
    ///
    /// A request whose waiter has gone away is taken over by the new waiter.
    pub(crate) fn arm(&self) -> InterruptHandle {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.inner.state.lock();
            let abandoned = state
                .callee
                .as_ref()
                .map_or(true, oneshot::Sender::is_closed);
            debug_assert!(
                !state.has_interrupt || abandoned,
                "interrupt requested while another is outstanding"
            );
            state.has_interrupt = true;
            state.callee = Some(tx);
        }
        self.inner.flag.send_replace(true);
        debug!("Interrupt requested");
        InterruptHandle { rx }
    }

    /// Run the registered stop callback outside the state lock.
    pub(crate) fn fire_stop_callback(&self) {
        let callback = self.inner.state.lock().on_interrupt.clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Clear the interrupt and release the pending waiter.
    ///
    /// Must be called exactly once per [`request_interrupt`](Self::request_interrupt).
    /// Returns false if the waiter was already gone.
    pub fn acknowledge(&self) -> bool {
        let callee = {
            let mut state = self.inner.state.lock();
            state.has_interrupt = false;
            state.callee.take()
        };
        self.inner.flag.send_replace(false);
        let delivered = callee.map(|tx| tx.send(()).is_ok()).unwrap_or(false);
        debug!(delivered, "Interrupt acknowledged");
        delivered
    }
}

/// Awaitable returned by [`InterruptToken::request_interrupt`]
#[must_use = "the interrupt handshake completes only when the handle is awaited"]
pub struct InterruptHandle {
    rx: oneshot::Receiver<()>,
}

impl InterruptHandle {
    /// True if the acknowledgement already arrived, without waiting for it
    pub(crate) fn try_delivered(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Future for InterruptHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender means the token was reset without acknowledgement; release anyway.
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

/// Keeps a stop callback registered until dropped
pub struct StopGuard {
    token: InterruptToken,
    callback: StopCallback,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        let mut state = self.token.inner.state.lock();
        let ours = state
            .on_interrupt
            .as_ref()
            .map(|current| Arc::ptr_eq(current, &self.callback))
            .unwrap_or(false);
        if ours {
            state.on_interrupt = None;
        }
    }
}
