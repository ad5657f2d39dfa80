//! Typed action tables.
//!
//! Each instruction is registered with a serde-decodable argument type. The
//! payload is decoded while the command is resolved, so a malformed payload is
//! rejected before the instruction manager touches its state.

use super::{ActionId, ModuleId};
use crate::error::{BotError, Result};
use crate::interrupt::InterruptToken;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Future produced by a running instruction
pub type ActionFuture = BoxFuture<'static, Result<()>>;

/// Instruction with decoded arguments, waiting for its interrupt token
pub type PreparedAction = Box<dyn FnOnce(InterruptToken) -> ActionFuture + Send>;

/// Decodes a payload into a ready-to-run instruction
pub type ActionHandler = Arc<dyn Fn(Value) -> Result<PreparedAction> + Send + Sync>;

/// Argument type for instructions that take none
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoArgs {}

/// Instructions collected from one module during registration
pub struct ActionSet {
    module: ModuleId,
    handlers: Vec<(ActionId, ActionHandler)>,
}

impl ActionSet {
    pub(crate) fn new(module: ModuleId) -> Self {
        Self {
            module,
            handlers: Vec::new(),
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Register `name` with a handler taking decoded `A` and the interrupt token.
    pub fn add<A, F, Fut>(&mut self, name: &str, handler: F) -> &mut Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A, InterruptToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let module = self.module.clone();
        let action = ActionId::new(name);
        let label = action.clone();

        let decode: ActionHandler = Arc::new(move |payload: Value| {
            let args: A = decode_args(&module, &label, payload)?;
            let handler = Arc::clone(&handler);
            let prepared: PreparedAction =
                Box::new(move |token: InterruptToken| -> ActionFuture {
                    Box::pin(handler(args, token))
                });
            Ok(prepared)
        });

        self.handlers.push((action, decode));
        self
    }

    pub(crate) fn into_handlers(self) -> Vec<(ActionId, ActionHandler)> {
        self.handlers
    }
}

/// Decode an instruction payload. `null` reads as an empty object.
pub(crate) fn decode_args<A: DeserializeOwned>(
    module: &ModuleId,
    action: &ActionId,
    payload: Value,
) -> Result<A> {
    let invalid = |detail: String| BotError::InvalidArgs {
        module: module.to_string(),
        instruction: action.to_string(),
        detail,
    };

    let payload = match payload {
        Value::Null => Value::Object(Map::new()),
        Value::Object(_) => payload,
        other => {
            return Err(invalid(format!(
                "expected an object, got {}",
                json_kind(&other)
            )))
        }
    };

    serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
