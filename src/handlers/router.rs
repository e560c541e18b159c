//! Message dispatch chain
//!
//! Handlers are asked in registration order whether they accept a message;
//! the first one that does handles it and nobody else is consulted. Handler
//! errors and panics stop at this boundary and come back as a failed
//! [`DispatchOutcome`].

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::models::UserContext;
use crate::utils::errors::Result;

/// Name reported when no handler accepted a message
pub const DEFAULT_HANDLER: &str = "default";

/// A user message as seen by the handlers
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user: Option<UserContext>,
    pub text: String,
    pub raw: Value,
}

impl IncomingMessage {
    pub fn new(chat_id: i64, user: Option<UserContext>, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user,
            text: text.into(),
            raw: Value::Null,
        }
    }

    /// Extract the text message (or callback data) from a webhook update.
    /// Updates without text and a chat are not routable.
    pub fn from_update(update: &Value) -> Option<Self> {
        let (message, text) = if let Some(message) = update.get("message") {
            let text = message
                .get("text")
                .or_else(|| message.get("caption"))
                .and_then(Value::as_str)?;
            (message, text)
        } else {
            let query = update.get("callback_query")?;
            let text = query.get("data").and_then(Value::as_str)?;
            (query.get("message")?, text)
        };

        let chat_id = message
            .get("chat")
            .and_then(|chat| chat.get("id"))
            .and_then(Value::as_i64)?;

        Some(Self {
            chat_id,
            user: UserContext::from_update(update),
            text: text.to_string(),
            raw: update.clone(),
        })
    }

    /// Trimmed, lowercased text with any `@botname` suffix removed from a
    /// leading command
    pub fn normalized_text(&self) -> String {
        let text = self.text.trim().to_lowercase();
        if !text.starts_with('/') {
            return text;
        }

        match text.split_once(char::is_whitespace) {
            Some((command, rest)) => format!("{} {}", strip_bot_suffix(command), rest.trim_start()),
            None => strip_bot_suffix(&text).to_string(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(UserContext::user_id)
    }

    /// Sender's language, English when unknown
    pub fn language(&self) -> &str {
        self.user
            .as_ref()
            .map(UserContext::language_or_default)
            .unwrap_or(crate::i18n::DEFAULT_LANGUAGE)
    }
}

fn strip_bot_suffix(command: &str) -> &str {
    command.split('@').next().unwrap_or(command)
}

/// Result of routing one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn handled(handler: impl Into<String>) -> Self {
        Self {
            success: true,
            handler: Some(handler.into()),
            error: None,
        }
    }

    pub fn unhandled() -> Self {
        Self::handled(DEFAULT_HANDLER)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            handler: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap check on the message alone; no I/O
    fn can_handle(&self, message: &IncomingMessage) -> bool;

    async fn handle(&self, message: &IncomingMessage) -> Result<DispatchOutcome>;
}

#[derive(Default)]
pub struct MessageRouter {
    handlers: Vec<Box<dyn MessageHandler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: MessageHandler + 'static>(&mut self, handler: H) -> &mut Self {
        debug!(handler = handler.name(), "Handler registered");
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn with_handler<H: MessageHandler + 'static>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Name of the handler `route` would pick, without running it
    pub fn matching_handler(&self, message: &IncomingMessage) -> Option<&str> {
        self.handlers
            .iter()
            .find(|h| {
                std::panic::catch_unwind(AssertUnwindSafe(|| h.can_handle(message))).unwrap_or(false)
            })
            .map(|h| h.name())
    }

    /// Dispatch to the first accepting handler. Never fails.
    pub async fn route(&self, message: &IncomingMessage) -> DispatchOutcome {
        for handler in &self.handlers {
            let accepts = std::panic::catch_unwind(AssertUnwindSafe(|| handler.can_handle(message)));

            match accepts {
                Ok(false) => continue,
                Ok(true) => return Self::run(handler.as_ref(), message).await,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(handler = handler.name(), panic = %reason, "Handler predicate panicked");
                    return DispatchOutcome::failed(format!("{} panicked: {}", handler.name(), reason));
                }
            }
        }

        debug!(chat_id = message.chat_id, "No handler matched, using default");
        DispatchOutcome::unhandled()
    }

    async fn run(handler: &dyn MessageHandler, message: &IncomingMessage) -> DispatchOutcome {
        let name = handler.name();
        debug!(handler = name, chat_id = message.chat_id, "Dispatching message");

        match AssertUnwindSafe(handler.handle(message)).catch_unwind().await {
            Ok(Ok(outcome)) => {
                info!(handler = name, user_id = ?message.user_id(), "Message handled");
                outcome
            }
            Ok(Err(e)) => {
                error!(handler = name, error = %e, "Handler failed");
                DispatchOutcome::failed(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(handler = name, panic = %reason, "Handler panicked");
                DispatchOutcome::failed(format!("{} panicked: {}", name, reason))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
