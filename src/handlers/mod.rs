//! Bot handlers module
//!
//! This module contains the message dispatch chain and its built-in handlers:
//! - Command handlers for bot commands
//! - Message handlers for free-text requests

pub mod commands;
pub mod context;
pub mod messages;
pub mod router;

pub use commands::*;
pub use context::HandlerContext;
pub use messages::*;
pub use router::{DispatchOutcome, IncomingMessage, MessageHandler, MessageRouter};

/// Router with the built-in handlers in dispatch order
pub fn default_router(ctx: HandlerContext) -> MessageRouter {
    MessageRouter::new()
        .with_handler(StartHandler::new(ctx.clone()))
        .with_handler(SubscribeHandler::new(ctx.clone()))
        .with_handler(UnsubscribeHandler::new(ctx.clone()))
        .with_handler(StatsHandler::new(ctx.clone()))
        .with_handler(AdminHandler::new(ctx.clone()))
        .with_handler(GameHandler::new(ctx.clone()))
        .with_handler(WisdomHandler::new(ctx.clone()))
        .with_handler(QuizHandler::new(ctx.clone()))
        .with_handler(HelpHandler::new(ctx))
}
