//! Free-text message handlers

pub mod content;

pub use content::{QuizHandler, WisdomHandler};
