//! Test helpers module
//!
//! This module provides utilities and helpers for testing the Torah Bot.
//! It includes a mock Telegram API server, database helpers and update
//! builders.

#![allow(dead_code)]

pub mod database_helper;
pub mod simple_test;
pub mod telegram_mock;

pub use database_helper::*;
pub use simple_test::*;
pub use telegram_mock::*;
