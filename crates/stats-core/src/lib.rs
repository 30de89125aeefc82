//! Shared building blocks for Telegram chat statistics.
//!
//! Data model, error taxonomy, calendar utilities, formatting helpers and
//! command-line settings used by the data and binary crates.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StatsError};
