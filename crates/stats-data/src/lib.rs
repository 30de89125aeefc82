//! Data layer for Telegram chat statistics.
//!
//! Responsible for discovering, reading and validating chat exports,
//! classifying messages, aggregating them into windowed histograms,
//! navigating between windows and running the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod classifier;
pub mod navigation;
pub mod reader;

pub use stats_core as core;
