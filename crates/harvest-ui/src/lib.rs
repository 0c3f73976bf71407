//! Terminal styling for the harvest command-line tool.
//!
//! Provides Ayu-themed colours for build statuses, change and build summary
//! lines, and terminal capability detection.

pub mod styles;
pub mod terminal;
