//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and maintaining both storage tiers.

pub mod clear;
pub mod purge;
pub mod stats;

pub use clear::clear_impl;
pub use purge::{StorePurgeParams, purge_impl};
pub use stats::stats_impl;
