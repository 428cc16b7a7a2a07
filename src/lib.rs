//! Pathlimit - Path-Matched Rate Limit Rules
//!
//! This crate implements the rule model consumed by a request-throttling
//! middleware: which request paths a limit applies to, how long its window
//! is and how many requests it allows. Counting requests and deciding
//! whether to admit them is left to the enforcement engine.

pub mod config;
pub mod error;
pub mod ratelimit;
