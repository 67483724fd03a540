//! Dispatch Tests
//!
//! Events go in through [`Framework::process`](chat_commands::Framework::process)
//! and are checked against what the recording platform received.

mod gate_tests;
mod rate_limit_tests;
mod registry_tests;
mod routing_tests;
