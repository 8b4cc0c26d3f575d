//! Integration test binary: all integration tests share one binary.
//!
//! See the matklad pattern: <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]


mod config_service;
mod gtts_speaker;
mod reminder_lifecycle;
