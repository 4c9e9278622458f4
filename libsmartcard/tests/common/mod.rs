// Shared helpers for the integration test crates. Each test file pulls this
// in with `#[path]`, so not every helper is used everywhere.
#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;
