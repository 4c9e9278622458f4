// libsmartcard/src/session/mod.rs

//! Card session: activation, PPS and the T=0 / T=1 exchanges.

pub mod builder;
pub mod exchange;
pub mod handle;
pub mod power;

pub use builder::SessionBuilder;
pub use handle::{CardSession, Initialized, Uninitialized};
