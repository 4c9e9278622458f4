// libsmartcard/src/transport/mod.rs

//! Byte transport abstraction and its scripted mock.

pub mod mock;
pub mod traits;

pub use mock::{MockTransport, RxEvent};
pub use traits::ByteTransport;
