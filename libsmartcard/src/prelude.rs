// libsmartcard/src/prelude.rs

//! Common imports for session users.

pub use crate::atr::Atr;
pub use crate::config::SessionConfig;
pub use crate::protocol::PpsMessage;
pub use crate::session::{CardSession, Initialized, SessionBuilder, Uninitialized};
pub use crate::timing::TimingParameters;
pub use crate::transport::ByteTransport;
pub use crate::{
    ApduResponse, CardState, Convention, EdcMode, Error, PpsSupport, Prologue, ProtocolType,
    ResetType, Result, TransactionStatus,
};

// Re-export small utilities for convenience
pub use crate::utils::{HexBytes, to_hex_spaced};
