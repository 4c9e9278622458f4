// libsmartcard/src/session/builder.rs

//! Builder for card sessions.

use crate::config::SessionConfig;
use crate::session::handle::{CardSession, Uninitialized};
use crate::transport::ByteTransport;
use crate::{Error, Result};

/// Helper to construct a CardSession with optional configuration.
pub struct SessionBuilder<T: ByteTransport> {
    transport: Option<T>,
    config: SessionConfig,
}

impl<T: ByteTransport> Default for SessionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ByteTransport> SessionBuilder<T> {
    /// Builder with the default configuration and no transport.
    pub fn new() -> Self {
        Self {
            transport: None,
            config: SessionConfig::default(),
        }
    }

    /// Provide the transport the session will own (e.g. MockTransport)
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the configuration; checked when the session is built.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Consume the builder and return an uninitialized session.
    /// Requires a transport; otherwise returns TransportNotConfigured.
    pub fn build_uninitialized(self) -> Result<CardSession<T, Uninitialized>> {
        match self.transport {
            Some(t) => CardSession::new(t, self.config),
            None => Err(Error::TransportNotConfigured),
        }
    }
}
