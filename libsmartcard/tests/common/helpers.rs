// helpers.rs: session setup shared by the session tests

use libsmartcard::test_support::powered_session;
use libsmartcard::transport::MockTransport;
use libsmartcard::{CardSession, Initialized, SessionConfig};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Session powered on with `atr`, scripted card bytes queued afterwards.
pub fn session_with(
    atr: &[u8],
    config: SessionConfig,
    card: &[&[u8]],
) -> anyhow::Result<CardSession<MockTransport, Initialized>> {
    init_logger();
    let mut session = powered_session(atr, config)?;
    for bytes in card {
        session.transport_mut().push_bytes(bytes);
    }
    Ok(session)
}

/// PCB of every block the reader sent since power-on.
pub fn sent_pcbs(session: &CardSession<MockTransport, Initialized>) -> Vec<u8> {
    session.transport().frames.iter().map(|f| f[1]).collect()
}
