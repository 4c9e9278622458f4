#[path = "../common/mod.rs"]
mod common;

use libsmartcard::transport::MockTransport;
use libsmartcard::{CardState, Error, PpsSupport, ProtocolType, SessionBuilder, SessionConfig};

#[test]
fn builder_initialize_transition() {
    let session = SessionBuilder::new()
        .with_transport(MockTransport::new())
        .with_config(SessionConfig::iso())
        .build_uninitialized()
        .unwrap();
    assert!(!session.config().emv_timing);

    // Transition to initialized
    let initialized = session.initialize().unwrap();
    assert_eq!(initialized.state(), CardState::Unknown);
    assert_eq!(initialized.protocol_type(), ProtocolType::Invalid);
    assert_eq!(initialized.pps_support(), PpsSupport::NotAllowed);
    assert!(initialized.is_present());
    assert_eq!(initialized.transport().initialized, 1);
}

#[test]
fn builder_requires_transport() {
    let r = SessionBuilder::<MockTransport>::new().build_uninitialized();
    assert!(matches!(r, Err(Error::TransportNotConfigured)));
}

#[test]
fn builder_rejects_bad_config() {
    let config = SessionConfig {
        ifsd: 0xFF,
        ..SessionConfig::default()
    };
    let r = SessionBuilder::new()
        .with_transport(MockTransport::new())
        .with_config(config)
        .build_uninitialized();
    assert!(matches!(r, Err(Error::InvalidConfig(_))));
}

#[test]
fn boxed_transport_session() {
    use libsmartcard::ByteTransport;

    let boxed: Box<dyn ByteTransport> = Box::new(MockTransport::new());
    let session = SessionBuilder::new()
        .with_transport(boxed)
        .build_uninitialized()
        .unwrap()
        .initialize()
        .unwrap();
    assert!(session.is_present());
}
