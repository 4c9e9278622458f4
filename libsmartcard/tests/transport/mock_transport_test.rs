use libsmartcard::protocol::Link;
use libsmartcard::transport::{ByteTransport, MockTransport, RxEvent};
use libsmartcard::{Convention, Error, ResetType};

#[test]
fn scripted_events_play_back_in_order() {
    let mut m = MockTransport::new();
    m.push_byte(0x3B);
    m.push_parity_error();
    m.push_timeout();
    assert_eq!(m.pending(), 3);

    assert_eq!(m.receive(10), Ok(0x3B));
    assert_eq!(m.receive(20), Err(Error::Parity));
    assert_eq!(m.receive(30), Err(Error::Timeout));
    // an empty queue reads as silence
    assert_eq!(m.receive(40), Err(Error::Timeout));
    assert_eq!(m.receive_timeouts, vec![10, 20, 30, 40]);
}

#[test]
fn control_operations_are_recorded() {
    let mut m = MockTransport::new();
    m.cold_reset().unwrap();
    m.warm_reset().unwrap();
    m.set_baud_rate_divisor(371).unwrap();
    m.deactivate().unwrap();
    assert_eq!(m.resets, vec![ResetType::Cold, ResetType::Warm]);
    assert_eq!(m.divisors, vec![371]);
    assert_eq!(m.deactivations, 1);

    m.remove_card();
    assert!(!m.card_present());
}

#[test]
fn link_recovers_from_transient_send_failure() {
    let mut m = MockTransport::new();
    m.set_send_failures(2);
    {
        let mut link = Link::new(&mut m, Convention::Direct, false, 0);
        link.send(&[0x00, 0xC1, 0x01, 0xFE, 0x3E]).unwrap();
    }
    assert_eq!(m.frames, vec![vec![0x00, 0xC1, 0x01, 0xFE, 0x3E]]);
    assert_eq!(m.take_sent().len(), 5);
    assert!(m.frames.is_empty());
}

#[test]
fn link_gives_up_after_five_attempts() {
    let mut m = MockTransport::new();
    m.set_send_failures(5);
    let mut link = Link::new(&mut m, Convention::Direct, false, 0);
    assert_eq!(
        link.send(&[0x00]),
        Err(Error::TransmitFailed { attempts: 5 })
    );
}

#[test]
fn inverse_link_decodes_received_bytes() {
    let mut m = MockTransport::new();
    m.rx.push_back(RxEvent::Byte(0x3F));
    let mut link = Link::new(&mut m, Convention::Inverse, false, 0);
    assert_eq!(link.receive(100), Ok(0x03));
}
