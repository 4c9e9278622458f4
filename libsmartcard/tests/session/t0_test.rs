#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{select_ppse, t0_atr};
use common::helpers::session_with;
use libsmartcard::protocol::convention::inverse_byte;
use libsmartcard::test_support::powered_session;
use libsmartcard::{CardState, Convention, Error, SessionConfig};

#[test]
fn select_with_get_response() -> anyhow::Result<()> {
    let fci: Vec<u8> = (0x10u8..0x20).collect();
    let mut card = vec![0xA4, 0x61, 0x10, 0xC0];
    card.extend_from_slice(&fci);
    card.extend_from_slice(&[0x90, 0x00]);

    let mut s = session_with(&t0_atr(), SessionConfig::default(), &[&card])?;
    let r = s.data_exchange_t0(&select_ppse())?;
    assert_eq!(r.data, fci);
    assert!(r.is_success());

    let frames = &s.transport().frames;
    assert_eq!(frames[0], select_ppse()[..5]);
    // the body goes out without the trailing Le
    assert_eq!(frames[1], select_ppse()[5..19]);
    assert_eq!(frames[2], vec![0x00, 0xC0, 0x00, 0x00, 0x10]);
    Ok(())
}

#[test]
fn wrong_length_is_corrected() -> anyhow::Result<()> {
    let card = [0x6C, 0x03, 0xB2, 0x70, 0x01, 0x5A, 0x90, 0x00];
    let mut s = session_with(&t0_atr(), SessionConfig::default(), &[&card])?;
    let r = s.data_exchange_t0(&[0x00, 0xB2, 0x01, 0x0C, 0x00])?;
    assert_eq!(r.data, vec![0x70, 0x01, 0x5A]);
    assert_eq!(s.transport().frames[1], vec![0x00, 0xB2, 0x01, 0x0C, 0x03]);
    Ok(())
}

#[test]
fn null_bytes_extend_the_wait() -> anyhow::Result<()> {
    let card = [0x60, 0x60, 0x60, 0x90, 0x00];
    let mut s = session_with(&t0_atr(), SessionConfig::default(), &[&card])?;
    let r = s.data_exchange_t0(&[0x80, 0xCA, 0x9F, 0x17])?;
    assert_eq!(r.status_word(), 0x9000);
    Ok(())
}

#[test]
fn bad_procedure_byte_shuts_down() -> anyhow::Result<()> {
    let mut s = session_with(&t0_atr(), SessionConfig::default(), &[&[0x42]])?;
    let r = s.data_exchange_t0(&[0x00, 0xB0, 0x00, 0x00, 0x10]);
    assert_eq!(r, Err(Error::ProcedureByte(0x42)));
    assert_eq!(s.state(), CardState::Unknown);
    assert_eq!(s.transport().deactivations, 1);
    Ok(())
}

#[test]
fn malformed_apdu_is_rejected() -> anyhow::Result<()> {
    let mut s = session_with(&t0_atr(), SessionConfig::default(), &[])?;
    let r = s.data_exchange_t0(&[0x00, 0xA4, 0x04]);
    assert!(matches!(r, Err(Error::InvalidCommandApduT0(_))));
    assert!(s.transport().frames.is_empty());
    Ok(())
}

#[test]
fn silent_card() -> anyhow::Result<()> {
    let mut s = session_with(&t0_atr(), SessionConfig::default(), &[])?;
    let r = s.data_exchange_t0(&[0x00, 0xB0, 0x00, 0x00, 0x10]);
    assert_eq!(r, Err(Error::CardNoResponse));
    Ok(())
}

#[test]
fn inverse_convention_card() -> anyhow::Result<()> {
    let mut atr = vec![0x03];
    atr.extend(t0_atr()[1..].iter().map(|&b| inverse_byte(b)));
    let mut s = powered_session(&atr, SessionConfig::default())?;
    assert_eq!(s.convention(), Convention::Inverse);

    s.transport_mut()
        .push_bytes(&[inverse_byte(0x90), inverse_byte(0x00)]);
    let r = s.data_exchange_t0(&[0x00, 0x70, 0x00, 0x00])?;
    assert!(r.is_success());
    let expected: Vec<u8> = [0x00, 0x70, 0x00, 0x00, 0x00]
        .iter()
        .map(|&b| inverse_byte(b))
        .collect();
    assert_eq!(s.transport().frames[0], expected);
    Ok(())
}
