#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{t0_atr, t1_atr};
use common::helpers::init_logger;
use std::time::Duration;

use libsmartcard::test_support::{initialized_session, mock_with_atr, with_tck};
use libsmartcard::transport::MockTransport;
use libsmartcard::{
    CardState, EdcMode, Error, ProtocolType, ResetType, SessionConfig, TransactionStatus,
};

#[test]
fn t1_card_end_to_end_parameters() -> anyhow::Result<()> {
    init_logger();
    let mut s = initialized_session(mock_with_atr(&t1_atr()), SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;

    assert_eq!(s.state(), CardState::AtrOn);
    assert_eq!(s.protocol_type(), ProtocolType::T1);
    let atr = s.atr().unwrap();
    assert_eq!(atr.td(1), Some(0x81));
    assert_eq!(atr.tck(), t1_atr().last().copied());

    let t = s.timing();
    // TC1=FF on T=1: 11 ETU guard time
    assert_eq!(t.cgt_etu, 11);
    assert_eq!(t.t1_cwt_etu, 11 + 32);
    assert_eq!(t.t1_bwt_etu, 11 + 16 * 960 + 960);
    assert_eq!(s.edc_mode(), EdcMode::Lrc);
    Ok(())
}

#[test]
fn status_of_failed_power_on() -> anyhow::Result<()> {
    let mut s = initialized_session(MockTransport::new(), SessionConfig::default())?;
    let r = s.power_on_atr(ResetType::Cold);
    assert_eq!(TransactionStatus::of(&r), TransactionStatus::NoAtrResponse);
    assert_eq!(s.transport().resets, vec![ResetType::Cold]);
    Ok(())
}

#[test]
fn truncated_atr_is_retried_warm() -> anyhow::Result<()> {
    // T0 announces two historical bytes, only one arrives
    let mut m = MockTransport::new();
    m.push_bytes(&[0x3B, 0x62, 0x00, 0x00, 0x80]);
    m.push_timeout();
    m.push_bytes(&[0x3B, 0x62, 0x00, 0x00, 0x80, 0x01]);
    let mut s = initialized_session(m, SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.transport().resets, vec![ResetType::Cold, ResetType::Warm]);
    assert_eq!(s.atr().unwrap().historical_bytes(), &[0x80, 0x01]);
    Ok(())
}

#[test]
fn bad_tck_is_fatal() -> anyhow::Result<()> {
    let mut atr = t1_atr();
    let last = atr.len() - 1;
    atr[last] ^= 0x01;
    let mut s = initialized_session(mock_with_atr(&atr), SessionConfig::default())?;
    assert_eq!(s.power_on_atr(ResetType::Cold), Err(Error::NoAtrResponse));
    assert_eq!(s.transport().resets.len(), 1);
    assert_eq!(s.state(), CardState::Unknown);
    Ok(())
}

#[test]
fn t0_card_with_optional_tck() -> anyhow::Result<()> {
    let atr = with_tck(&t0_atr());
    let mut s = initialized_session(mock_with_atr(&atr), SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.protocol_type(), ProtocolType::T0);
    Ok(())
}

#[test]
fn warm_reset_accepts_missing_tb1() -> anyhow::Result<()> {
    let mut s = initialized_session(mock_with_atr(&[0x3B, 0x00]), SessionConfig::default())?;
    s.power_on_atr(ResetType::Warm)?;
    assert_eq!(s.transport().resets, vec![ResetType::Warm]);
    Ok(())
}

#[test]
fn ta1_d6_needs_opt_in() -> anyhow::Result<()> {
    let atr = [0x3B, 0xB0, 0xD6, 0x00, 0x10, 0x80];

    let mut s = initialized_session(mock_with_atr(&atr), SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.timing().fd.d_numerator, 32);

    let config = SessionConfig {
        accept_ta1_d6: false,
        ..SessionConfig::default()
    };
    let mut m = MockTransport::new();
    m.push_bytes(&atr);
    m.push_timeout();
    m.push_bytes(&atr);
    let mut s = initialized_session(m, config)?;
    assert_eq!(s.power_on_atr(ResetType::Cold), Err(Error::NoAtrResponse));
    Ok(())
}

#[test]
fn power_on_clears_previous_session() -> anyhow::Result<()> {
    let mut m = mock_with_atr(&t1_atr());
    m.push_timeout();
    m.push_bytes(&t0_atr());
    let mut s = initialized_session(m, SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.protocol_type(), ProtocolType::T1);
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.protocol_type(), ProtocolType::T0);
    assert_eq!(s.ifsc(), 0x20);
    Ok(())
}

/// Cold ATR whose sixth byte arrives after `idle`, followed by a complete
/// ATR for a warm reset.
fn slow_card(idle: Duration) -> MockTransport {
    let atr = t1_atr();
    let mut m = MockTransport::new();
    m.push_bytes(&atr[..5]);
    m.push_late_byte(atr[5], idle);
    m.push_bytes(&atr[6..]);
    m
}

#[test]
fn emv_atr_window_cuts_off_slow_card() -> anyhow::Result<()> {
    init_logger();
    // 20160 ETU at 10752 baud is 1.875 s
    let atr = t1_atr();
    let mut m = MockTransport::new();
    m.push_bytes(&atr[..5]);
    m.push_late_byte(atr[5], Duration::from_secs(2));
    m.push_bytes(&atr);

    let mut s = initialized_session(m, SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.transport().resets, vec![ResetType::Cold, ResetType::Warm]);
    assert_eq!(s.atr().map(|a| a.raw().to_vec()), Some(atr));
    assert_eq!(s.state(), CardState::AtrOn);
    Ok(())
}

#[test]
fn emv_atr_window_allows_slow_bytes_inside_it() -> anyhow::Result<()> {
    let mut s = initialized_session(slow_card(Duration::from_secs(1)), SessionConfig::default())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.transport().resets, vec![ResetType::Cold]);
    assert_eq!(s.protocol_type(), ProtocolType::T1);
    Ok(())
}

#[test]
fn iso_timing_has_no_total_atr_window() -> anyhow::Result<()> {
    let mut s = initialized_session(slow_card(Duration::from_secs(5)), SessionConfig::iso())?;
    s.power_on_atr(ResetType::Cold)?;
    assert_eq!(s.transport().resets, vec![ResetType::Cold]);
    assert_eq!(s.state(), CardState::AtrOn);
    Ok(())
}
