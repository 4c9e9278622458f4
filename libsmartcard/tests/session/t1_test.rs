#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{card_answer, t1_atr, t1_atr_small_ifsc};
use common::helpers::{sent_pcbs, session_with};
use libsmartcard::protocol::Block;
use libsmartcard::protocol::block::pcb;
use libsmartcard::test_support::card_block;
use libsmartcard::{CardState, Error, Prologue, ProtocolType, SessionConfig};

#[test]
fn echo_exchange_end_to_end() -> anyhow::Result<()> {
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&card_answer(false, &[0x42])],
    )?;
    assert_eq!(s.protocol_type(), ProtocolType::T1);

    let r = s.data_exchange_t1(Prologue::information(1), &[0x42])?;
    assert_eq!(r.rx_data_len(), 1);
    assert_eq!(r.data, vec![0x42]);
    assert_eq!(r.status_word(), 0x9000);
    assert_eq!(s.state(), CardState::AtrOn);
    Ok(())
}

#[test]
fn sequence_numbers_alternate() -> anyhow::Result<()> {
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&card_answer(false, &[]), &card_answer(true, &[])],
    )?;
    s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    s.data_exchange_t1(Prologue::information(1), &[0x02])?;
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x40]);
    Ok(())
}

#[test]
fn card_ifs_request_out_of_range_is_rejected() -> anyhow::Result<()> {
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[
            &card_block(&Block::supervisory(pcb::S_IFS_REQUEST, &[0x0F])),
            &card_block(&Block::supervisory(pcb::S_IFS_REQUEST, &[0xFF])),
            &card_answer(false, &[0x42]),
        ],
    )?;
    assert_eq!(s.ifsc(), 0xFE);

    let r = s.data_exchange_t1(Prologue::information(1), &[0x42])?;
    assert_eq!(r.data, vec![0x42]);
    // neither value is echoed; both are answered with R(other error)
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x82, 0x82]);
    assert_eq!(s.ifsc(), 0xFE);
    Ok(())
}

#[test]
fn silent_card_exhausts_retries() -> anyhow::Result<()> {
    let mut s = session_with(&t1_atr(), SessionConfig::default(), &[])?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01]);
    assert_eq!(r, Err(Error::T1RetryExhausted));
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x82, 0x82]);
    assert_eq!(s.state(), CardState::Unknown);
    assert_eq!(s.transport().deactivations, 1);
    Ok(())
}

#[test]
fn silent_card_with_resync_enabled() -> anyhow::Result<()> {
    let config = SessionConfig::default().with_resync(true);
    let mut s = session_with(&t1_atr(), config, &[])?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01]);
    assert_eq!(r, Err(Error::T1RetryExhausted));
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x82, 0x82, 0xC0, 0xC0, 0xC0]);
    Ok(())
}

#[test]
fn resync_restarts_the_exchange() -> anyhow::Result<()> {
    let config = SessionConfig::default().with_resync(true);
    let mut s = session_with(&t1_atr(), config, &[])?;
    {
        let m = s.transport_mut();
        m.push_timeout();
        m.push_timeout();
        m.push_timeout();
        m.push_bytes(&card_block(&Block::supervisory(pcb::S_RESYNC_RESPONSE, &[])));
        m.push_bytes(&card_answer(false, &[0x07]));
    }
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    assert_eq!(r.data, vec![0x07]);
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x82, 0x82, 0xC0, 0x00]);
    Ok(())
}

#[test]
fn command_chaining_follows_ifsc() -> anyhow::Result<()> {
    let mut s = session_with(
        &t1_atr_small_ifsc(),
        SessionConfig::default(),
        &[
            &card_block(&Block::receive_ready(true, 0)),
            &card_answer(false, &[]),
        ],
    )?;
    assert_eq!(s.ifsc(), 0x10);
    let apdu: Vec<u8> = (0u8..0x18).collect();
    s.data_exchange_t1(Prologue::information(0x18), &apdu)?;

    let frames = &s.transport().frames;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0][1], 0x20);
    assert_eq!(frames[0][2], 0x10);
    assert_eq!(&frames[0][3..19], &apdu[..16]);
    assert_eq!(frames[1][1], 0x40);
    assert_eq!(&frames[1][3..11], &apdu[16..]);
    Ok(())
}

#[test]
fn response_chaining_is_acknowledged() -> anyhow::Result<()> {
    let first = card_block(&Block::information(false, true, &[0x01, 0x02]));
    let last = card_block(&Block::information(true, false, &[0x03, 0x90, 0x00]));
    let mut s = session_with(&t1_atr(), SessionConfig::default(), &[&first, &last])?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0xB0])?;
    assert_eq!(r.data, vec![0x01, 0x02, 0x03]);
    assert!(r.is_success());
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x90]);
    Ok(())
}

#[test]
fn waiting_time_extension() -> anyhow::Result<()> {
    let wtx = card_block(&Block::supervisory(pcb::S_WTX_REQUEST, &[0x02]));
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&wtx, &card_answer(false, &[])],
    )?;
    let bwt = s.timing().t1_bwt_etu;
    s.data_exchange_t1(Prologue::information(1), &[0x01])?;

    assert_eq!(sent_pcbs(&s), vec![0x00, pcb::S_WTX_RESPONSE]);
    assert_eq!(s.transport().frames[1][3], 0x02);
    assert!(s.transport().receive_timeouts.contains(&(bwt * 2 + 4)));
    Ok(())
}

#[test]
fn card_changes_ifsc() -> anyhow::Result<()> {
    let ifs = card_block(&Block::supervisory(pcb::S_IFS_REQUEST, &[0x40]));
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&ifs, &card_answer(false, &[])],
    )?;
    s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    assert_eq!(s.ifsc(), 0x40);
    assert_eq!(sent_pcbs(&s), vec![0x00, pcb::S_IFS_RESPONSE]);
    Ok(())
}

#[test]
fn corrupted_block_gets_edc_error() -> anyhow::Result<()> {
    let mut bad = card_answer(false, &[0x11]);
    bad[3] ^= 0x80;
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&bad, &card_answer(false, &[0x11])],
    )?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    assert_eq!(r.data, vec![0x11]);
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x81]);
    Ok(())
}

#[test]
fn card_requests_retransmission() -> anyhow::Result<()> {
    let nak = card_block(&Block::receive_ready(false, pcb::R_ERR_EDC));
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&nak, &card_answer(false, &[])],
    )?;
    s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    let frames = &s.transport().frames;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], frames[1]);
    Ok(())
}

#[test]
fn repeated_sequence_number_is_rejected() -> anyhow::Result<()> {
    let mut s = session_with(
        &t1_atr(),
        SessionConfig::default(),
        &[&card_answer(true, &[]), &card_answer(false, &[])],
    )?;
    s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    assert_eq!(sent_pcbs(&s), vec![0x00, 0x82]);
    Ok(())
}

#[test]
fn abort_without_answer() -> anyhow::Result<()> {
    let abort = card_block(&Block::supervisory(pcb::S_ABORT_REQUEST, &[]));
    let mut s = session_with(&t1_atr(), SessionConfig::default(), &[&abort])?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    assert!(r.data.is_empty());
    assert_eq!(sent_pcbs(&s), vec![0x00]);
    assert_eq!(s.state(), CardState::Unknown);
    Ok(())
}

#[test]
fn ifs_request_retried_until_echoed() -> anyhow::Result<()> {
    let wrong = card_block(&Block::supervisory(pcb::S_IFS_RESPONSE, &[0x20]));
    let right = card_block(&Block::supervisory(pcb::S_IFS_RESPONSE, &[0xFE]));
    let mut s = session_with(&t1_atr(), SessionConfig::default(), &[&wrong, &right])?;
    let r = s.data_exchange_t1(Prologue::supervisory(pcb::S_IFS_REQUEST, 1), &[0xFE])?;
    assert_eq!(r.data, vec![0xFE]);
    assert_eq!(sent_pcbs(&s), vec![pcb::S_IFS_REQUEST, pcb::S_IFS_REQUEST]);
    Ok(())
}

#[test]
fn invalid_supervisory_request() -> anyhow::Result<()> {
    let mut s = session_with(&t1_atr(), SessionConfig::default(), &[])?;
    let r = s.data_exchange_t1(Prologue::supervisory(pcb::S_IFS_REQUEST, 1), &[0xFF]);
    assert!(matches!(r, Err(Error::InvalidCommandApduT1(_))));
    assert!(s.transport().frames.is_empty());
    Ok(())
}

#[test]
fn late_character_deactivates_when_configured() -> anyhow::Result<()> {
    let config = SessionConfig {
        deactivate_on_cwt_exceeded: true,
        ..SessionConfig::default()
    };
    let mut s = session_with(&t1_atr(), config, &[&[0x00, 0x00, 0x02, 0x90]])?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01]);
    assert_eq!(r, Err(Error::CardNoResponse));
    assert_eq!(s.state(), CardState::Unknown);
    Ok(())
}

#[test]
fn crc_profile_round_trip() -> anyhow::Result<()> {
    use libsmartcard::EdcMode;
    use libsmartcard::test_support::card_block_with;

    let config = SessionConfig::iso().with_edc(EdcMode::Crc);
    let answer = card_block_with(&Block::information(false, false, &[0x90, 0x00]), EdcMode::Crc);
    let mut s = session_with(&t1_atr(), config, &[&answer])?;
    let r = s.data_exchange_t1(Prologue::information(1), &[0x01])?;
    assert!(r.is_success());
    // prologue, one byte, two CRC bytes
    assert_eq!(s.transport().frames[0].len(), 6);
    Ok(())
}
