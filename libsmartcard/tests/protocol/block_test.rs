#[path = "../common/mod.rs"]
mod common;

use libsmartcard::protocol::block::pcb;
use libsmartcard::protocol::{Block, BlockKind, Supervisory};
use libsmartcard::{EdcMode, Error};

#[test]
fn card_frames_decode() {
    let frame = hex::decode("00e10120c0").unwrap();
    let block = Block::decode(&frame, EdcMode::Lrc).unwrap();
    assert_eq!(block.kind(), BlockKind::Supervisory);
    assert_eq!(block.supervisory_kind(), Some(Supervisory::Ifs));
    assert!(block.is_response());
    assert_eq!(block.data, vec![0x20]);
}

#[test]
fn pcb_classification() {
    assert_eq!(BlockKind::of(0x60), BlockKind::Information);
    assert_eq!(BlockKind::of(0x92), BlockKind::ReceiveReady);
    assert_eq!(BlockKind::of(pcb::S_WTX_REQUEST), BlockKind::Supervisory);

    let i = Block::information(true, true, &[0x01]);
    assert_eq!(i.pcb, 0x60);
    assert!(i.more());
    let r = Block::receive_ready(false, pcb::R_ERR_EDC);
    assert_eq!(r.pcb, 0x81);
    assert!(!r.sequence());
}

#[test]
fn frames_with_wrong_length_are_rejected() {
    let frame = hex::decode("0000029000").unwrap();
    assert!(matches!(
        Block::decode(&frame, EdcMode::Lrc),
        Err(Error::InvalidLength { .. })
    ));
}

#[test]
fn display_names_the_block() {
    let b = Block::supervisory(pcb::S_RESYNC_REQUEST, &[]);
    assert_eq!(b.to_string(), "S-block pcb=C0 []");
}
