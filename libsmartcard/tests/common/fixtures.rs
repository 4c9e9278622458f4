// fixtures.rs: commonly used ATRs, APDUs and card blocks

use libsmartcard::protocol::Block;
use libsmartcard::test_support::{card_block, with_tck};

/// T=0 card as seen in most EMV test decks (TB1=00, TC1=00).
pub fn t0_atr() -> Vec<u8> {
    hex::decode("3b600000").unwrap()
}

/// T=1 card with IFSC 0xFE, BWI 4, CWI 5.
pub fn t1_atr() -> Vec<u8> {
    with_tck(&hex::decode("3be500ff8131fe450102030405").unwrap())
}

/// T=1 card announcing a small IFSC (0x10) to force chaining.
pub fn t1_atr_small_ifsc() -> Vec<u8> {
    with_tck(&hex::decode("3be500ff813110450102030405").unwrap())
}

/// SELECT by AID, case 4.
pub fn select_ppse() -> Vec<u8> {
    hex::decode("00a404000e325041592e5359532e444446303100").unwrap()
}

/// I-block from the card carrying `data` followed by 90 00.
pub fn card_answer(sequence: bool, data: &[u8]) -> Vec<u8> {
    let mut inf = data.to_vec();
    inf.extend_from_slice(&[0x90, 0x00]);
    card_block(&Block::information(sequence, false, &inf))
}
