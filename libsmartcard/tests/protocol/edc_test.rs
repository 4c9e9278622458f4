#[path = "../common/mod.rs"]
mod common;

use libsmartcard::protocol::edc::{compute, verify};
use libsmartcard::protocol::{crc16, lrc};
use libsmartcard::{EdcMode, Error};

#[test]
fn known_answers() {
    assert_eq!(lrc(&[]), 0x00);
    assert_eq!(lrc(&[0x00, 0x40, 0x01, 0x55]), 0x14);
    assert_eq!(crc16(b"123456789"), 0x29B1);
}

#[test]
fn crc_trailer_is_big_endian() {
    assert_eq!(compute(EdcMode::Crc, b"123456789"), vec![0x29, 0xB1]);
    assert_eq!(compute(EdcMode::Lrc, &[0x01, 0x02]), vec![0x03]);
}

#[test]
fn verify_reports_the_mismatch() {
    let data = [0x00, 0x00, 0x02, 0x90, 0x00];
    assert!(verify(EdcMode::Lrc, &data, &[lrc(&data)]).is_ok());
    assert_eq!(
        verify(EdcMode::Lrc, &data, &[0x00]),
        Err(Error::ReceiveLrc { residue: 0x92 })
    );

    let crc = crc16(&data);
    assert!(verify(EdcMode::Crc, &data, &crc.to_be_bytes()).is_ok());
    assert!(matches!(
        verify(EdcMode::Crc, &data, &[0x00, 0x00]),
        Err(Error::ReceiveCrc { expected, actual: 0 }) if expected == crc
    ));
    assert!(matches!(
        verify(EdcMode::Crc, &data, &[0x00]),
        Err(Error::InvalidLength { .. })
    ));
}
