// libsmartcard/src/protocol/edc.rs

//! Epilogue checks for T=1 blocks.

use crate::types::EdcMode;
use crate::{Error, Result};

/// Longitudinal redundancy check: XOR of all bytes.
pub fn lrc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Feed one byte into a CRC-16 (polynomial 0x1021, MSB first).
pub fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ ((byte as u16) << 8);
    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ 0x1021
        } else {
            crc << 1
        };
    }
    crc
}

/// CRC-16 over `data`, seeded with 0xFFFF.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, &b| crc16_update(crc, b))
}

/// Epilogue bytes for `data`. The CRC goes out high byte first.
pub fn compute(mode: EdcMode, data: &[u8]) -> Vec<u8> {
    match mode {
        EdcMode::Lrc => vec![lrc(data)],
        EdcMode::Crc => crc16(data).to_be_bytes().to_vec(),
    }
}

/// Check the epilogue of a received block.
pub fn verify(mode: EdcMode, data: &[u8], trailer: &[u8]) -> Result<()> {
    if trailer.len() != mode.trailer_len() {
        return Err(Error::InvalidLength {
            expected: mode.trailer_len(),
            actual: trailer.len(),
        });
    }
    match mode {
        EdcMode::Lrc => {
            let residue = lrc(data) ^ trailer[0];
            if residue != 0 {
                return Err(Error::ReceiveLrc { residue });
            }
        }
        EdcMode::Crc => {
            let expected = crc16(data);
            let actual = u16::from_be_bytes([trailer[0], trailer[1]]);
            if expected != actual {
                return Err(Error::ReceiveCrc { expected, actual });
            }
        }
    }
    Ok(())
}
