// libsmartcard/src/constants.rs
//! Protocol constants shared across the crate

/// TS value announcing the direct convention
pub const TS_DIRECT: u8 = 0x3B;
/// TS value as read by a direct-convention UART from an inverse-convention card
pub const TS_INVERSE: u8 = 0x03;

/// Maximum ATR length in bytes (TS included)
pub const MAX_ATR_LEN: usize = 33;

/// TA1 used until the card announces something else (F=372, D=1)
pub const DEFAULT_TA1: u8 = 0x11;

/// Default card clock (Hz)
pub const DEFAULT_REFERENCE_CLOCK_HZ: u32 = 4_000_000;
/// Default peripheral clock feeding the UART baud generator (Hz)
pub const DEFAULT_SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Initial ATR window in card clock cycles (EMV / ISO)
pub const ATR_INITIAL_WAIT_CLOCKS_EMV: u32 = 46_000;
/// ISO variant of the initial ATR window
pub const ATR_INITIAL_WAIT_CLOCKS_ISO: u32 = 40_000;
/// Maximum gap between two ATR characters (EMV / ISO), in ETU
pub const ATR_INTERVAL_ETU_EMV: u32 = 10_080;
/// ISO variant of the ATR character gap
pub const ATR_INTERVAL_ETU_ISO: u32 = 9_600;
/// Total ATR duration allowed by the EMV profile, in ETU
pub const ATR_TOTAL_ETU_EMV: u32 = 20_160;

/// TA1 values accepted in specific mode (exclusive bounds)
pub const SPECIFIC_MODE_TA1_MIN: u8 = 0x10;
/// Upper bound, see `SPECIFIC_MODE_TA1_MIN`
pub const SPECIFIC_MODE_TA1_MAX: u8 = 0x14;
/// Optional bit-rate adjustment accepted in specific mode
pub const SPECIFIC_MODE_TA1_D6: u8 = 0xD6;

/// Character timing bases (ETU)
pub const ETU_11: u32 = 11;
/// Character time with TC1 = FF under T=0
pub const ETU_12: u32 = 12;
/// TC1 value meaning "minimum guard time"
pub const TC1_MINIMUM_GUARD: u8 = 0xFF;

/// Default indicators used when the ATR does not carry them
pub const DEFAULT_WI: u8 = 10;
/// CWI when TB3 is absent
pub const DEFAULT_CWI: u8 = 12;
/// BWI when TB3 is absent
pub const DEFAULT_BWI: u8 = 4;

/// PPS
pub const PPSS: u8 = 0xFF;
/// PPSS PPS0 PPS1 PPS2 PPS3 PCK plus one spare
pub const MAX_PPS_LEN: usize = 7;
/// Wait for each PPS response character
pub const PPS_RESPONSE_TIMEOUT_ETU: u32 = 9_600;

/// T=0
pub const T0_NULL_BYTE: u8 = 0x60;
/// SW1 asking for the command again with P3 = SW2
pub const T0_SW1_WRONG_LENGTH: u8 = 0x6C;
/// SW1 announcing SW2 response bytes
pub const T0_SW1_BYTES_AVAILABLE: u8 = 0x61;
/// INS of the GET RESPONSE command
pub const GET_RESPONSE_INS: u8 = 0xC0;
/// CLA INS P1 P2 P3
pub const T0_HEADER_LEN: usize = 5;

/// T=1 information field sizes
pub const DEFAULT_IFSC: u8 = 0x20;
/// Smallest IFSC/IFSD accepted
pub const MIN_IFS: u8 = 0x10;
/// Largest IFSC/IFSD accepted
pub const MAX_IFS: u8 = 0xFE;
/// Extra ETU granted on top of BWT/CWT when waiting for a T=1 character
pub const T1_WAIT_MARGIN_ETU: u32 = 4;
/// Invalid-block retries before falling back to RESYNC or giving up
pub const T1_RETRIES_BEFORE_RESYNC: u8 = 2;
/// Total retries for one exchange
pub const T1_MAX_RETRIES: u8 = 6;
/// Exchange rounds without progress before giving up
pub const T1_MAX_ROUNDS: u8 = 10;
/// Protocol restarts (accepted RESYNC) per exchange
pub const T1_MAX_RESTARTS: u8 = 3;

/// Send attempts on the byte link before a transmit failure surfaces
pub const SEND_ATTEMPTS: usize = 5;

/// Response data ceiling (status bytes excluded)
pub const MAX_APDU_RESPONSE_LEN: usize = 512;
