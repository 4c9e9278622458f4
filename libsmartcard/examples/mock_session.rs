// Drive a simulated T=1 card through power-on, IFSD negotiation and one
// APDU exchange. Run with RUST_LOG=debug to follow the protocol:
//
//   RUST_LOG=debug cargo run -p libsmartcard --example mock_session

use libsmartcard::prelude::*;
use libsmartcard::protocol::Block;
use libsmartcard::protocol::block::pcb;
use libsmartcard::test_support::{card_block, t1_atr};
use libsmartcard::transport::MockTransport;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Script the card: ATR, IFS response, then an answer to SELECT
    let mut mock = MockTransport::new();
    mock.push_bytes(&t1_atr());
    mock.push_bytes(&card_block(&Block::supervisory(pcb::S_IFS_RESPONSE, &[0xFE])));
    mock.push_bytes(&card_block(&Block::information(
        false,
        false,
        &[0x6F, 0x00, 0x90, 0x00],
    )));

    let mut session = SessionBuilder::new()
        .with_transport(mock)
        .with_config(SessionConfig::default())
        .build_uninitialized()?
        .initialize()?;

    session.power_on_atr(ResetType::Cold)?;
    if let Some(atr) = session.atr() {
        println!("ATR: {}", atr);
    }
    println!(
        "protocol {} at {} baud, IFSC {}",
        session.protocol_type(),
        session.timing().baud_rate,
        session.ifsc()
    );

    session.negotiate_ifsd()?;

    let select = [0x00, 0xA4, 0x04, 0x00, 0x00];
    let response = session.data_exchange_t1(Prologue::information(select.len() as u8), &select)?;
    println!(
        "response {} SW={:04X}",
        to_hex_spaced(&response.data),
        response.status_word()
    );

    session.shutdown();
    println!("sent: {}", HexBytes(&session.transport().sent));
    Ok(())
}
