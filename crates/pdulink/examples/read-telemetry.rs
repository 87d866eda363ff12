//! Print telemetry from a PDU for a few seconds, then switch rail 1 off.
//!
//! ```sh
//! cargo run -p pdulink --example read-telemetry -- /dev/ttyACM0
//! ```

use std::time::{Duration, Instant};

use pdulink::link::{LinkConfig, LinkMessage, LinkSession};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args().nth(1).unwrap_or_else(|| "USB".to_string());
    let session = LinkSession::open(&port, &LinkConfig::default())?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match session.telemetry().recv_timeout(Duration::from_millis(250)) {
            Some(LinkMessage::Telemetry(t)) => {
                println!("total: {:?} V, {:?} A", t.voltage[0], t.current[0]);
            }
            Some(LinkMessage::Event(event)) => {
                println!("rail {}: {}", event.rail, event.diagnostic);
            }
            None if !session.is_running() => break,
            None => {}
        }
    }

    session.send_command(1, false)?;
    let exit = session.stop()?;
    println!("read loop exit: {exit:?}");
    Ok(())
}
