use std::net::TcpListener;
use std::sync::mpsc::Sender;

use log::{error, info};

use crate::error::{NodeError, Result};
use crate::network::PeerConn;

/// Accept loop: every inbound connection becomes a peer handle on the
/// shared work channel. Returns when the channel's consumer is gone.
pub fn start(port: u16, peer_tx: Sender<PeerConn>) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .map_err(|e| NodeError::Io(format!("failed to bind TCP port {port}: {e}")))?;
    info!("TCP peer listener on port {port}");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if peer_tx.send(PeerConn::new(stream)).is_err() {
                    info!("Peer channel closed, stopping listener");
                    return Ok(());
                }
            }
            Err(e) => error!("Error accepting connection: {e}"),
        }
    }
    Ok(())
}
