//! LAN bulb discovery
//!
//! Broadcasts a `getPilot` to 255.255.255.255:38899 and collects replies
//! until the deadline. Every bulb on the segment answers with its MAC, so
//! one scan maps the fleet without any vendor cloud involvement.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use wizflow_core::normalize_mac;

use crate::error::Result;
use crate::wiz::protocol::{self, PilotResult};

/// A bulb seen during a discovery scan.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredBulb {
    /// Canonical MAC address (lowercase, colon-separated).
    pub mac: String,
    /// Address the reply came from.
    pub ip: IpAddr,
    /// Full getPilot payload: state, dimming, rssi and whatever else the
    /// firmware reported.
    pub result: PilotResult,
}

/// Scan the local segment via directed broadcast.
pub async fn discover(window: Duration, wiz_port: u16) -> Result<Vec<DiscoveredBulb>> {
    discover_at(
        SocketAddr::from(([255, 255, 255, 255], wiz_port)),
        window,
    )
    .await
}

/// Scan by probing an explicit target address.
///
/// Split out from [`discover`] so tests can point the probe at a loopback
/// responder instead of the broadcast address.
pub async fn discover_at(target: SocketAddr, window: Duration) -> Result<Vec<DiscoveredBulb>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.set_broadcast(true)?;
    socket.send_to(protocol::get_pilot_request(), target).await?;
    debug!("discovery probe sent to {}", target);

    let deadline = Instant::now() + window;
    let mut found: Vec<DiscoveredBulb> = Vec::new();
    let mut buf = [0u8; 2048];

    loop {
        let received = tokio::select! {
            received = socket.recv_from(&mut buf) => received,
            _ = tokio::time::sleep_until(deadline) => break,
        };

        let (len, src) = match received {
            Ok(received) => received,
            Err(e) => {
                // A single bad datagram must not abort the scan.
                trace!("discovery receive error: {}", e);
                continue;
            }
        };

        let Some(result) = protocol::parse_get_pilot_reply(&buf[..len]) else {
            trace!("ignoring non-pilot datagram from {}", src);
            continue;
        };
        let Some(mac) = result.mac.as_deref().and_then(normalize_mac) else {
            trace!("ignoring pilot reply without usable mac from {}", src);
            continue;
        };

        // Bulbs answer broadcast probes more than once; report each MAC once.
        if found.iter().any(|bulb| bulb.mac == mac) {
            continue;
        }
        debug!("discovered {} at {}", mac, src.ip());
        found.push(DiscoveredBulb {
            mac,
            ip: src.ip(),
            result,
        });
    }

    info!("discovery finished: {} bulb(s)", found.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discovery_deduplicates_by_mac() {
        // Stand-in bulb endpoint: receives the probe, then replies twice for
        // each of two MACs (bulbs answer broadcasts repeatedly).
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap();

        let responder_task = tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            let (_, src) = responder.recv_from(&mut buf).await.unwrap();
            for _ in 0..2 {
                responder
                    .send_to(
                        br#"{"method":"getPilot","result":{"mac":"aabbccddee01","state":true,"rssi":-58,"dimming":42}}"#,
                        src,
                    )
                    .await
                    .unwrap();
                responder
                    .send_to(
                        br#"{"method":"getPilot","result":{"mac":"aabbccddee02","state":false}}"#,
                        src,
                    )
                    .await
                    .unwrap();
            }
            // Noise on the wire is ignored.
            responder.send_to(b"{]", src).await.unwrap();
        });

        let found = discover_at(target, Duration::from_millis(300)).await.unwrap();
        responder_task.await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].mac, "aa:bb:cc:dd:ee:01");
        assert!(found[0].result.state);
        assert_eq!(found[0].result.rssi, Some(-58));
        assert_eq!(found[1].mac, "aa:bb:cc:dd:ee:02");
    }

    #[tokio::test]
    async fn test_discovery_empty_segment() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let found = discover_at(silent.local_addr().unwrap(), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
