//! Shared WiZ control socket
//!
//! One UDP socket carries all bulb traffic: setPilot writes go out on it and
//! getPilot replies come back in on it. A reader task dispatches incoming
//! replies to whichever verification is currently waiting on that bulb's IP;
//! there is at most one waiter per IP because each bulb's pump is serial.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use wizflow_core::{BridgeConfig, PilotState};

use crate::error::Result;
use crate::wiz::protocol;

type PendingMap = Arc<Mutex<HashMap<IpAddr, oneshot::Sender<protocol::PilotResult>>>>;

/// Client side of the WiZ control socket.
pub struct WizClient {
    socket: Arc<UdpSocket>,
    wiz_port: u16,
    pending: PendingMap,
    reader: JoinHandle<()>,
}

impl WizClient {
    /// Bind the control socket and start the reply reader.
    pub async fn bind(config: &BridgeConfig) -> Result<Self> {
        let socket = Arc::new(UdpSocket::bind(config.wiz_bind).await?);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_replies(socket.clone(), pending.clone()));

        Ok(Self {
            socket,
            wiz_port: config.wiz_port,
            pending,
            reader,
        })
    }

    /// Local address of the control socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send a `setPilot` datagram to a bulb. Fire-and-forget: no reply is
    /// awaited; off-transitions are confirmed separately via [`query_pilot`].
    ///
    /// [`query_pilot`]: WizClient::query_pilot
    pub async fn send_set_pilot(&self, ip: Ipv4Addr, pilot: PilotState) -> Result<()> {
        let datagram = protocol::set_pilot_request(pilot);
        self.socket
            .send_to(&datagram, SocketAddr::from((ip, self.wiz_port)))
            .await?;
        trace!("setPilot -> {}: {}", ip, String::from_utf8_lossy(&datagram));
        Ok(())
    }

    /// Ask a bulb for its current pilot and wait up to `timeout` for the
    /// reply. Returns `None` on timeout, send failure, or a malformed reply.
    pub async fn query_pilot(
        &self,
        ip: Ipv4Addr,
        timeout: Duration,
    ) -> Option<protocol::PilotResult> {
        let (tx, rx) = oneshot::channel();
        // A stale waiter for the same IP is displaced; its receiver resolves
        // as cancelled and the caller sees a verification failure.
        self.pending.lock().unwrap().insert(IpAddr::V4(ip), tx);

        let target = SocketAddr::from((ip, self.wiz_port));
        if let Err(e) = self.socket.send_to(protocol::get_pilot_request(), target).await {
            warn!("getPilot send to {} failed: {}", target, e);
            self.pending.lock().unwrap().remove(&IpAddr::V4(ip));
            return None;
        }

        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(_)) => None, // displaced by a newer query
            Err(_) => None,     // timed out
        };
        self.pending.lock().unwrap().remove(&IpAddr::V4(ip));
        result
    }
}

impl Drop for WizClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Reader task: route incoming getPilot replies to the waiter registered
/// for the sender's IP. Anything else on the socket is dropped.
async fn read_replies(socket: Arc<UdpSocket>, pending: PendingMap) {
    let mut buf = [0u8; 2048];
    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("WiZ control socket receive error: {}", e);
                continue;
            }
        };

        let Some(result) = protocol::parse_get_pilot_reply(&buf[..len]) else {
            continue;
        };

        if let Some(waiter) = pending.lock().unwrap().remove(&src.ip()) {
            // The waiter may have just timed out; nothing to do then.
            let _ = waiter.send(result);
        } else {
            trace!("unsolicited getPilot reply from {}", src);
        }
    }
}
