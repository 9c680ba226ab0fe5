//! Art-Net to WiZ bridge engine
//!
//! One task multiplexes the Art-Net socket, the bulb store reload tick and
//! the stats tick; every configured bulb gets its own serial pump task. The
//! engine's job per DMX frame is cheap: decode, slice each bulb's six slots,
//! drop no-op vectors, and hand the changed ones to the pumps.
//!
//! Consoles stream at 30-44 Hz whether or not the scene changes; without the
//! change gate the bulb network would be saturated by redundant traffic.

pub mod queue;
mod pump;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use wizflow_core::{BridgeConfig, BulbRecord, PilotState};

use crate::artnet;
use crate::error::Result;
use crate::store::BulbStore;
use crate::wiz::WizClient;

use pump::BulbHandle;
pub use queue::{PilotQueue, QueuedPilot, StatsSnapshot};

/// The bridge engine.
///
/// Owns the Art-Net receive socket, the shared WiZ control socket, the
/// current bulb snapshot and one pump per bulb. Constructed with [`bind`],
/// driven by [`run`].
///
/// [`bind`]: BridgeEngine::bind
/// [`run`]: BridgeEngine::run
pub struct BridgeEngine {
    config: BridgeConfig,
    store: Arc<dyn BulbStore>,
    client: Arc<WizClient>,
    socket: UdpSocket,
    /// Snapshot from the most recent successful store reload.
    bulbs: Vec<BulbRecord>,
    /// Pump per configured bulb, keyed by canonical MAC.
    pumps: HashMap<String, BulbHandle>,
    /// Change-detection cache: last vector observed on the wire per MAC.
    last_received: HashMap<String, PilotState>,
}

impl BridgeEngine {
    /// Bind both sockets and load the initial bulb snapshot.
    ///
    /// A bind failure here is fatal to the bridge process; the supervisor
    /// restarts it with backoff.
    pub async fn bind(config: BridgeConfig, store: Arc<dyn BulbStore>) -> Result<Self> {
        let socket = UdpSocket::bind(config.artnet_bind).await?;
        let client = Arc::new(WizClient::bind(&config).await?);
        info!(
            "bridge listening for Art-Net on {} (universe {}), WiZ control on {}",
            socket.local_addr()?,
            config.universe,
            client.local_addr()?,
        );

        let mut engine = Self {
            config,
            store,
            client,
            socket,
            bulbs: Vec::new(),
            pumps: HashMap::new(),
            last_received: HashMap::new(),
        };
        engine.reload();
        Ok(engine)
    }

    /// Local address of the Art-Net socket (ephemeral in tests).
    pub fn artnet_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Local address of the WiZ control socket.
    pub fn wiz_addr(&self) -> Result<SocketAddr> {
        self.client.local_addr()
    }

    /// Drive the bridge until `shutdown` flips to true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut reload_tick = interval_at(
            Instant::now() + self.config.reload_interval(),
            self.config.reload_interval(),
        );
        reload_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_tick = interval_at(
            Instant::now() + self.config.stats_interval(),
            self.config.stats_interval(),
        );
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // ArtDmx caps at 18 bytes of header plus 512 slots.
        let mut buf = [0u8; 1024];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, _src)) => self.handle_datagram(&buf[..len]),
                    Err(e) => warn!("Art-Net socket receive error: {}", e),
                },
                _ = reload_tick.tick() => self.reload(),
                _ = stats_tick.tick() => self.log_stats(),
                _ = shutdown.changed() => {
                    info!("bridge shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Decode one datagram and fan changed vectors out to the pumps.
    fn handle_datagram(&mut self, datagram: &[u8]) {
        let Some(frame) = artnet::parse_art_dmx(datagram) else {
            return;
        };
        if frame.universe != self.config.universe {
            return;
        }

        for record in &self.bulbs {
            let pilot = PilotState::from_dmx_slots(frame.data, record.channel);

            // Change gate: skip vectors identical to the last one seen for
            // this bulb. The cache starts all-off, so an initial dark frame
            // is already a no-op.
            let prev = self.last_received.entry(record.mac.clone()).or_default();
            if *prev == pilot {
                continue;
            }
            *prev = pilot;

            if let Some(handle) = self.pumps.get(&record.mac) {
                handle.enqueue(pilot);
            }
        }
    }

    /// Pull the current bulb list from the store and reconcile the pumps.
    ///
    /// On failure the previous snapshot stays in effect; the next tick tries
    /// again.
    fn reload(&mut self) {
        let records = match self.store.read_all() {
            Ok(records) => records,
            Err(e) => {
                warn!("bulb store reload failed, keeping previous snapshot: {}", e);
                return;
            }
        };

        let mut bulbs = Vec::with_capacity(records.len());
        for mut record in records {
            if let Err(e) = record.validate() {
                warn!("skipping bulb record {:?}: {}", record.mac, e);
                continue;
            }
            bulbs.push(record);
        }

        // Runtime state lives exactly as long as the MAC stays configured.
        self.pumps
            .retain(|mac, _| bulbs.iter().any(|record| &record.mac == mac));
        self.last_received
            .retain(|mac, _| bulbs.iter().any(|record| &record.mac == mac));

        for record in &bulbs {
            match self.pumps.get(&record.mac) {
                Some(handle) => handle.update_record(record.clone()),
                None => {
                    debug!("starting pump for {} ({})", record.label(), record.ip);
                    let handle =
                        BulbHandle::spawn(record.clone(), self.client.clone(), &self.config);
                    self.pumps.insert(record.mac.clone(), handle);
                }
            }
        }

        info!("bulb snapshot reloaded: {} bulb(s)", bulbs.len());
        self.bulbs = bulbs;
    }

    fn log_stats(&self) {
        for record in &self.bulbs {
            if let Some(handle) = self.pumps.get(&record.mac) {
                let stats = handle.stats();
                info!(
                    "{}: queued={} sent={} dropped={}",
                    record.label(),
                    stats.queued,
                    stats.sent,
                    stats.dropped
                );
            }
        }
    }
}
