//! Per-bulb pump
//!
//! Each configured bulb gets one tokio task that drains its queue serially:
//! at most one send (plus its off-verification) is ever in flight per bulb.
//! Pumps for different bulbs are fully independent; there is no ordering
//! across bulbs.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use wizflow_core::{BridgeConfig, BulbRecord, PilotState};

use crate::bridge::queue::{BulbStats, PilotQueue, QueuedPilot, StatsSnapshot};
use crate::wiz::WizClient;

/// Mailbox messages accepted by a pump task.
enum PumpMsg {
    /// A changed pilot vector from the DMX path.
    Pilot(PilotState),
    /// Refreshed record after a store reload (the IP may have moved).
    Record(BulbRecord),
}

/// Engine-side handle to one bulb's pump task.
pub(crate) struct BulbHandle {
    tx: mpsc::UnboundedSender<PumpMsg>,
    stats: Arc<BulbStats>,
    _task: JoinHandle<()>,
}

impl BulbHandle {
    /// Spawn the pump task for `record`.
    pub(crate) fn spawn(record: BulbRecord, client: Arc<WizClient>, config: &BridgeConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(BulbStats::default());
        let pump = Pump {
            record,
            client,
            queue: PilotQueue::new(config.queue_capacity),
            last_sent: PilotState::default(),
            stats: stats.clone(),
            post_off_delay: config.post_off_delay(),
            verify_timeout: config.verify_timeout(),
            max_off_retries: config.max_off_retries,
            rx,
        };
        let task = tokio::spawn(pump.run());
        Self {
            tx,
            stats,
            _task: task,
        }
    }

    /// Hand a changed pilot vector to the pump.
    pub(crate) fn enqueue(&self, pilot: PilotState) {
        let _ = self.tx.send(PumpMsg::Pilot(pilot));
    }

    /// Push the refreshed record after a store reload.
    pub(crate) fn update_record(&self, record: BulbRecord) {
        let _ = self.tx.send(PumpMsg::Record(record));
    }

    /// Read this bulb's counters.
    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

struct Pump {
    record: BulbRecord,
    client: Arc<WizClient>,
    queue: PilotQueue,
    last_sent: PilotState,
    stats: Arc<BulbStats>,
    post_off_delay: std::time::Duration,
    verify_timeout: std::time::Duration,
    max_off_retries: u8,
    rx: mpsc::UnboundedReceiver<PumpMsg>,
}

impl Pump {
    async fn run(mut self) {
        loop {
            if self.queue.is_empty() {
                // Idle: park until the engine sends something, or exit once
                // the engine has dropped this bulb.
                match self.rx.recv().await {
                    Some(msg) => self.accept(msg),
                    None => break,
                }
            }
            // Pull in everything that arrived while the last send was in
            // flight before deciding what to transmit next.
            while let Ok(msg) = self.rx.try_recv() {
                self.accept(msg);
            }

            if let Some(item) = self.queue.pop() {
                self.process(item).await;
            }
        }
        trace!("pump for {} stopped", self.record.mac);
    }

    fn accept(&mut self, msg: PumpMsg) {
        match msg {
            PumpMsg::Pilot(pilot) => {
                if self.queue.push(QueuedPilot::new(pilot)).is_some() {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("queue full for {}, dropped oldest", self.record.label());
                }
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
            }
            PumpMsg::Record(record) => {
                if record.ip != self.record.ip {
                    debug!(
                        "{} moved {} -> {}",
                        record.mac, self.record.ip, record.ip
                    );
                }
                self.record = record;
            }
        }
    }

    /// One pump step: coalesce, encode, send, verify if this was an
    /// off-transition.
    async fn process(&mut self, item: QueuedPilot) {
        let state_changed = item.pilot.state != self.last_sent.state;

        // Identical updates that piled up while a send was in flight
        // coalesce away; the drain continues with the next entry.
        if item.pilot == self.last_sent {
            trace!("coalesced no-op update for {}", self.record.label());
            return;
        }

        // Codec-layer suppression: never stream lights-off datagrams at an
        // already-off bulb on every dark DMX frame.
        if item.pilot.state || state_changed {
            if let Err(e) = self.client.send_set_pilot(self.record.ip, item.pilot).await {
                // Lossy data plane: log and keep draining.
                warn!("setPilot send to {} failed: {}", self.record.ip, e);
            }
        } else {
            trace!("suppressed off resend to {}", self.record.label());
        }
        self.stats.sent.fetch_add(1, Ordering::Relaxed);

        if state_changed && !item.pilot.state {
            self.verify_off(item).await;
        } else {
            self.last_sent = item.pilot;
        }
    }

    /// Confirm that an off-transition actually stuck.
    ///
    /// Turning off is the one operation users notice when it silently fails,
    /// so it is read back and re-queued up to `max_off_retries` times.
    async fn verify_off(&mut self, item: QueuedPilot) {
        // Give the bulb a moment to apply the command before reading back.
        tokio::time::sleep(self.post_off_delay).await;

        let reply = self
            .client
            .query_pilot(self.record.ip, self.verify_timeout)
            .await;
        // No reply counts as a failed verification.
        let confirmed_off = matches!(&reply, Some(result) if !result.state);

        if confirmed_off {
            debug!("{} confirmed off", self.record.label());
            self.last_sent = item.pilot;
            return;
        }

        if item.retry < self.max_off_retries {
            debug!(
                "{} still on, re-queueing off command (attempt {}/{})",
                self.record.label(),
                item.retry + 1,
                self.max_off_retries
            );
            if self
                .queue
                .push(QueuedPilot {
                    pilot: item.pilot,
                    retry: item.retry + 1,
                })
                .is_some()
            {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
            self.stats.queued.fetch_add(1, Ordering::Relaxed);
            // last_sent keeps its old state so the retry still reads as an
            // off-transition.
        } else {
            error!(
                "{} failed to turn off after {} retries, giving up",
                self.record.label(),
                self.max_off_retries
            );
            // Record the intended state anyway so future coalescing works.
            self.last_sent = item.pilot;
        }
    }
}
