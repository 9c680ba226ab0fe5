//! Bridge process supervision
//!
//! The bridge runs as a child process of the controller so that a crashed
//! bridge can never prevent its own restart. The supervisor owns nothing but
//! the child handle and the backoff counters: on child exit it restarts with
//! `min(2^n * 1s, 60s)`, where `n` resets once the child has stayed up for
//! the reset window. An orderly stop kills the child and cancels any pending
//! restart.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// A child that stays up this long gets its backoff exponent reset.
pub const BACKOFF_RESET_WINDOW: Duration = Duration::from_secs(60);

/// Upper bound on the restart delay.
pub const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Restart delay for the `n`-th consecutive fast exit.
pub fn backoff_delay(consecutive: u32) -> Duration {
    // 2^6 already exceeds the cap; avoid shifting into overflow.
    let exp = consecutive.min(6);
    BACKOFF_CAP.min(Duration::from_secs(1 << exp))
}

/// Observable supervisor state.
#[derive(Debug, Clone, Default)]
pub struct SupervisorStatus {
    /// Whether a child is currently running.
    pub running: bool,
    /// Total restarts since the supervisor was created.
    pub restarts: u32,
    /// Wall-clock time of the most recent restart.
    pub last_restart: Option<SystemTime>,
}

/// Supervises one child process.
pub struct Supervisor {
    program: PathBuf,
    args: Vec<String>,
    status: Arc<Mutex<SupervisorStatus>>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Create a supervisor for `program args...`. Nothing runs until
    /// [`start`] is called.
    ///
    /// [`start`]: Supervisor::start
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            status: Arc::new(Mutex::new(SupervisorStatus::default())),
            stop_tx: None,
            task: None,
        }
    }

    /// Spawn the supervision loop. Returns false if it is already running.
    pub fn start(&mut self) -> bool {
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(
            self.program.clone(),
            self.args.clone(),
            self.status.clone(),
            stop_rx,
        ));
        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        true
    }

    /// Stop the child and the supervision loop. Pending restarts are
    /// cancelled; the backoff exponent starts from zero on the next
    /// [`start`].
    ///
    /// [`start`]: Supervisor::start
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.status.lock().unwrap().running = false;
    }

    /// Current status snapshot.
    pub fn status(&self) -> SupervisorStatus {
        self.status.lock().unwrap().clone()
    }
}

async fn supervise(
    program: PathBuf,
    args: Vec<String>,
    status: Arc<Mutex<SupervisorStatus>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut consecutive: u32 = 0;

    loop {
        let started_at = Instant::now();
        let child = Command::new(&program)
            .args(&args)
            .kill_on_drop(true)
            .spawn();

        match child {
            Ok(mut child) => {
                info!("bridge started (pid {:?})", child.id());
                status.lock().unwrap().running = true;

                tokio::select! {
                    exit = child.wait() => match exit {
                        Ok(exit_status) => warn!("bridge exited: {}", exit_status),
                        Err(e) => error!("failed waiting on bridge: {}", e),
                    },
                    _ = stop_rx.changed() => {
                        info!("stopping bridge");
                        if let Err(e) = child.kill().await {
                            warn!("failed to kill bridge: {}", e);
                        }
                        status.lock().unwrap().running = false;
                        return;
                    }
                }
            }
            Err(e) => error!("failed to spawn bridge {:?}: {}", program, e),
        }
        status.lock().unwrap().running = false;

        // A child that stayed up long enough earns a fresh backoff.
        if started_at.elapsed() >= BACKOFF_RESET_WINDOW {
            consecutive = 0;
        }
        let delay = backoff_delay(consecutive);
        consecutive = consecutive.saturating_add(1);

        {
            let mut status = status.lock().unwrap();
            status.restarts = status.restarts.saturating_add(1);
            status.last_restart = Some(SystemTime::now());
            warn!(
                "restarting bridge in {:?} (restart #{})",
                delay, status.restarts
            );
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop_rx.changed() => {
                info!("restart cancelled");
                return;
            }
        }
    }
}
