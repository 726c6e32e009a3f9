//! Single-flight periodic reconcile.
//!
//! [`ReconcileGate`] guarantees at most one reconcile in flight per manager.
//! [`spawn_refresher`] drives the gate on a timer and publishes each result
//! as an immutable snapshot; observers read snapshots rather than sharing
//! mutable assets.

use crate::asset_manager::AssetManager;
use crate::error::{CloudError, CloudResult};
use automation_types::AssetSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Latest published reconcile result; `None` until the first one lands.
pub type Snapshot = Option<Arc<AssetSet>>;

/// Owns the right to reconcile one manager.
pub struct ReconcileGate {
    manager: Arc<AssetManager>,
    busy: Mutex<()>,
}

impl ReconcileGate {
    pub fn new(manager: Arc<AssetManager>) -> Self {
        Self {
            manager,
            busy: Mutex::new(()),
        }
    }

    pub fn manager(&self) -> &AssetManager {
        &self.manager
    }

    pub fn is_busy(&self) -> bool {
        self.busy.try_lock().is_err()
    }

    /// Reconciles unless another reconcile holds the gate, in which case
    /// this returns [`CloudError::ReconcileInProgress`] without waiting.
    pub async fn try_reconcile(&self) -> CloudResult<AssetSet> {
        let _guard = self
            .busy
            .try_lock()
            .map_err(|_| CloudError::ReconcileInProgress)?;
        self.manager.reconcile().await
    }
}

enum RefreshCommand {
    Refresh,
    Stop,
}

/// Handle for controlling a running refresher and reading its snapshots.
#[derive(Clone)]
pub struct RefreshHandle {
    command_tx: mpsc::Sender<RefreshCommand>,
    snapshots: watch::Receiver<Snapshot>,
}

impl RefreshHandle {
    pub async fn stop(&self) -> CloudResult<()> {
        self.command_tx
            .send(RefreshCommand::Stop)
            .await
            .map_err(|_| CloudError::RefresherStopped)
    }

    /// Requests a reconcile now rather than at the next tick.
    pub async fn refresh_now(&self) -> CloudResult<()> {
        self.command_tx
            .send(RefreshCommand::Refresh)
            .await
            .map_err(|_| CloudError::RefresherStopped)
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }
}

/// Starts a task that reconciles through `gate` every `interval`, the first
/// time immediately.
///
/// Ticks that find the gate busy are skipped. Failed reconciles are logged
/// and leave the previous snapshot in place.
pub fn spawn_refresher(
    gate: Arc<ReconcileGate>,
    interval: Duration,
) -> (RefreshHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (snapshot_tx, snapshot_rx) = watch::channel(None);

    let handle = RefreshHandle {
        command_tx,
        snapshots: snapshot_rx,
    };
    let task = tokio::spawn(run(gate, interval, command_rx, snapshot_tx));
    (handle, task)
}

async fn run(
    gate: Arc<ReconcileGate>,
    interval: Duration,
    mut command_rx: mpsc::Receiver<RefreshCommand>,
    snapshot_tx: watch::Sender<Snapshot>,
) {
    info!("refresher started, interval {interval:?}");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh_once(&gate, &snapshot_tx).await;
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(RefreshCommand::Refresh) => {
                        refresh_once(&gate, &snapshot_tx).await;
                        ticker.reset();
                    }
                    Some(RefreshCommand::Stop) => {
                        info!("refresher stopping");
                        break;
                    }
                    None => {
                        info!("command channel closed, stopping refresher");
                        break;
                    }
                }
            }
        }
    }

    info!("refresher stopped");
}

async fn refresh_once(gate: &ReconcileGate, snapshot_tx: &watch::Sender<Snapshot>) {
    match gate.try_reconcile().await {
        Ok(assets) => {
            debug!("publishing snapshot of {} assets", assets.len());
            snapshot_tx.send_replace(Some(Arc::new(assets)));
        }
        Err(CloudError::ReconcileInProgress) => {
            debug!("reconcile already in flight, skipping tick");
        }
        Err(e) => {
            warn!("periodic reconcile failed: {e}");
        }
    }
}
