//! Background snapshot optimization.
//!
//! After an LZ4 snapshot is committed, a worker opportunistically re-encodes
//! it as Zstd into `cache/v<N>_optimized.zstd` for better cold-read cost.
//! Single producer (the commit pipeline), single consumer (one worker
//! thread), bounded channel in between. The pass is strictly best-effort:
//! every failure is logged and dropped, the primary artifact is never
//! touched, and the optimized file appears only via atomic rename so a
//! partial write can never be resolved as an artifact.

use crate::error::{ErrorKind, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use dgit_compress::transcode;
use dgit_storage::Layout;
use std::thread::JoinHandle;
use tracing::{debug, warn};

const QUEUE_DEPTH: usize = 16;

/// A request to re-encode one version's snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizeRequest {
    pub version: u64,
}

/// Handle to the background optimization worker.
///
/// Dropping (or [`shutdown`](Self::shutdown)) disconnects the queue; the
/// worker drains what it already accepted and exits.
#[derive(Debug)]
pub struct Optimizer {
    sender: Option<Sender<OptimizeRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl Optimizer {
    /// Spawn the worker thread for a repository.
    pub fn spawn(layout: Layout) -> Result<Self> {
        let (sender, receiver) = bounded(QUEUE_DEPTH);
        let worker = std::thread::Builder::new()
            .name("dgit-optimize".to_string())
            .spawn(move || worker_loop(&layout, &receiver))
            .map_err(ErrorKind::Io)?;
        Ok(Self { sender: Some(sender), worker: Some(worker) })
    }

    /// Queue a version for optimization.
    ///
    /// Never blocks the commit path: when the queue is full the request is
    /// dropped — a later commit or a fresh repository open can requeue it.
    pub fn enqueue(&self, version: u64) {
        let Some(sender) = &self.sender else { return };
        match sender.try_send(OptimizeRequest { version }) {
            Ok(()) => debug!(version, "optimization queued"),
            Err(TrySendError::Full(_)) => warn!(version, "optimization queue full, dropping request"),
            Err(TrySendError::Disconnected(_)) => warn!(version, "optimizer stopped, dropping request"),
        }
    }

    /// Disconnect the queue and wait for the worker to drain and exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("optimizer worker panicked");
        }
    }
}

impl Drop for Optimizer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(layout: &Layout, receiver: &Receiver<OptimizeRequest>) {
    while let Ok(request) = receiver.recv() {
        optimize_one(layout, request.version);
    }
}

/// Re-encode one snapshot. All failures are non-fatal.
fn optimize_one(layout: &Layout, version: u64) {
    let source = layout.version_snapshot(version);
    if !source.is_file() {
        debug!(version, "snapshot gone before optimization, skipping");
        return;
    }
    let target = layout.optimized_snapshot(version);
    if target.is_file() {
        return;
    }
    let scratch = layout.scratch(&format!("optimize_v{version}.zstd"));
    match transcode::lz4_to_zstd(&source, &scratch) {
        Ok(bytes) => {
            if let Err(err) = std::fs::rename(&scratch, &target) {
                warn!(version, error = %err, "failed to publish optimized snapshot");
                let _ = std::fs::remove_file(&scratch);
            } else {
                debug!(version, bytes, "snapshot optimized to zstd");
            }
        },
        Err(err) => {
            warn!(version, error = %err, "background optimization failed");
        },
    }
}
