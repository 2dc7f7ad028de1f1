//! Background fetch thread.
//!
//! Requests arrive over a channel; queued requests are coalesced so the
//! worker only ever runs the newest one. Outcomes are published through two
//! triple buffers, one for snapshots and one for static data, so the engine
//! can read the latest of each without blocking.

use std::sync::mpsc;

use super::{
    run_fetch, FetchExecutor, FetchRequest, SnapshotOutcome, StaticOutcome,
};
use crate::error::LiveMapError;
use crate::feed::TransitFeed;

enum WorkerMessage {
    Fetch(FetchRequest),
    Shutdown,
}

/// [`FetchExecutor`] that runs fetches on a dedicated thread.
pub struct FetchWorker {
    request_tx: mpsc::Sender<WorkerMessage>,
    snapshot_result: triple_buffer::Output<Option<SnapshotOutcome>>,
    static_result: triple_buffer::Output<Option<StaticOutcome>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl FetchWorker {
    /// Move `feed` onto a new `fetch-worker` thread.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::ThreadSpawn`] if the thread fails to spawn.
    pub fn spawn<F>(feed: F) -> Result<Self, LiveMapError>
    where
        F: TransitFeed + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (snapshot_input, snapshot_output) =
            triple_buffer::triple_buffer(&None);
        let (static_input, static_output) = triple_buffer::triple_buffer(&None);

        let thread = std::thread::Builder::new()
            .name("fetch-worker".into())
            .spawn(move || {
                thread_loop(feed, &request_rx, snapshot_input, static_input);
            })
            .map_err(LiveMapError::ThreadSpawn)?;

        Ok(Self {
            request_tx,
            snapshot_result: snapshot_output,
            static_result: static_output,
            thread: Some(thread),
        })
    }

    /// Stop the thread after its current fetch and wait for it.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("fetch worker panicked");
            }
        }
    }
}

impl FetchExecutor for FetchWorker {
    fn submit(&mut self, request: FetchRequest) {
        if self.request_tx.send(WorkerMessage::Fetch(request)).is_err() {
            log::warn!("fetch worker is gone; cycle {} dropped", request.cycle);
        }
    }

    fn try_recv_statics(&mut self) -> Option<StaticOutcome> {
        let _ = self.static_result.update();
        self.static_result.output_buffer_mut().take()
    }

    fn try_recv_snapshot(&mut self) -> Option<SnapshotOutcome> {
        let _ = self.snapshot_result.update();
        self.snapshot_result.output_buffer_mut().take()
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FetchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchWorker")
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

fn thread_loop<F: TransitFeed>(
    mut feed: F,
    request_rx: &mpsc::Receiver<WorkerMessage>,
    mut snapshot_input: triple_buffer::Input<Option<SnapshotOutcome>>,
    mut static_input: triple_buffer::Input<Option<StaticOutcome>>,
) {
    log::debug!("fetch worker started for {}", feed.name());
    while let Ok(message) = request_rx.recv() {
        let request = match drain_latest(message, request_rx) {
            WorkerMessage::Shutdown => break,
            WorkerMessage::Fetch(request) => request,
        };
        let (statics, snapshot) = run_fetch(&mut feed, request);
        // Statics before the snapshot; the engine reads in reverse order.
        if statics.is_some() {
            static_input.write(statics);
        }
        snapshot_input.write(Some(snapshot));
    }
    log::debug!("fetch worker stopped");
}

/// Drain queued messages, keeping only the latest.
///
/// A queued entity-only fetch does not replace a pending full fetch: the
/// static data it carries would otherwise be lost until the next refresh.
fn drain_latest(
    initial: WorkerMessage,
    rx: &mpsc::Receiver<WorkerMessage>,
) -> WorkerMessage {
    let mut latest = initial;
    while let Ok(newer) = rx.try_recv() {
        match (&latest, &newer) {
            (WorkerMessage::Shutdown, _) => {}
            (WorkerMessage::Fetch(old), WorkerMessage::Fetch(new))
                if old.is_full() && !new.is_full() =>
            {
                // Keep the full fetch, but answer for the newer cycle.
                latest = WorkerMessage::Fetch(FetchRequest {
                    cycle: new.cycle,
                    scope: old.scope,
                });
            }
            _ => latest = newer,
        }
    }
    latest
}
