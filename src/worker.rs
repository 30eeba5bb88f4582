use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};

use crate::block::SavedBlock;
use crate::context::FormatSnapshot;
use crate::emit::emit_all_cooperative;
use crate::error::CoreError;

/// How long `abort` blocks waiting for the worker thread to hand its block
/// back before giving up and leaving the FIFO without it.
const ABORT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What a background format job produced, paired with the block it
/// consumed so the caller can reclaim it on an error or an abort.
struct Outcome {
    block: SavedBlock,
    result: Result<Option<String>, CoreError>,
}

/// Handle to a single in-flight background format job.
///
/// At most one may be active per `Environment` — the environment holds this
/// behind an `Option` and refuses a second `start` while one is present.
/// The worker thread owns the dequeued block for the run's duration and,
/// whatever the outcome, sends it back over a bounded handoff channel so the
/// caller thread — never the worker — performs any FIFO mutation.
pub struct FormatWorkerHandle {
    abort: Arc<AtomicBool>,
    outcome_rx: Receiver<Outcome>,
    join: Option<thread::JoinHandle<()>>,
}

/// What the caller should do once a worker's outcome has been observed.
pub enum WorkerCompletion {
    /// The emit finished; here is the text to deliver to the caller's
    /// callback. The block is fully consumed and not returned.
    Succeeded(String),
    /// The emit failed; the block is handed back for re-enqueue at the FIFO
    /// front, and the error should reach the caller's callback.
    Failed(SavedBlock, CoreError),
    /// The job was aborted before it finished; the block is handed back
    /// untouched and any partial output is discarded.
    Aborted(SavedBlock),
}

impl FormatWorkerHandle {
    /// Move `block` to a background thread and start emitting it against
    /// `source`. Returns immediately; poll with [`Self::try_complete`] or
    /// block with [`Self::abort`].
    #[must_use]
    pub fn start(block: SavedBlock, source: FormatSnapshot, emit_std_prefix: bool) -> Self {
        let abort = Arc::new(AtomicBool::new(false));
        let (outcome_tx, outcome_rx) = bounded(1);
        let worker_abort = Arc::clone(&abort);

        let join = thread::Builder::new()
            .name("logpp-core-format-worker".into())
            .spawn(move || {
                tracing::info!("format worker starting");
                let result = emit_all_cooperative(&block, &source, emit_std_prefix, &worker_abort);
                match &result {
                    Ok(Some(_)) => tracing::info!("format worker completed"),
                    Ok(None) => tracing::info!("format worker aborted"),
                    Err(err) => tracing::info!(%err, "format worker failed"),
                }
                if outcome_tx.send(Outcome { block, result }).is_err() {
                    tracing::warn!("format worker outcome dropped: no receiver");
                }
            })
            .expect("failed to spawn format worker thread");

        Self {
            abort,
            outcome_rx,
            join: Some(join),
        }
    }

    /// Non-blocking check for a finished job, consuming `self` either way a
    /// result is produced isn't meaningful to retry on the same handle.
    #[must_use]
    pub fn try_complete(&self) -> Option<WorkerCompletion> {
        self.outcome_rx.try_recv().ok().map(Self::into_completion)
    }

    /// Request cooperative cancellation and block (up to a bounded timeout)
    /// for the worker thread to hand its block back.
    ///
    /// If the timeout elapses the worker is presumed wedged; the block is
    /// lost rather than risking an unbounded caller-thread stall, and this
    /// is logged at `warn!`.
    #[must_use]
    pub fn abort(self) -> Option<WorkerCompletion> {
        self.abort.store(true, Ordering::Relaxed);
        match self.outcome_rx.recv_timeout(ABORT_JOIN_TIMEOUT) {
            Ok(outcome) => Some(Self::into_completion(outcome)),
            Err(_) => {
                tracing::warn!("format worker did not respond to abort within timeout; block lost");
                None
            }
        }
    }

    fn into_completion(outcome: Outcome) -> WorkerCompletion {
        match outcome.result {
            Ok(Some(text)) => WorkerCompletion::Succeeded(text),
            Ok(None) => WorkerCompletion::Aborted(outcome.block),
            Err(err) => WorkerCompletion::Failed(outcome.block, err),
        }
    }
}

impl Drop for FormatWorkerHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            if !join.is_finished() {
                self.abort.store(true, Ordering::Relaxed);
            }
            let _ = join.join();
        }
    }
}
