use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::block::SavedBlock;
use crate::context::{FormatSnapshot, FormatSource};
use crate::error::CoreError;
use crate::level::Level;
use crate::registry::{FormatDescriptor, FormatRegistry};
use crate::selector::{FormatEntryKind, FormatSelector};
use crate::worker::{FormatWorkerHandle, WorkerCompletion};

type AsyncCallback = Box<dyn FnOnce(Result<String, CoreError>) + Send>;

/// Category id reserved by the wire format; never enabled.
pub const INVALID_CATEGORY: i64 = 0;
/// The always-present, always-enabled default category.
pub const DEFAULT_CATEGORY: i64 = 1;

/// Per-message triage state, carried on the environment so a `process_msgs`
/// call that returns mid-message (hit `epos` before an `End` tag) resumes
/// correctly on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IngestMode {
    Normal,
    Discarding,
    Saving,
}

/// Process-wide configuration, registry, saved-block FIFO, and worker
/// handle.
///
/// This is an owned value the embedder constructs once (`Environment::new`)
/// and holds for the process's lifetime — see the design notes on why this
/// crate does not reach for a global `static` to model "process-wide single
/// instance".
pub struct Environment {
    enabled_level: Level,
    categories: HashMap<i64, String>,
    host_name: String,
    app_name: String,

    msg_time_limit_ms: i64,
    msg_slot_limit: usize,

    pub(crate) registry: FormatRegistry,

    pub(crate) fifo: VecDeque<SavedBlock>,
    pub(crate) mode: IngestMode,

    worker: Option<FormatWorkerHandle>,
    pending_callback: Option<AsyncCallback>,
}

impl Environment {
    #[must_use]
    pub fn new(level: Level, host_name: impl Into<String>, app_name: impl Into<String>) -> Self {
        let mut categories = HashMap::new();
        categories.insert(DEFAULT_CATEGORY, "$default".to_string());

        Self {
            enabled_level: level,
            categories,
            host_name: host_name.into(),
            app_name: app_name.into(),
            msg_time_limit_ms: 500,
            msg_slot_limit: 4096,
            registry: FormatRegistry::new(),
            fifo: VecDeque::new(),
            mode: IngestMode::Normal,
            worker: None,
            pending_callback: None,
        }
    }

    // --- level -----------------------------------------------------------

    #[must_use]
    pub fn emit_level(&self) -> Level {
        self.enabled_level
    }

    pub fn set_emit_level(&mut self, level: Level) {
        self.enabled_level = level;
    }

    // --- thresholds --------------------------------------------------------

    #[must_use]
    pub fn msg_time_limit_ms(&self) -> i64 {
        self.msg_time_limit_ms
    }

    pub fn set_msg_time_limit_ms(&mut self, limit: i64) {
        self.msg_time_limit_ms = limit;
    }

    #[must_use]
    pub fn msg_slot_limit(&self) -> usize {
        self.msg_slot_limit
    }

    pub fn set_msg_slot_limit(&mut self, limit: usize) {
        self.msg_slot_limit = limit;
    }

    // --- identity ----------------------------------------------------------

    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    // --- categories ----------------------------------------------------------

    /// Register (or rename) a category. Rejects negative and reserved-zero
    /// ids with [`CoreError::BadArguments`].
    pub fn add_category(&mut self, id: i64, name: impl Into<String>) -> Result<(), CoreError> {
        if id <= INVALID_CATEGORY {
            return Err(CoreError::BadArguments {
                what: "add_category",
                detail: format!("category id must be positive, got {id}"),
            });
        }
        self.categories.insert(id, name.into());
        Ok(())
    }

    #[must_use]
    pub fn category_name(&self, id: i64) -> Option<&str> {
        self.categories.get(&id).map(String::as_str)
    }

    /// A category is enabled iff it is positive and has been registered
    /// (category 1, `$default`, is registered by [`Environment::new`]).
    #[must_use]
    pub fn is_category_enabled(&self, id: i64) -> bool {
        id > INVALID_CATEGORY && self.categories.contains_key(&id)
    }

    // --- format registry -----------------------------------------------------

    pub fn register_format(
        &mut self,
        id: i64,
        kinds: &[FormatEntryKind],
        selectors: &[FormatSelector],
        initial_segment: impl Into<String>,
        trailing_literals: &[String],
        original: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.registry
            .register(id, kinds, selectors, initial_segment, trailing_literals, original)
    }

    #[must_use]
    pub fn get_format(&self, id: i64) -> Option<&FormatDescriptor> {
        self.registry.get(id)
    }

    // --- saved block lifecycle -----------------------------------------------

    /// Ensure there is a current active block (the FIFO's back) with at
    /// least `hint` slots of spare capacity, allocating a fresh one only if
    /// the FIFO is currently empty (i.e. there is no in-progress block since
    /// the last flush).
    pub(crate) fn ensure_active_block(&mut self, hint: usize) {
        if self.fifo.is_empty() {
            self.fifo.push_back(SavedBlock::with_capacity(hint));
        }
    }

    /// External `process_reserve_block` operation: eagerly allocate an
    /// active block sized for the caller's announced range.
    pub fn process_reserve_block(&mut self, spos: usize, epos: usize) {
        let hint = epos.saturating_sub(spos) + 16;
        self.ensure_active_block(hint);
    }

    pub(crate) fn active_block_mut(&mut self) -> Option<&mut SavedBlock> {
        self.fifo.back_mut()
    }

    /// External `process_complete` operation: drop the active block if
    /// ingest produced no saved events for it.
    pub fn process_complete(&mut self) {
        if matches!(self.fifo.back(), Some(b) if b.is_empty()) {
            self.fifo.pop_back();
        }
    }

    #[must_use]
    pub fn has_work_pending(&self) -> bool {
        !self.fifo.is_empty()
    }

    pub(crate) fn pop_front_block(&mut self) -> Option<SavedBlock> {
        self.fifo.pop_front()
    }

    pub(crate) fn push_front_block(&mut self, block: SavedBlock) {
        self.fifo.push_front(block);
    }

    // --- emit ----------------------------------------------------------------

    /// Concatenate the emitted text of every pending saved block, draining
    /// the FIFO. Begins by aborting any in-flight async worker (re-enqueue +
    /// cancel), since sync emit and the worker must never run concurrently.
    pub fn format_sync(&mut self, emit_std_prefix: bool) -> Result<String, CoreError> {
        self.abort_async();
        let mut out = String::new();
        while let Some(block) = self.pop_front_block() {
            out.push_str(&crate::emit::emit_all(&block, &*self, emit_std_prefix)?);
        }
        Ok(out)
    }

    /// Start emitting the FIFO's front block on a background thread.
    /// `callback` runs later, when [`Self::poll_async`] (or [`Self::abort_async`])
    /// observes completion — never on the worker thread itself, so it never
    /// races against the rule that only the caller thread mutates the FIFO.
    ///
    /// Rejected with [`CoreError::BadArguments`] if a worker is already
    /// active. If the FIFO is empty, `callback` is invoked immediately with
    /// an empty string.
    pub fn format_async(
        &mut self,
        emit_std_prefix: bool,
        callback: impl FnOnce(Result<String, CoreError>) + Send + 'static,
    ) -> Result<(), CoreError> {
        if self.worker.is_some() {
            return Err(CoreError::BadArguments {
                what: "format_async",
                detail: "a format worker is already active".to_string(),
            });
        }

        let Some(block) = self.pop_front_block() else {
            callback(Ok(String::new()));
            return Ok(());
        };

        let snapshot = self.snapshot_format_source();
        self.worker = Some(FormatWorkerHandle::start(block, snapshot, emit_std_prefix));
        self.pending_callback = Some(Box::new(callback));
        Ok(())
    }

    /// Non-blocking check for a finished async job. Returns `true` iff a job
    /// was found complete (and its callback, if any, was invoked).
    pub fn poll_async(&mut self) -> bool {
        let Some(completion) = self.worker.as_ref().and_then(FormatWorkerHandle::try_complete) else {
            return false;
        };
        self.worker = None;
        self.settle_worker_completion(completion);
        true
    }

    /// Request cancellation of any in-flight async job and block (with a
    /// bounded timeout) until the worker hands its block back. A no-op
    /// returning `false` if no worker is active.
    pub fn abort_async(&mut self) -> bool {
        let Some(handle) = self.worker.take() else {
            return false;
        };
        match handle.abort() {
            Some(completion) => self.settle_worker_completion(completion),
            None => {
                self.pending_callback = None;
            }
        }
        true
    }

    fn settle_worker_completion(&mut self, completion: WorkerCompletion) {
        let callback = self.pending_callback.take();
        match completion {
            WorkerCompletion::Succeeded(text) => {
                if let Some(cb) = callback {
                    cb(Ok(text));
                }
            }
            WorkerCompletion::Failed(block, err) => {
                self.push_front_block(block);
                if let Some(cb) = callback {
                    cb(Err(err));
                }
            }
            WorkerCompletion::Aborted(block) => {
                self.push_front_block(block);
            }
        }
    }

    /// Capture a thread-shareable, point-in-time copy of the registry and
    /// identity fields, for handing to the background format worker.
    #[must_use]
    fn snapshot_format_source(&self) -> FormatSnapshot {
        FormatSnapshot::new(
            Arc::new(self.registry.clone()),
            self.host_name.clone(),
            self.app_name.clone(),
            self.categories.clone(),
        )
    }
}

impl FormatSource for Environment {
    fn get_format(&self, id: i64) -> Option<&FormatDescriptor> {
        self.registry.get(id)
    }

    fn host_name(&self) -> &str {
        &self.host_name
    }

    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn category_name(&self, category: i64) -> std::borrow::Cow<'_, str> {
        match self.categories.get(&category) {
            Some(name) => std::borrow::Cow::Borrowed(name.as_str()),
            None => std::borrow::Cow::Owned(category.to_string()),
        }
    }
}
