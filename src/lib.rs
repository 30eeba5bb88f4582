//! Core ingest/format engine for a structured, columnar log stream.
//!
//! A host runtime captures log call sites as pre-parsed format descriptors
//! and writes each event as a run of tagged slots into a raw, shared
//! `(tags[], data[], stringData[])` buffer. This crate owns everything
//! downstream of that buffer: triaging each event by level/category and
//! volume pressure, copying retained events into its own columnar storage,
//! and formatting them — synchronously or on a background worker — against
//! the registered descriptors.
//!
//! See `SPEC_FULL.md` in the repository root for the full design; `DESIGN.md`
//! for the grounding ledger behind each module.

mod block;
mod context;
mod emit;
pub mod environment;
mod error;
mod formatter;
pub mod ingest;
mod level;
pub mod registry;
mod selector;
mod tag;
mod worker;

pub use block::SavedBlock;
pub use context::{FormatSnapshot, FormatSource};
pub use emit::emit_all;
pub use environment::{Environment, DEFAULT_CATEGORY, INVALID_CATEGORY};
pub use error::{CoreError, CoreResult};
pub use ingest::{process_msgs, RawBlock};
pub use level::Level;
pub use registry::{FormatDescriptor, FormatEntry, FormatRegistry};
pub use selector::{FormatEntryKind, FormatSelector};
pub use tag::Tag;
pub use worker::{FormatWorkerHandle, WorkerCompletion};
