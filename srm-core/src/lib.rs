//! Core of `srm`, a delayed `rm`.
//!
//! Instead of deleting things right away they get moved into a quarantine directory and recorded
//! in an [`EntryStore`] along with a time-to-live. Every invocation then sweeps the quarantine:
//!
//! 1. A background scan finds the entries whose time-to-live has elapsed.
//! 2. Meanwhile the caller's [`Intent`] is validated.
//! 3. Due entries are deleted, and dropped from the store.
//! 4. The intent is applied, e.g. a new entry is staged.
//! 5. The store is persisted.
//!
//! [`EntryStore`]: srm_store::EntryStore
//! [`Intent`]: crate::engine::Intent

pub mod cfgs;
pub mod engine;
pub mod executor;
pub mod scanner;


pub use engine::{Engine, EngineConfig, EntryStatus, Execution, Intent, Outcome};
