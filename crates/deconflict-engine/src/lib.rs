//! DeConflict Engine - Conflict discovery, comparison and reconciliation
//!
//! Provides:
//! - Mount-aware directory traversal with boundary policies
//! - Conflicted/original pairing from filename markers
//! - Size-gated hash or byte content comparison
//! - A persistent conflict ledger with cross-run merge semantics
//! - The resolution state machine executing (or simulating) actions
//!
//! The pipeline per run: scan -> match -> compare -> resolve -> reconcile
//! -> persist, orchestrated by [`use_cases::DeconflictUseCase`].

pub mod comparator;
pub mod diff;
pub mod error;
pub mod fs;
pub mod ledger;
pub mod matcher;
pub mod mounts;
pub mod resolver;
pub mod scanner;
pub mod use_cases;

pub use error::EngineError;
pub use use_cases::{DeconflictUseCase, RunReport};
