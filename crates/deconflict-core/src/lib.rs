//! DeConflict Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ConflictCandidate`, `MatchedPair`, `Comparison`, `ConflictRecord`
//! - **Port definitions** - Traits for adapters: `IDecisionSource`, `IFileMutator`, `IProgressReporter`
//! - **Run configuration** - The flag set a single invocation operates under
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no filesystem access.
//! Ports define trait interfaces that the engine and CLI crates implement:
//! the decision source abstracts the interactive prompt, the file mutator
//! abstracts every destructive filesystem operation (which is what makes the
//! dry-run guarantee testable), and the progress reporter abstracts display.

pub mod config;
pub mod domain;
pub mod ports;
