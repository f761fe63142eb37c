//! Port definitions (trait interfaces) for adapters

pub mod decision;
pub mod mutator;
pub mod reporter;

pub use decision::{Decision, IDecisionSource, PairSummary, ScriptedDecisionSource};
pub use mutator::{IFileMutator, Mutation};
pub use reporter::{IProgressReporter, NullReporter};
