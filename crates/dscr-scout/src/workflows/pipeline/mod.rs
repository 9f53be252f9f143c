//! Nightly acquisition-to-digest pipeline.
//!
//! The orchestrator consumes four collaborators through the traits in [`ports`] and never
//! aborts on a single failed listing. Only a failed fetch, a failed selection query, or an
//! explicit cancellation ends a run early.

pub mod cancel;
pub mod orchestrator;
pub mod ports;

#[cfg(test)]
mod tests;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use orchestrator::{
    Collaborators, PipelineOptions, PipelineOrchestrator, PipelineStage, RunOutcome, RunSummary,
};
pub use ports::{DigestNotifier, ListingRepository, ListingSource, RentLookup, RunId};
