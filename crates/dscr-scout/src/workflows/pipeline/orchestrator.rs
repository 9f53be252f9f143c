use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::cancel::CancelSignal;
use super::ports::{DigestNotifier, ListingRepository, ListingSource, RentLookup, RunId};
use crate::workflows::domain::{
    DscrStatus, Evaluation, Listing, ListingId, ListingRecord, MarketFilter,
};
use crate::workflows::failure::{CollaboratorError, CollaboratorResult};
use crate::workflows::qualification::{QualificationEngine, QualificationThresholds};

/// Terminal status of one run; also the process exit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Success,
    PartialSuccess,
    Failure,
}

impl RunOutcome {
    /// Stable process exit codes: 0 success, 1 partial success, 2 failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::PartialSuccess => 1,
            RunOutcome::Failure => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::PartialSuccess => "partial_success",
            RunOutcome::Failure => "failure",
        }
    }
}

/// Last state a run reached before terminating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Started,
    Fetched,
    Enriched,
    Selected,
    Notified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Suppresses the notification log write; the notifier applies its own dry-run policy.
    pub dry_run: bool,
    pub run_id_prefix: String,
    /// Upper bound on in-flight enrichments; 1 keeps the loop sequential.
    pub enrich_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            run_id_prefix: "Run".to_string(),
            enrich_concurrency: 1,
        }
    }
}

/// Observable account of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub stage: PipelineStage,
    pub fetched: usize,
    pub rent_unavailable: usize,
    pub qualified: usize,
    pub warnings: usize,
    pub save_errors: usize,
    pub selected: usize,
    pub notified: usize,
}

impl RunSummary {
    fn started(run_id: RunId) -> Self {
        Self {
            run_id,
            outcome: RunOutcome::Failure,
            stage: PipelineStage::Started,
            fetched: 0,
            rent_unavailable: 0,
            qualified: 0,
            warnings: 0,
            save_errors: 0,
            selected: 0,
            notified: 0,
        }
    }
}

/// Per-listing counters; `combine` is associative and commutative so enrichment may finish
/// in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EnrichmentTally {
    rent_unavailable: usize,
    qualified: usize,
    warnings: usize,
    save_errors: usize,
}

impl EnrichmentTally {
    fn combine(self, other: Self) -> Self {
        Self {
            rent_unavailable: self.rent_unavailable + other.rent_unavailable,
            qualified: self.qualified + other.qualified,
            warnings: self.warnings + other.warnings,
            save_errors: self.save_errors + other.save_errors,
        }
    }

    fn record_status(&mut self, status: DscrStatus) {
        match status {
            DscrStatus::Qualified => self.qualified += 1,
            DscrStatus::Warning => self.warnings += 1,
            DscrStatus::Rejected => {}
        }
    }
}

/// The four external collaborators a run consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ListingSource>,
    pub rent: Arc<dyn RentLookup>,
    pub repository: Arc<dyn ListingRepository>,
    pub notifier: Arc<dyn DigestNotifier>,
}

/// Drives fetch, enrich/persist, select, notify and log for one run.
pub struct PipelineOrchestrator {
    collaborators: Collaborators,
    engine: QualificationEngine,
    market: MarketFilter,
    options: PipelineOptions,
    cancel: CancelSignal,
}

impl PipelineOrchestrator {
    pub fn new(
        collaborators: Collaborators,
        market: MarketFilter,
        thresholds: QualificationThresholds,
        options: PipelineOptions,
    ) -> Self {
        Self {
            collaborators,
            engine: QualificationEngine::new(thresholds),
            market,
            options,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self) -> RunSummary {
        self.run_at(Utc::now()).await
    }

    /// Execute one run as if it started at `started_at`; the UTC date scopes notification
    /// idempotency.
    pub async fn run_at(&self, started_at: DateTime<Utc>) -> RunSummary {
        let run_id = RunId::new(&self.options.run_id_prefix, started_at);
        info!(run_id = %run_id, dry_run = self.options.dry_run, "pipeline started");

        let mut summary = RunSummary::started(run_id);
        summary.outcome = match self.execute(&mut summary, started_at.date_naive()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    run_id = %summary.run_id,
                    stage = ?summary.stage,
                    error = %err,
                    "pipeline aborted"
                );
                RunOutcome::Failure
            }
        };

        info!(
            run_id = %summary.run_id,
            outcome = summary.outcome.label(),
            fetched = summary.fetched,
            selected = summary.selected,
            save_errors = summary.save_errors,
            "pipeline finished"
        );
        summary
    }

    /// `Err` only when the run was cancelled; collaborator failures are folded into the
    /// returned outcome.
    async fn execute(
        &self,
        summary: &mut RunSummary,
        today: NaiveDate,
    ) -> Result<RunOutcome, CollaboratorError> {
        let Collaborators {
            source,
            repository,
            notifier,
            ..
        } = &self.collaborators;

        let listings = match self
            .guarded("listing fetch", source.fetch_listings(&self.market))
            .await?
        {
            Ok(listings) => listings,
            Err(err) => {
                error!(run_id = %summary.run_id, error = %err, "listing fetch failed");
                return Ok(RunOutcome::Failure);
            }
        };
        summary.fetched = listings.len();
        summary.stage = PipelineStage::Fetched;
        info!(run_id = %summary.run_id, count = listings.len(), "fetched listings");

        let tally = self.enrich_all(listings).await?;
        summary.rent_unavailable = tally.rent_unavailable;
        summary.qualified = tally.qualified;
        summary.warnings = tally.warnings;
        summary.save_errors = tally.save_errors;
        summary.stage = PipelineStage::Enriched;

        let selected = match self
            .guarded("qualified selection", repository.unnotified_qualified(today))
            .await?
        {
            Ok(selected) => selected,
            Err(err) => {
                error!(run_id = %summary.run_id, error = %err, "qualified listing query failed");
                return Ok(RunOutcome::Failure);
            }
        };
        summary.selected = selected.len();
        summary.stage = PipelineStage::Selected;
        info!(run_id = %summary.run_id, count = selected.len(), "new qualified listings to notify");

        if selected.is_empty() {
            return Ok(self.final_outcome(summary));
        }

        let sent = match self
            .guarded(
                "digest delivery",
                notifier.send_digest(&selected, &summary.run_id),
            )
            .await?
        {
            Ok(sent) => sent,
            Err(err) => {
                warn!(run_id = %summary.run_id, error = %err, "notification failed");
                return Ok(if summary.save_errors > 0 {
                    RunOutcome::Failure
                } else {
                    RunOutcome::PartialSuccess
                });
            }
        };
        summary.stage = PipelineStage::Notified;
        if sent {
            summary.notified = selected.len();
        }

        if sent && !self.options.dry_run {
            self.record_delivery(&selected, today).await;
        }

        Ok(self.final_outcome(summary))
    }

    async fn enrich_all(&self, listings: Vec<Listing>) -> CollaboratorResult<EnrichmentTally> {
        let concurrency = self.options.enrich_concurrency.max(1);
        let mut pending = stream::iter(listings)
            .map(|listing| self.enrich_and_save(listing))
            .buffer_unordered(concurrency);

        let mut tally = EnrichmentTally::default();
        while let Some(result) = pending.next().await {
            tally = tally.combine(result?);
        }
        Ok(tally)
    }

    async fn enrich_and_save(&self, listing: Listing) -> CollaboratorResult<EnrichmentTally> {
        let mut tally = EnrichmentTally::default();

        let quote = self
            .guarded(
                "rent lookup",
                self.collaborators
                    .rent
                    .rent_quote(&listing.postal_code, self.market.bedrooms),
            )
            .await?;

        let evaluation = match quote {
            Ok(quote) => {
                let outcome = self.engine.analyze(&listing, &quote);
                debug!(
                    listing_id = %listing.id,
                    ratio = %outcome.dscr_ratio,
                    status = %outcome.status,
                    "listing evaluated"
                );
                outcome.to_evaluation(&quote)
            }
            Err(err) => {
                warn!(
                    listing_id = %listing.id,
                    postal_code = %listing.postal_code,
                    error = %err,
                    "rent quote unavailable"
                );
                tally.rent_unavailable += 1;
                Evaluation::unavailable()
            }
        };
        tally.record_status(evaluation.dscr_status);

        let record = ListingRecord::new(listing, evaluation);
        if let Err(err) = self
            .guarded("listing save", self.collaborators.repository.save(&record))
            .await?
        {
            warn!(listing_id = %record.id(), error = %err, "listing save failed");
            tally.save_errors += 1;
        }

        Ok(tally)
    }

    /// Best effort: a missed log entry only risks a duplicate digest on a later run.
    async fn record_delivery(&self, selected: &[ListingRecord], today: NaiveDate) {
        let ids: Vec<ListingId> = selected.iter().map(|record| record.id().clone()).collect();
        let recipients = self.collaborators.notifier.recipients();

        match self
            .guarded(
                "notification log",
                self.collaborators
                    .repository
                    .log_notification(&ids, today, &recipients),
            )
            .await
        {
            Ok(Ok(_)) => debug!(count = ids.len(), %today, "notification logged"),
            Ok(Err(err)) => warn!(error = %err, "notification log write failed"),
            Err(err) => warn!(error = %err, "notification log skipped"),
        }
    }

    fn final_outcome(&self, summary: &RunSummary) -> RunOutcome {
        if summary.save_errors > 0 {
            warn!(
                run_id = %summary.run_id,
                save_errors = summary.save_errors,
                "pipeline completed with save errors"
            );
            RunOutcome::PartialSuccess
        } else {
            RunOutcome::Success
        }
    }

    async fn guarded<T, F>(&self, operation: &str, call: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CollaboratorError::cancelled(operation)),
            value = call => Ok(value),
        }
    }
}
