use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::workflows::domain::{
    DscrStatus, Evaluation, Listing, ListingId, ListingRecord, MarketFilter, RentQuote,
    RentQuoteStatus,
};
use crate::workflows::failure::{CollaboratorError, CollaboratorResult, ReasonCode};
use crate::workflows::pipeline::{
    Collaborators, DigestNotifier, ListingRepository, ListingSource, PipelineOptions,
    PipelineOrchestrator, RentLookup, RunId,
};
use crate::workflows::qualification::QualificationThresholds;

pub(super) fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 6, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn market() -> MarketFilter {
    MarketFilter {
        postal_codes: vec!["85281".to_string(), "85283".to_string()],
        city: "Tempe".to_string(),
        region: "AZ".to_string(),
        bedrooms: 2,
        max_price: dec!(500000),
        min_cap_rate: dec!(0.05),
    }
}

pub(super) fn listing(id: &str, postal_code: &str, price: Decimal) -> Listing {
    Listing {
        id: ListingId(id.to_string()),
        address: format!("{id} Mill Ave"),
        city: "Tempe".to_string(),
        postal_code: postal_code.to_string(),
        price,
        scanned_at: started_at(),
    }
}

/// Qualifies against a 2,000/mo quote under default thresholds.
pub(super) fn strong_listing(id: &str) -> Listing {
    listing(id, "85281", dec!(150000))
}

/// Lands in the warning band against a 2,000/mo quote.
pub(super) fn marginal_listing(id: &str) -> Listing {
    listing(id, "85281", dec!(200000))
}

/// Rejected against a 2,000/mo quote.
pub(super) fn weak_listing(id: &str) -> Listing {
    listing(id, "85281", dec!(480000))
}

pub(super) fn qualified_record(id: &str) -> ListingRecord {
    ListingRecord::new(
        strong_listing(id),
        Evaluation {
            dscr_status: DscrStatus::Qualified,
            dscr_ratio: Some(dec!(1.6)),
            rent_quote_status: RentQuoteStatus::Available,
            rent_quote: Some(dec!(2000)),
            rent_quote_year: Some(2025),
        },
    )
}

pub(super) struct Harness {
    pub(super) source: Arc<StubSource>,
    pub(super) rent: Arc<StubRent>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub(super) fn new(listings: Vec<Listing>) -> Self {
        Self {
            source: Arc::new(StubSource::returning(listings)),
            rent: Arc::new(StubRent::with_rent("85281", dec!(2000))),
            repository: Arc::new(MemoryRepository::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub(super) fn collaborators(&self) -> Collaborators {
        Collaborators {
            source: self.source.clone(),
            rent: self.rent.clone(),
            repository: self.repository.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub(super) fn orchestrator(&self, options: PipelineOptions) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            self.collaborators(),
            market(),
            QualificationThresholds::default(),
            options,
        )
    }
}

pub(super) fn live_options() -> PipelineOptions {
    PipelineOptions {
        dry_run: false,
        run_id_prefix: "Test".to_string(),
        enrich_concurrency: 1,
    }
}

pub(super) struct StubSource {
    result: Result<Vec<Listing>, CollaboratorError>,
    pub(super) calls: AtomicUsize,
}

impl StubSource {
    pub(super) fn returning(listings: Vec<Listing>) -> Self {
        Self {
            result: Ok(listings),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            result: Err(CollaboratorError::new(
                ReasonCode::ListingHttp,
                "85281: status 503",
            )),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ListingSource for StubSource {
    async fn fetch_listings(&self, _filter: &MarketFilter) -> CollaboratorResult<Vec<Listing>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Default)]
pub(super) struct StubRent {
    rents: HashMap<String, Decimal>,
    hang: bool,
    pub(super) calls: AtomicUsize,
}

impl StubRent {
    pub(super) fn with_rent(postal_code: &str, rent: Decimal) -> Self {
        let mut rents = HashMap::new();
        rents.insert(postal_code.to_string(), rent);
        Self {
            rents,
            ..Self::default()
        }
    }

    /// A lookup that never answers, so only cancellation can end the run.
    pub(super) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RentLookup for StubRent {
    async fn rent_quote(&self, postal_code: &str, bedrooms: u8) -> CollaboratorResult<RentQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        match self.rents.get(postal_code) {
            Some(rent) => Ok(RentQuote {
                postal_code: postal_code.to_string(),
                monthly_rent: *rent,
                year: 2025,
                bedrooms,
            }),
            None => Err(CollaboratorError::new(
                ReasonCode::HudNoData,
                format!("no FMR data for {postal_code}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct LogEntry {
    pub(super) listing_id: ListingId,
    pub(super) date: NaiveDate,
    pub(super) recipients: String,
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<ListingId, ListingRecord>>,
    log: Mutex<Vec<LogEntry>>,
    pub(super) fail_saves: bool,
    pub(super) fail_selection: bool,
    pub(super) fail_log: bool,
    pub(super) save_calls: AtomicUsize,
    pub(super) selection_calls: AtomicUsize,
}

impl MemoryRepository {
    pub(super) fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub(super) fn failing_selection() -> Self {
        Self {
            fail_selection: true,
            ..Self::default()
        }
    }

    pub(super) fn failing_log() -> Self {
        Self {
            fail_log: true,
            ..Self::default()
        }
    }

    pub(super) fn seed(&self, record: ListingRecord) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.id().clone(), record);
    }

    pub(super) fn record(&self, id: &str) -> Option<ListingRecord> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&ListingId(id.to_string()))
            .cloned()
    }

    pub(super) fn log_entries(&self) -> Vec<LogEntry> {
        self.log.lock().expect("log mutex poisoned").clone()
    }
}

#[async_trait]
impl ListingRepository for MemoryRepository {
    async fn save(&self, record: &ListingRecord) -> CollaboratorResult<bool> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(CollaboratorError::new(ReasonCode::DbSave, "disk full"));
        }
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.id().clone(), record.clone());
        Ok(true)
    }

    async fn is_already_notified(&self, id: &ListingId, date: NaiveDate) -> bool {
        self.log
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .any(|entry| &entry.listing_id == id && entry.date == date)
    }

    async fn unnotified_qualified(
        &self,
        date: NaiveDate,
    ) -> CollaboratorResult<Vec<ListingRecord>> {
        self.selection_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_selection {
            return Err(CollaboratorError::new(ReasonCode::DbQuery, "database locked"));
        }
        let notified: HashSet<ListingId> = self
            .log
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .filter(|entry| entry.date == date)
            .map(|entry| entry.listing_id.clone())
            .collect();
        let mut selected: Vec<ListingRecord> = self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .filter(|record| record.evaluation.dscr_status.is_notifiable())
            .filter(|record| !notified.contains(record.id()))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.evaluation.dscr_ratio.cmp(&a.evaluation.dscr_ratio));
        Ok(selected)
    }

    async fn get_by_id(&self, id: &ListingId) -> CollaboratorResult<Option<ListingRecord>> {
        Ok(self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned())
    }

    async fn log_notification(
        &self,
        ids: &[ListingId],
        date: NaiveDate,
        recipients: &str,
    ) -> CollaboratorResult<bool> {
        if self.fail_log {
            return Err(CollaboratorError::new(ReasonCode::DbLog, "constraint failed"));
        }
        let mut log = self.log.lock().expect("log mutex poisoned");
        for id in ids {
            log.push(LogEntry {
                listing_id: id.clone(),
                date,
                recipients: recipients.to_string(),
            });
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) enum DeliveryMode {
    #[default]
    Deliver,
    Decline,
    Fail,
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    pub(super) mode: DeliveryMode,
    digests: Mutex<Vec<(Vec<ListingId>, RunId)>>,
}

impl RecordingNotifier {
    pub(super) fn with_mode(mode: DeliveryMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub(super) fn digests(&self) -> Vec<(Vec<ListingId>, RunId)> {
        self.digests.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl DigestNotifier for RecordingNotifier {
    fn recipients(&self) -> String {
        "whatsapp:+15550100".to_string()
    }

    async fn send_digest(
        &self,
        listings: &[ListingRecord],
        run_id: &RunId,
    ) -> CollaboratorResult<bool> {
        self.digests.lock().expect("notifier mutex poisoned").push((
            listings.iter().map(|record| record.id().clone()).collect(),
            run_id.clone(),
        ));
        match self.mode {
            DeliveryMode::Deliver => Ok(true),
            DeliveryMode::Decline => Ok(false),
            DeliveryMode::Fail => Err(CollaboratorError::new(
                ReasonCode::Notify,
                "status 401: authenticate",
            )),
        }
    }
}
