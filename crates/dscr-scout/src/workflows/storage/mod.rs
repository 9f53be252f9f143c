//! SQLite persistence for listings and the daily notification log.

mod row;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::workflows::domain::{ListingId, ListingRecord};
use crate::workflows::failure::{CollaboratorError, CollaboratorResult, ReasonCode};
use crate::workflows::pipeline::ListingRepository;

use row::ListingRow;

const DIGEST_DATE_FORMAT: &str = "%Y-%m-%d";

const LISTING_COLUMNS: &str = "listing_id, address, city, postal_code, price, dscr_status, \
     dscr_ratio, rent_quote_status, rent_quote, rent_quote_year, scanned_at";

#[derive(Debug, Clone)]
pub struct SqliteListingRepository {
    pool: SqlitePool,
}

impl SqliteListingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database behind `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn digest_date(date: NaiveDate) -> String {
    date.format(DIGEST_DATE_FORMAT).to_string()
}

fn decode_rows(rows: Vec<ListingRow>) -> CollaboratorResult<Vec<ListingRecord>> {
    rows.into_iter()
        .map(|row| {
            row.into_record()
                .map_err(|err| CollaboratorError::new(ReasonCode::DbQuery, err.to_string()))
        })
        .collect()
}

#[async_trait]
impl ListingRepository for SqliteListingRepository {
    async fn save(&self, record: &ListingRecord) -> CollaboratorResult<bool> {
        let listing = &record.listing;
        let evaluation = &record.evaluation;

        sqlx::query(
            r#"
            INSERT INTO listings (
                listing_id, address, city, postal_code, price, dscr_status,
                dscr_ratio, rent_quote_status, rent_quote, rent_quote_year, scanned_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (listing_id) DO UPDATE SET
                dscr_status = excluded.dscr_status,
                dscr_ratio = excluded.dscr_ratio,
                rent_quote_status = excluded.rent_quote_status,
                rent_quote = excluded.rent_quote,
                rent_quote_year = excluded.rent_quote_year,
                scanned_at = excluded.scanned_at
            "#,
        )
        .bind(listing.id.as_str())
        .bind(&listing.address)
        .bind(&listing.city)
        .bind(&listing.postal_code)
        .bind(listing.price.to_string())
        .bind(evaluation.dscr_status.label())
        .bind(evaluation.dscr_ratio.map(|ratio| ratio.to_string()))
        .bind(evaluation.rent_quote_status.label())
        .bind(evaluation.rent_quote.map(|rent| rent.to_string()))
        .bind(evaluation.rent_quote_year)
        .bind(row::timestamp(listing.scanned_at))
        .execute(&self.pool)
        .await
        .map_err(|err| {
            CollaboratorError::new(ReasonCode::DbSave, format!("{}: {err}", listing.id))
        })?;

        Ok(true)
    }

    async fn is_already_notified(&self, id: &ListingId, date: NaiveDate) -> bool {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notification_log WHERE listing_id = ? AND digest_date = ?",
        )
        .bind(id.as_str())
        .bind(digest_date(date))
        .fetch_one(&self.pool)
        .await;

        match found {
            Ok(count) => count > 0,
            Err(err) => {
                warn!(listing_id = %id, %date, error = %err, "notification lookup failed");
                false
            }
        }
    }

    async fn unnotified_qualified(
        &self,
        date: NaiveDate,
    ) -> CollaboratorResult<Vec<ListingRecord>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings l \
             WHERE l.dscr_status IN ('Qualified', 'Warning') \
             AND NOT EXISTS ( \
                 SELECT 1 FROM notification_log n \
                 WHERE n.listing_id = l.listing_id AND n.digest_date = ? \
             ) \
             ORDER BY CAST(l.dscr_ratio AS REAL) DESC, l.listing_id ASC"
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(digest_date(date))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| CollaboratorError::new(ReasonCode::DbQuery, err.to_string()))?;

        decode_rows(rows)
    }

    async fn get_by_id(&self, id: &ListingId) -> CollaboratorResult<Option<ListingRecord>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE listing_id = ?");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| CollaboratorError::new(ReasonCode::DbQuery, format!("{id}: {err}")))?;

        row.map(|row| {
            row.into_record()
                .map_err(|err| CollaboratorError::new(ReasonCode::DbQuery, format!("{id}: {err}")))
        })
        .transpose()
    }

    async fn log_notification(
        &self,
        ids: &[ListingId],
        date: NaiveDate,
        recipients: &str,
    ) -> CollaboratorResult<bool> {
        let db_log = |err: sqlx::Error| CollaboratorError::new(ReasonCode::DbLog, err.to_string());
        let digest_date = digest_date(date);
        let sent_at = row::timestamp(Utc::now());

        let mut tx = self.pool.begin().await.map_err(db_log)?;
        let mut written = 0u64;
        for id in ids {
            // Unknown identifiers select no row and are skipped.
            let result = sqlx::query(
                r#"
                INSERT INTO notification_log (listing_id, digest_date, sent_at, recipients)
                SELECT listing_id, ?, ?, ? FROM listings WHERE listing_id = ?
                ON CONFLICT (listing_id, digest_date) DO NOTHING
                "#,
            )
            .bind(&digest_date)
            .bind(&sent_at)
            .bind(recipients)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_log)?;
            written += result.rows_affected();
        }
        tx.commit().await.map_err(db_log)?;

        debug!(requested = ids.len(), written, %date, "notification log updated");
        Ok(true)
    }
}
