use std::sync::Arc;
use std::time::Duration;

use dscr_scout::config::{AppConfig, NotificationConfig, StorageConfig};
use dscr_scout::error::AppError;
use dscr_scout::workflows::acquisition::CsvListingFeed;
use dscr_scout::workflows::notification::{DryRunNotifier, WhatsAppNotifier};
use dscr_scout::workflows::pipeline::{Collaborators, DigestNotifier};
use dscr_scout::workflows::rent::HudFmrClient;
use dscr_scout::workflows::storage::SqliteListingRepository;
use tracing::info;

/// Open the listing database and bring its schema up to date.
pub(crate) async fn connect_repository(
    storage: &StorageConfig,
) -> Result<Arc<SqliteListingRepository>, AppError> {
    let repository =
        SqliteListingRepository::connect(&storage.database_url, storage.max_connections).await?;
    repository.migrate().await?;
    info!(database_url = %storage.database_url, "listing database ready");
    Ok(Arc::new(repository))
}

/// Dry runs never touch the messaging API; live runs need complete credentials.
pub(crate) fn select_notifier(
    dry_run: bool,
    notification: &NotificationConfig,
    timeout: Duration,
) -> Result<Arc<dyn DigestNotifier>, AppError> {
    if dry_run {
        return Ok(Arc::new(DryRunNotifier));
    }
    let channel = notification.whatsapp_channel()?;
    Ok(Arc::new(WhatsAppNotifier::new(channel, timeout)?))
}

pub(crate) async fn collaborators(config: &AppConfig) -> Result<Collaborators, AppError> {
    let api = &config.api;
    let source = CsvListingFeed::new(
        api.listing_feed_base_url.clone(),
        api.timeout(),
        api.max_attempts,
    )?;
    let rent = HudFmrClient::new(
        api.hud_base_url.clone(),
        api.hud_api_token.clone(),
        api.hud_fmr_year,
        api.timeout(),
        api.max_attempts,
    )?;
    let notifier = select_notifier(config.pipeline.dry_run, &config.notification, api.timeout())?;
    let repository = connect_repository(&config.storage).await?;

    Ok(Collaborators {
        source: Arc::new(source),
        rent: Arc::new(rent),
        repository,
        notifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscr_scout::config::ConfigError;

    fn notification(to: Option<&str>) -> NotificationConfig {
        NotificationConfig {
            twilio_base_url: "https://api.twilio.com".to_string(),
            account_sid: Some("AC1".to_string()),
            auth_token: Some("token".to_string()),
            from: Some("+15550001".to_string()),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn dry_run_selects_logging_notifier_without_credentials() {
        let notifier = select_notifier(true, &notification(None), Duration::from_secs(1))
            .expect("dry run needs no credentials");
        assert_eq!(notifier.recipients(), "dry-run");
    }

    #[test]
    fn live_run_selects_whatsapp() {
        let channel = notification(Some("+15550100"));
        let notifier = select_notifier(false, &channel, Duration::from_secs(1))
            .expect("credentials present");
        assert_eq!(notifier.recipients(), "whatsapp:+15550100");
    }

    #[test]
    fn live_run_without_recipient_is_config_error() {
        match select_notifier(false, &notification(None), Duration::from_secs(1)) {
            Err(AppError::Config(ConfigError::MissingCredential(name))) => {
                assert_eq!(name, "WHATSAPP_TO")
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected missing credential"),
        }
    }

    #[tokio::test]
    async fn repository_bootstrap_applies_migrations() {
        use dscr_scout::workflows::domain::ListingId;
        use dscr_scout::workflows::pipeline::ListingRepository;

        let storage = StorageConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let repository = connect_repository(&storage).await.expect("bootstrap");

        let missing = repository
            .get_by_id(&ListingId("none".to_string()))
            .await
            .expect("listings table exists");
        assert!(missing.is_none());
        let selected = repository
            .unnotified_qualified(chrono::Utc::now().date_naive())
            .await
            .expect("notification log table exists");
        assert!(selected.is_empty());
    }
}
