use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::workflows::domain::MarketFilter;
use crate::workflows::notification::WhatsAppChannel;
use crate::workflows::pipeline::PipelineOptions;
use crate::workflows::qualification::{QualificationThresholds, ThresholdError};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub market: MarketConfig,
    pub thresholds: QualificationThresholds,
    pub pipeline: PipelineConfig,
    pub api: ApiConfig,
    pub notification: NotificationConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let market = MarketConfig {
            postal_codes: split_list(&var_or("MARKET_ZIP_CODES", "")),
            city: var_or("MARKET_CITY", ""),
            state: var_or("MARKET_STATE", ""),
            bedrooms: parse_var("MARKET_BEDROOMS", 2u8)?,
            max_price: parse_var("MARKET_MAX_PRICE", Decimal::new(500_000, 0))?,
            min_cap_rate: parse_var("MARKET_MIN_CAP_RATE", Decimal::new(5, 2))?,
        };

        let defaults = QualificationThresholds::default();
        let thresholds = QualificationThresholds {
            min_qualifying_ratio: parse_var(
                "DSCR_MIN_QUALIFYING_RATIO",
                defaults.min_qualifying_ratio,
            )?,
            warning_ratio: parse_var("DSCR_WARNING_RATIO", defaults.warning_ratio)?,
            vacancy_rate: parse_var("DSCR_VACANCY_RATE", defaults.vacancy_rate)?,
            opex_rate: parse_var("DSCR_OPEX_RATE", defaults.opex_rate)?,
            annual_interest_rate: parse_var(
                "DSCR_ANNUAL_INTEREST_RATE",
                defaults.annual_interest_rate,
            )?,
            down_payment_fraction: parse_var("DSCR_DOWN_PAYMENT", defaults.down_payment_fraction)?,
        };
        thresholds.validate().map_err(ConfigError::Thresholds)?;

        let pipeline = PipelineConfig {
            dry_run: parse_flag("PIPELINE_DRY_RUN", false)?,
            run_id_prefix: var_or("PIPELINE_RUN_ID_PREFIX", "Run"),
            enrich_concurrency: parse_var("PIPELINE_ENRICH_CONCURRENCY", 1usize)?,
        };
        if pipeline.enrich_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "PIPELINE_ENRICH_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        let api = ApiConfig {
            listing_feed_base_url: var_or("LISTING_FEED_BASE_URL", "https://www.redfin.com"),
            hud_base_url: var_or("HUD_BASE_URL", "https://www.huduser.gov"),
            hud_api_token: optional_var("HUD_API_TOKEN"),
            hud_fmr_year: parse_var("HUD_FMR_YEAR", 2025i32)?,
            timeout_secs: parse_var("HTTP_TIMEOUT_SECS", 30u64)?,
            max_attempts: parse_var("HTTP_MAX_ATTEMPTS", 3u32)?,
        };

        let notification = NotificationConfig {
            twilio_base_url: var_or("TWILIO_BASE_URL", "https://api.twilio.com"),
            account_sid: optional_var("TWILIO_ACCOUNT_SID"),
            auth_token: optional_var("TWILIO_AUTH_TOKEN"),
            from: optional_var("WHATSAPP_FROM"),
            to: optional_var("WHATSAPP_TO"),
        };

        let storage = StorageConfig {
            database_url: var_or("DATABASE_URL", "sqlite://dscr-scout.db"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5u32)?,
        };

        let log_level = var_or("APP_LOG_LEVEL", "info");

        Ok(Self {
            environment,
            market,
            thresholds,
            pipeline,
            api,
            notification,
            storage,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Search scope: which postal codes to scan and which listings to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    pub postal_codes: Vec<String>,
    pub city: String,
    pub state: String,
    pub bedrooms: u8,
    pub max_price: Decimal,
    pub min_cap_rate: Decimal,
}

impl MarketConfig {
    /// The filter for a pipeline run; a run needs at least one postal code.
    pub fn filter(&self) -> Result<MarketFilter, ConfigError> {
        if self.postal_codes.is_empty() {
            return Err(ConfigError::MissingPostalCodes);
        }
        Ok(MarketFilter {
            postal_codes: self.postal_codes.clone(),
            city: self.city.clone(),
            region: self.state.clone(),
            bedrooms: self.bedrooms,
            max_price: self.max_price,
            min_cap_rate: self.min_cap_rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub dry_run: bool,
    pub run_id_prefix: String,
    pub enrich_concurrency: usize,
}

impl PipelineConfig {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            dry_run: self.dry_run,
            run_id_prefix: self.run_id_prefix.clone(),
            enrich_concurrency: self.enrich_concurrency,
        }
    }
}

/// Outbound HTTP endpoints and transport limits.
#[derive(Clone)]
pub struct ApiConfig {
    pub listing_feed_base_url: String,
    pub hud_base_url: String,
    pub hud_api_token: Option<String>,
    pub hud_fmr_year: i32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("listing_feed_base_url", &self.listing_feed_base_url)
            .field("hud_base_url", &self.hud_base_url)
            .field("hud_api_token", &self.hud_api_token.as_ref().map(|_| "<redacted>"))
            .field("hud_fmr_year", &self.hud_fmr_year)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[derive(Clone)]
pub struct NotificationConfig {
    pub twilio_base_url: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl NotificationConfig {
    /// Credentials for live delivery; every field must be present.
    pub fn whatsapp_channel(&self) -> Result<WhatsAppChannel, ConfigError> {
        fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
            value.clone().ok_or(ConfigError::MissingCredential(name))
        }

        Ok(WhatsAppChannel {
            base_url: self.twilio_base_url.clone(),
            account_sid: required(&self.account_sid, "TWILIO_ACCOUNT_SID")?,
            auth_token: required(&self.auth_token, "TWILIO_AUTH_TOKEN")?,
            from: required(&self.from, "WHATSAPP_FROM")?,
            to: required(&self.to, "WHATSAPP_TO")?,
        })
    }
}

impl fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("twilio_base_url", &self.twilio_base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { name: &'static str, value: String },
    Thresholds(ThresholdError),
    MissingPostalCodes,
    MissingCredential(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
            ConfigError::Thresholds(err) => write!(f, "invalid DSCR thresholds: {err}"),
            ConfigError::MissingPostalCodes => {
                write!(f, "MARKET_ZIP_CODES must list at least one postal code")
            }
            ConfigError::MissingCredential(name) => {
                write!(f, "{name} is required for live notifications")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Thresholds(err) => Some(err),
            ConfigError::Invalid { .. }
            | ConfigError::MissingPostalCodes
            | ConfigError::MissingCredential(_) => None,
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Comma-separated list, trimmed, empties dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
