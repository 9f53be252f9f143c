use crate::cli::{AnalyzeArgs, ShowArgs};
use crate::infra;
use chrono::Utc;
use dscr_scout::config::{AppConfig, ConfigError};
use dscr_scout::error::AppError;
use dscr_scout::telemetry;
use dscr_scout::workflows::domain::{Listing, ListingId, RentQuote};
use dscr_scout::workflows::pipeline::ListingRepository;
use dscr_scout::workflows::qualification::{
    analyze, QualificationOutcome, QualificationThresholds,
};

/// Distinct from the run outcome codes 0-3.
pub(crate) const NOT_FOUND_EXIT: i32 = 4;

/// Evaluate a hypothetical listing; thresholds come from the environment unless overridden.
pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<i32, AppError> {
    let config = AppConfig::load()?;
    let outcome = evaluate(
        &args,
        config.thresholds,
        config.api.hud_fmr_year,
        config.market.bedrooms,
    )?;

    println!("price:          {}", args.price);
    println!("monthly rent:   {}", args.rent);
    println!("monthly NOI:    {}", outcome.monthly_noi.round_dp(2));
    println!("debt service:   {}", outcome.monthly_debt_service.round_dp(2));
    println!("DSCR:           {}", outcome.dscr_ratio);
    println!("status:         {}", outcome.status.label());
    Ok(0)
}

pub(crate) fn evaluate(
    args: &AnalyzeArgs,
    mut thresholds: QualificationThresholds,
    year: i32,
    bedrooms: u8,
) -> Result<QualificationOutcome, ConfigError> {
    if let Some(rate) = args.interest_rate {
        thresholds.annual_interest_rate = rate;
    }
    if let Some(fraction) = args.down_payment {
        thresholds.down_payment_fraction = fraction;
    }
    thresholds.validate().map_err(ConfigError::Thresholds)?;

    let listing = Listing {
        id: ListingId("analysis".to_string()),
        address: String::new(),
        city: String::new(),
        postal_code: String::new(),
        price: args.price,
        scanned_at: Utc::now(),
    };
    let quote = RentQuote {
        postal_code: String::new(),
        monthly_rent: args.rent,
        year,
        bedrooms,
    };
    Ok(analyze(&listing, &quote, &thresholds))
}

pub(crate) async fn run_show(args: ShowArgs) -> Result<i32, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let repository = infra::connect_repository(&config.storage).await?;
    show_listing(&*repository, ListingId(args.listing_id)).await
}

pub(crate) async fn show_listing(
    repository: &dyn ListingRepository,
    id: ListingId,
) -> Result<i32, AppError> {
    let Some(record) = repository.get_by_id(&id).await? else {
        println!("listing {id} not found");
        return Ok(NOT_FOUND_EXIT);
    };

    let notified = repository
        .is_already_notified(&id, Utc::now().date_naive())
        .await;
    match serde_json::to_string_pretty(&record) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("{record:?} ({err})"),
    }
    println!("notified today: {}", if notified { "yes" } else { "no" });
    Ok(0)
}
