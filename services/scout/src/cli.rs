use crate::inspect::{run_analyze, run_show};
use crate::scan;
use clap::{Args, Parser, Subcommand};
use dscr_scout::error::AppError;
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(
    name = "scout",
    about = "Scan listings, qualify them on debt-service coverage and send a daily digest",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one acquisition-to-digest pipeline pass (default command)
    Run(RunArgs),
    /// Evaluate a hypothetical listing against the configured lending thresholds
    Analyze(AnalyzeArgs),
    /// Print the stored record for one listing
    Show(ShowArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Evaluate and persist, but log the digest instead of sending it
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Postal code to scan; repeat to scan several (overrides MARKET_ZIP_CODES)
    #[arg(long = "zip", value_name = "ZIP")]
    pub(crate) zips: Vec<String>,
    /// Prefix for the generated run identifier
    #[arg(long, value_name = "PREFIX")]
    pub(crate) run_id_prefix: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Asking price
    #[arg(long)]
    pub(crate) price: Decimal,
    /// Monthly market rent
    #[arg(long)]
    pub(crate) rent: Decimal,
    /// Override the annual interest rate, e.g. 0.065
    #[arg(long)]
    pub(crate) interest_rate: Option<Decimal>,
    /// Override the down-payment fraction, e.g. 0.25
    #[arg(long)]
    pub(crate) down_payment: Option<Decimal>,
}

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    /// MLS number of the listing
    pub(crate) listing_id: String,
}

/// Dispatch the parsed command and return the process exit code.
pub(crate) async fn run() -> Result<i32, AppError> {
    dispatch(Cli::parse()).await
}

pub(crate) async fn dispatch(cli: Cli) -> Result<i32, AppError> {
    let command = cli.command.unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => scan::run(args).await,
        Command::Analyze(args) => run_analyze(args),
        Command::Show(args) => run_show(args).await,
    }
}
