mod cli;
mod infra;
mod inspect;
mod scan;

use dscr_scout::error::AppError;

/// Parse arguments, run the selected command and return the process exit code.
pub async fn run() -> Result<i32, AppError> {
    cli::run().await
}
