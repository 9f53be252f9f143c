use dscr_scout_cli::run;

const BOOTSTRAP_FAILURE: i32 = 3;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("application error: {err}");
            std::process::exit(BOOTSTRAP_FAILURE);
        }
    }
}
