//! dfs-portal CLI entry point
//!
//! Loads a `.env` file when present, then delegates everything to the CLI
//! module. Errors go to stderr with the error's exit status.

use dfs_portal::cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = cli::run().await {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}
