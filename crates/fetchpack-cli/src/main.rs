use clap::Parser;
use fetchpack_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Parse first: a bad invocation exits here, before logs or config touch the disk.
    let cli = Cli::parse();

    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    match cli.run().await {
        Ok(status) => std::process::exit(status.exit_code()),
        Err(err) => {
            eprintln!("fetchpack error: {:#}", err);
            std::process::exit(1);
        }
    }
}
