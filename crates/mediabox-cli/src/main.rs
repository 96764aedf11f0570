mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Logging is set up per command once arguments are parsed: the worker
    // must keep stdout and stderr free of log output.
    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("mediabox error: {:#}", err);
        std::process::exit(1);
    }
}
