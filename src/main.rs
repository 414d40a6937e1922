// src/main.rs

use tracing::Instrument;

use soapci::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("soapci: cannot initialise logging: {err:?}");
        std::process::exit(1);
    }

    let span = logging::process_span(&args.command);
    if let Err(err) = run(args).instrument(span).await {
        eprintln!("soapci error: {err:?}");
        std::process::exit(1);
    }
}
