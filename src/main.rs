use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use covpub::config::Cli;
use covpub::outputs::report_failure;
use covpub::run_from_cli;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run_from_cli(&cli, |name| std::env::var(name).ok(), Utc::now()).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            report_failure(&format!(
                "An error occurred processing the summary file: {:#}",
                e
            ));
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .init();
}
