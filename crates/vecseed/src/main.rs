use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vecseed::{Cli, Pipeline};
use vecseed_core::{DocumentStore, InMemoryDocumentStore, VecseedError};
use vecseed_pgvector::PgDocumentStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("\n[error] {e}");
            if matches!(e, VecseedError::Connection(_)) {
                println!("make sure the database container is running: docker-compose up -d");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), VecseedError> {
    let pipeline = Pipeline::new(cli.seed_config());

    let mut store: Box<dyn DocumentStore> = if cli.dry_run {
        println!("[setup] dry run, using an in-memory store");
        Box::new(InMemoryDocumentStore::new(cli.dimensions).with_metric(cli.metric.into()))
    } else {
        let options = cli.connect_options()?;
        println!(
            "[setup] connecting to {}:{}...",
            options.get_host(),
            options.get_port()
        );
        Box::new(PgDocumentStore::connect(&options, cli.pg_config()?).await?)
    };

    let mut out = std::io::stdout();
    pipeline.run(store.as_mut(), &mut out).await?;
    Ok(())
}
