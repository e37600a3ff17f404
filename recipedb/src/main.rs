use clap::Parser;
use recipedb::Database;
use recipedb::config::{Args, Config};
use recipedb::db::migrations;
use recipedb::telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!("{:?}", args);

    let db = Database::connect(&config).await?;
    let outcome = db.migrate(config.migrations.create_dev_user).await;
    db.close().await;

    match outcome {
        Ok(()) => info!(version = migrations::latest_version(), "database is up to date"),
        Err(ref e) => tracing::error!(error = %e, "migration failed"),
    }
    telemetry::shutdown_telemetry();
    Ok(outcome?)
}
