use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfprice_core::config::Settings;
use shelfprice_core::dataset::Dataset;

mod train;

#[derive(Debug, Parser)]
#[command(name = "shelfprice_worker")]
struct Args {
    /// Dataset CSV path. Defaults to DATASET_PATH, then data/groceries.csv.
    #[arg(long)]
    data: Option<String>,

    /// Output path for the model artifact. Defaults to MODEL_PATH.
    #[arg(long)]
    model_out: Option<String>,

    /// Output path for the scaler artifact. Defaults to SCALER_PATH.
    #[arg(long)]
    scaler_out: Option<String>,

    /// Gradient descent epochs.
    #[arg(long, default_value_t = train::DEFAULT_EPOCHS)]
    epochs: usize,

    /// Train and report metrics without writing artifacts.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, &args) {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "training run failed");
        return Err(err);
    }

    Ok(())
}

fn run(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    let data_path = args.data.as_deref().unwrap_or_else(|| settings.dataset_path());
    let dataset = Dataset::from_csv_path(std::path::Path::new(data_path))?;
    tracing::info!(path = %data_path, products = dataset.len(), "dataset loaded");

    let trained = train::train(&dataset, args.epochs).context("training failed")?;
    tracing::info!(
        training_rows = trained.model.training_rows,
        train_r2 = trained.model.train_r2,
        holdout_r2 = trained.model.holdout_r2,
        "training complete"
    );

    if args.dry_run {
        tracing::info!(dry_run = true, "skipping artifact write");
        return Ok(());
    }

    let model_out = args.model_out.as_deref().unwrap_or_else(|| settings.model_path());
    let scaler_out = args.scaler_out.as_deref().unwrap_or_else(|| settings.scaler_path());
    train::write_artifacts(
        &trained,
        std::path::Path::new(model_out),
        std::path::Path::new(scaler_out),
    )?;
    tracing::info!(model_out = %model_out, scaler_out = %scaler_out, "artifacts written");

    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
