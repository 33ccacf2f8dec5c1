use anyhow::{Context, Result};
use std::sync::Arc;
use textstore_loadgen::{config, harness, telemetry, Corpus, HttpTextStore, TextStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use config::Config;
use telemetry::{init_tracing, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let cfg = Config::load()?;

    let corpus = Corpus::load(&cfg.corpus.path, cfg.corpus.skip_header)
        .context("corpus must be loaded before any virtual user starts")?;
    info!(
        path = %cfg.corpus.path.display(),
        lines = corpus.len(),
        "corpus loaded"
    );

    let store: Arc<dyn TextStore> = Arc::new(
        HttpTextStore::new(&cfg.target.base_url, cfg.target.timeout())
            .context("failed to build HTTP client")?,
    );
    info!(target_url = %cfg.target.base_url, "target configured");

    let shutdown = CancellationToken::new();
    tokio::spawn(telemetry::cancel_on_signal(shutdown.clone()));

    let report = harness::run(&cfg.load, Arc::new(corpus), store, shutdown).await;
    report.log();

    if let Some(path) = &cfg.report.json_path {
        report.write_json(path)?;
        info!(path = %path.display(), "report written");
    }

    if report.iterations_aborted > 0 {
        warn!(
            aborted = report.iterations_aborted,
            "some iterations were aborted"
        );
        if cfg.report.fail_on_abort {
            anyhow::bail!(
                "{} of {} iterations aborted",
                report.iterations_aborted,
                report.iterations()
            );
        }
    }
    Ok(())
}
