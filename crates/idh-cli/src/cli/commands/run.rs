//! `idh run` – fetch identities and persist them incrementally.

use anyhow::{Context, Result};
use idh_core::buffer::PersistenceBuffer;
use idh_core::config::HarvestConfig;
use idh_core::control::{self, ShutdownCoordinator};
use idh_core::identity::CurlIdentityClient;
use idh_core::retry::RetryingFetcher;
use idh_core::scheduler::{self, BatchOptions, ProgressStats, RunSummary};
use idh_core::storage::StorageSheet;
use std::sync::Arc;
use std::time::Instant;

const PROGRESS_INTERVAL_MS: u64 = 500;

pub async fn run_harvest(cfg: &HarvestConfig) -> Result<()> {
    // Storage problems are fatal before any request goes out.
    let sheet = StorageSheet::open_or_create(&cfg.output_path, &cfg.sheet_name)
        .context("open output workbook")?;
    println!(
        "Output {} (sheet \"{}\", {} existing rows)",
        cfg.output_path.display(),
        sheet.sheet_name(),
        sheet.data_row_count()
    );

    if !cfg.api.has_credentials() {
        tracing::warn!("no api client_id configured; requests are sent without credentials");
    }
    let client = CurlIdentityClient::new(&cfg.api)?;
    tracing::info!(
        url = client.url(),
        total = cfg.total_requests,
        concurrency = cfg.max_concurrency,
        "starting batch"
    );

    let buffer = PersistenceBuffer::new(sheet, cfg.flush_every);
    let fetcher = Arc::new(RetryingFetcher::new(client, cfg.retry_policy()));
    let shutdown = Arc::new(ShutdownCoordinator::new());
    let _signals = control::spawn_signal_listener(Arc::clone(&shutdown))
        .context("install signal handlers")?;

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(64);
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.completed >= stats.total
            {
                let eta = stats
                    .eta()
                    .map(|d| format!("{}s", d.as_secs()))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  {} / {} requests ({:.1}%)  {} ok  {} skipped  {:.1} req/s  ETA {}",
                    stats.completed,
                    stats.total,
                    stats.percent(),
                    stats.succeeded,
                    stats.skipped,
                    stats.rate().unwrap_or(0.0),
                    eta
                );
                last_print = now;
            }
        }
    });

    let result = scheduler::run_batch(
        fetcher,
        &buffer,
        BatchOptions {
            total: cfg.total_requests,
            max_concurrency: cfg.max_concurrency,
        },
        &shutdown,
        Some(&progress_tx),
    )
    .await;
    drop(progress_tx);
    let _ = progress_handle.await;

    let summary = result?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(s: &RunSummary) {
    if s.interrupted {
        println!(
            "Interrupted after {} of {} requests; remaining data saved.",
            s.completed, s.total
        );
    } else {
        println!("All {} requests completed.", s.completed);
    }
    println!(
        "Saved {} records to {} ({} save(s)); {} request(s) skipped.",
        s.rows_saved,
        s.path.display(),
        s.flushes,
        s.skipped
    );
}
