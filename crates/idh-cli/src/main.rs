use std::future::Future;

use clap::Parser;
use idh_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if cli.log_stderr {
        logging::init_logging_stderr();
    } else if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    let result = match block_on_detached(cli.run()) {
        Ok(result) => result,
        Err(err) => Err(anyhow::Error::new(err).context("start async runtime")),
    };
    if let Err(err) = result {
        eprintln!("idh error: {:#}", err);
        std::process::exit(1);
    }
}

/// Drives `fut` on a current-thread runtime, then shuts the runtime down
/// without waiting for blocking tasks still in flight (requests abandoned by
/// an interrupted batch).
fn block_on_detached<F: Future>(fut: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(fut);
    runtime.shutdown_background();
    Ok(output)
}
