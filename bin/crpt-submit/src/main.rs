//! Entrypoint.

use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use futures::future::join_all;
use runtime::shutdown::{run_until_shutdown, shutdown_signal};
use submitter::{Document, DocumentSubmitter};
use tracing::{error, info, warn};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try the default .env file, and ignore if it doesn't exist.
        dotenv().ok();
    }

    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        url = %opts.endpoint.url,
        limit = opts.gate.request_limit,
        period_ms = opts.gate.period_ms,
        requests = opts.requests,
        "Starting CRPT submissions"
    );

    let submitter = Arc::new(DocumentSubmitter::from_opts(&opts)?);
    let document = Arc::new(Document::sample(Local::now().date_naive()));

    let handles = (0..opts.requests)
        .map(|request| {
            let submitter = Arc::clone(&submitter);
            let document = Arc::clone(&document);
            tokio::spawn(async move {
                match submitter.submit(document.as_ref()).await {
                    Ok(body) => {
                        info!(request, response = %String::from_utf8_lossy(&body), "Submitted");
                        true
                    }
                    Err(e) => {
                        error!(request, error = %e, "Submission failed");
                        false
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    let outcome = run_until_shutdown(join_all(handles), shutdown_signal(), || {
        warn!("Shutdown signal received, abandoning pending submissions")
    })
    .await;

    // Fails every submission still waiting for a slot and stops the reset task.
    submitter.shutdown().await;

    if let Some(results) = outcome {
        let succeeded = results.iter().filter(|r| matches!(r, Ok(true))).count();
        info!(succeeded, failed = results.len() - succeeded, "All submissions finished");
    }
    Ok(())
}
