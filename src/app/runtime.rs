use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use picasa_dl_core::download::{HttpClient, Persister, RateGate};
use picasa_dl_core::mirror::{Mirror, MirrorConfig};
use picasa_dl_core::schedule::{CompletionBarrier, SchedulerConfig};
use picasa_dl_core::site::SiteLayout;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config, terminal};
use crate::cli::Args;

pub(crate) async fn run_picasa_dl() -> Result<ProcessExit> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    terminal::init_tracing(terminal::default_log_level(args.verbose, args.quiet));
    debug!(?args, "CLI arguments parsed");

    let file_config = config::load_file_config(args.config.as_deref())?;
    let settings = config::resolve_settings(&args, file_config.as_ref())
        .context("Invalid configuration")?;

    let dest = prepare_destination(&settings.dest)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        user = %settings.user_id,
        dest = %dest.display(),
        "picasa-dl starting"
    );

    let writes = CompletionBarrier::new("writes");
    spawn_shutdown_handler(writes.clone());

    let client = HttpClient::new_with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs);
    let persister = Persister::new(
        client,
        Arc::new(RateGate::sized_for_host("network")),
        Arc::new(RateGate::sized_for_host("file")),
        writes,
    )
    .with_image_validation(settings.validate_images);
    debug!(
        network_gate = persister.network_gate().capacity(),
        file_gate = persister.file_gate().capacity(),
        "rate gates sized"
    );

    let mirror = Mirror::new(
        MirrorConfig {
            user_id: settings.user_id.clone(),
            feed_base_url: settings.feed_base_url.clone(),
            stylesheet_url: settings.stylesheet_url.clone(),
            scheduler: SchedulerConfig::with_ceiling(settings.max_in_flight),
        },
        persister,
        SiteLayout::new(dest),
    );

    loop {
        mirror.run_once().await;
        let Some(interval) = settings.interval else {
            break;
        };
        info!(secs = interval.as_secs(), "next run scheduled");
        tokio::time::sleep(interval).await;
    }

    Ok(ProcessExit::Success)
}

/// Creates the destination if needed and returns its absolute path.
fn prepare_destination(dest: &Path) -> Result<PathBuf> {
    if dest.exists() && !dest.is_dir() {
        bail!("Destination '{}' exists and is not a directory", dest.display());
    }
    if !dest.exists() {
        fs::create_dir_all(dest)
            .with_context(|| format!("Failed to create destination '{}'", dest.display()))?;
        info!(dir = %dest.display(), "Created destination directory");
    }
    dest.canonicalize()
        .with_context(|| format!("Failed to resolve destination '{}'", dest.display()))
}

/// On SIGINT or SIGTERM: refuse new writes, wait for open files to close,
/// then exit successfully.
fn spawn_shutdown_handler(writes: CompletionBarrier) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        info!(
            signal,
            pending_writes = writes.outstanding(),
            "interrupted, finishing open files"
        );
        writes.close();
        writes.wait().await;
        info!("pending writes drained, exiting");
        std::process::exit(i32::from(ProcessExit::Success.code()));
    });
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            () = wait_for_ctrl_c() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        },
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            wait_for_ctrl_c().await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await;
    "Ctrl-C"
}
