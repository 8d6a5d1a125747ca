use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dlnatools::{init_logging, load_config};
use dlnaupnp::ssdp::{Advertiser, AnnouncerOptions, SsdpAnnouncer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Annonce un media server DLNA sur le réseau local (SSDP)
#[derive(Debug, Parser)]
#[command(name = "dlna-announce", version)]
struct Args {
    /// Répertoire de configuration (défaut : $DLNA_CONFIG, ./.dlna ou ~/.dlna)
    #[arg(long)]
    config_dir: Option<String>,

    /// Ne répondre qu'aux M-SEARCH dont le ST correspond
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config_dir.as_deref())?;
    init_logging(&config.get_log_min_level()?);

    let identity = config.device_identity()?;
    let strict = args.strict || config.get_strict_search_target()?;
    let options = AnnouncerOptions {
        ttl: config.get_announce_ttl()?,
        interface: config.get_announce_interface()?,
    };

    info!(
        "🎵 Announcing uuid:{} at {} (strict ST: {})",
        identity.uuid, identity.location_url, strict
    );

    let advertiser = Advertiser::new(identity).with_strict_search_target(strict);
    let mut announcer = SsdpAnnouncer::new(advertiser, options);
    announcer.start().context("Cannot start SSDP announcer")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let loop_flag = shutdown.clone();

    // La boucle bloquante rend l'annonceur pour que stop() s'exécute ici
    let serve_task = tokio::task::spawn_blocking(move || {
        let result = announcer.serve(&loop_flag);
        (announcer, result)
    });

    wait_for_signal().await;
    info!("Shutdown requested, leaving the SSDP group...");
    shutdown.store(true, Ordering::SeqCst);

    let (mut announcer, result) = serve_task
        .await
        .map_err(|e| anyhow!("SSDP announcer task failed: {}", e))?;
    announcer.stop();

    if let Err(e) = result {
        warn!("❌ SSDP announcer loop ended with an error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("❌ Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
