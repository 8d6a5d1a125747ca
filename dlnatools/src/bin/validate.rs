use anyhow::Result;
use clap::Parser;
use dlnacontrol::{DiscoveredPeer, ValidationReport, Validator, Verdict};
use dlnatools::{init_logging, load_config, validation_options};
use std::time::Duration;
use tracing::info;

/// Découvre les media servers DLNA et les valide de bout en bout
#[derive(Debug, Parser)]
#[command(name = "dlna-validate", version)]
struct Args {
    /// Répertoire de configuration (défaut : $DLNA_CONFIG, ./.dlna ou ~/.dlna)
    #[arg(long)]
    config_dir: Option<String>,

    /// Durée de la fenêtre de découverte, en secondes
    #[arg(long)]
    window: Option<u64>,

    /// ST du M-SEARCH
    #[arg(long)]
    search_target: Option<String>,

    /// Sous-chaîne du SERVER désignant l'implémentation à valider
    #[arg(long)]
    marker: Option<String>,

    /// Profondeur maximale de navigation dans le ContentDirectory
    #[arg(long)]
    max_depth: Option<usize>,

    /// LOCATION attendue pour le device validé
    #[arg(long)]
    expected_location: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config_dir.as_deref())?;
    init_logging(&config.get_log_min_level()?);

    let mut options = validation_options(&config)?;
    if let Some(window) = args.window {
        options.window = Duration::from_secs(window);
    }
    if let Some(search_target) = args.search_target {
        options.search_target = search_target;
    }
    if let Some(marker) = args.marker {
        options.server_marker = marker;
    }
    if let Some(max_depth) = args.max_depth {
        options.max_depth = max_depth;
    }
    if args.expected_location.is_some() {
        options.expected_location = args.expected_location;
    }

    info!(
        "🔎 Searching {} for {:?} (marker: {})",
        options.search_target, options.window, options.server_marker
    );

    let validator = Validator::new(options);
    let report = validator.run()?;

    print_report(&report, &validator.options().server_marker);
    std::process::exit(report.exit_code());
}

fn print_peer(peer: &DiscoveredPeer, marker: &str) {
    let target = if peer.is_target(marker) { " [target]" } else { "" };
    let root = if peer.has_root_device() {
        ""
    } else {
        " *NO upnp:rootdevice*"
    };
    println!("{} {}{}{}", peer.address, peer.server_header, target, root);
    for (st, location) in &peer.advertised_services {
        println!("    {} -> {}", st, location);
    }
}

fn print_verdict(verdict: &Verdict) {
    println!();
    println!("== {} {} ==", verdict.outcome, verdict.peer.address);
    for diagnostic in &verdict.diagnostics {
        println!("  {}", diagnostic);
    }
}

fn print_report(report: &ValidationReport, marker: &str) {
    println!("{} peer(s) answered", report.peers.len());
    for peer in &report.peers {
        print_peer(peer, marker);
    }

    if report.verdicts.is_empty() {
        println!();
        println!("No peer with '{}' in its SERVER header", marker);
        return;
    }

    for verdict in &report.verdicts {
        print_verdict(verdict);
    }
}
