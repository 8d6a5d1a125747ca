//! # dlnatools - binaires `dlna-announce` et `dlna-validate`
//!
//! Code partagé par les deux binaires : initialisation des logs et
//! conversion de la configuration en options de validation.

use anyhow::Result;
use dlnaconfig::Config;
use dlnacontrol::ValidationOptions;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Installe le subscriber `fmt` sur stderr.
///
/// `RUST_LOG` a priorité sur le niveau configuré (`logger.min_level`).
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Charge la configuration, `""` désignant le répertoire par défaut
pub fn load_config(config_dir: Option<&str>) -> Result<Config> {
    Config::load_config(config_dir.unwrap_or(""))
}

/// Options du validateur tirées de la configuration
///
/// La LOCATION attendue n'est renseignée que si `device.location` est
/// explicitement configurée.
pub fn validation_options(config: &Config) -> Result<ValidationOptions> {
    Ok(ValidationOptions {
        search_target: config.get_search_target()?,
        window: Duration::from_secs(config.get_discovery_window_secs()?),
        mx: config.get_search_mx()?,
        server_marker: config.get_server_marker()?,
        max_depth: config.get_max_browse_depth()?,
        requested_count: config.get_browse_count()?,
        http_timeout: Duration::from_secs(config.get_http_timeout_secs()?),
        expected_location: config.get_configured_location()?,
    })
}
