//! # dlnacontrol - control point de validation DLNA
//!
//! Découvre les media servers par SSDP puis les exerce de bout en bout :
//! description du device, `GetProtocolInfo`, SCPD du ContentDirectory,
//! navigation jusqu'à un item lisible et requête HEAD sur sa ressource.
//!
//! Toutes les opérations sont bloquantes, avec des timeouts explicites
//! (fenêtre de découverte, timeout global de l'agent HTTP).

pub mod connection_manager_client;
pub mod content_directory;
pub mod description;
pub mod discovery;
pub mod errors;
pub mod resource_check;
pub mod soap_client;
pub mod validator;
pub mod verdict;

use std::time::Duration;
use ureq::Agent;

pub use connection_manager_client::{ConnectionManagerClient, ProtocolInfo};
pub use content_directory::{BrowseLevel, ContentDirectoryClient, Playable};
pub use description::{DeviceDescription, ServiceEntry};
pub use discovery::{DiscoveredPeer, DiscoveryOptions, PeerTable, discover};
pub use errors::ControlPointError;
pub use resource_check::{ResourceWarning, check_resource};
pub use validator::{ValidationOptions, ValidationReport, Validator};
pub use verdict::{Diagnostic, Outcome, Severity, Verdict};

/// Timeout HTTP global par défaut
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Agent HTTP partagé par les clients du control point.
///
/// Les statuts 4xx/5xx ne sont pas des erreurs : le corps d'un SOAP Fault
/// (HTTP 500) doit rester lisible.
pub fn build_agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();

    config.into()
}
