//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Ce module implémente les deux côtés de SSDP pour un media server DLNA.
//!
//! ## Fonctionnalités
//!
//! - ✅ Construction des NOTIFY alive/byebye, M-SEARCH et réponses M-SEARCH
//! - ✅ Analyse typée des en-têtes (obligatoires / optionnels)
//! - ✅ Annonceur multicast avec nettoyage garanti (byebye + sortie du groupe)
//! - ✅ Ré-annonce périodique toutes les `max-age / 2` secondes
//! - ✅ Client M-SEARCH sur port éphémère avec fenêtre de collecte bornée
//!
//! ## Architecture
//!
//! - [`Advertiser`] : partie pure de l'annonceur (bursts, réponses M-SEARCH)
//! - [`SsdpAnnouncer`] : sockets et machine à états Idle / Announcing
//! - [`SsdpClient`] : control point, envoi de M-SEARCH et collecte des réponses
//! - [`SsdpHeaders`] / [`SearchReply`] : analyse des datagrammes reçus
//!
//! ## Constants SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 43200 secondes (12 heures) par défaut
//! - **TTL multicast**: 3 sauts

mod announcer;
mod client;
mod headers;
mod message;

use std::net::Ipv4Addr;

pub use announcer::{Advertiser, AnnouncerError, AnnouncerOptions, SsdpAnnouncer};
pub use client::SsdpClient;
pub use headers::{SearchReply, SsdpHeaders, SsdpMessage, SsdpParseError, StartLine};
pub use message::{
    NotifyStatus, ServiceAdvertisement, SsdpMessageError, build_msearch, build_msearch_response,
    build_notify, notify_burst,
};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Durée de validité des annonces par défaut (en secondes)
pub const MAX_AGE: u64 = 43200;

/// TTL multicast des annonces
pub const DEFAULT_TTL: u32 = 3;

pub const ROOT_DEVICE: &str = "upnp:rootdevice";
pub const MEDIA_SERVER: &str = "urn:schemas-upnp-org:device:MediaServer:1";
pub const CONNECTION_MANAGER: &str = "urn:schemas-upnp-org:service:ConnectionManager:1";
pub const CONTENT_DIRECTORY: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

/// Types annoncés par le media server, dans l'ordre d'émission
pub const ADVERTISED_SERVICES: [&str; 4] =
    [ROOT_DEVICE, MEDIA_SERVER, CONNECTION_MANAGER, CONTENT_DIRECTORY];

/// Erreur du client SSDP
#[derive(Debug, thiserror::Error)]
pub enum SsdpError {
    #[error("SSDP socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Message(#[from] SsdpMessageError),
}
