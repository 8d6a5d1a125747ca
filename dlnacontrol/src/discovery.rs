//! Découverte SSDP des media servers
//!
//! Les réponses reçues pendant la fenêtre sont fusionnées par adresse
//! source. Une réponse illisible est ignorée.

use crate::errors::ControlPointError;
use dlnaupnp::ssdp::{ROOT_DEVICE, SearchReply, SsdpClient};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Pair ayant répondu au M-SEARCH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    pub address: SocketAddr,
    /// Dernier en-tête SERVER reçu
    pub server_header: String,
    /// ST → LOCATION, dans l'ordre d'arrivée
    pub advertised_services: Vec<(String, String)>,
}

impl DiscoveredPeer {
    fn new(address: SocketAddr, reply: SearchReply) -> Self {
        Self {
            address,
            server_header: reply.server,
            advertised_services: vec![(reply.st, reply.location)],
        }
    }

    fn update(&mut self, reply: SearchReply) {
        self.server_header = reply.server;
        match self
            .advertised_services
            .iter_mut()
            .find(|(st, _)| *st == reply.st)
        {
            Some(entry) => entry.1 = reply.location,
            None => self.advertised_services.push((reply.st, reply.location)),
        }
    }

    /// Implémentation visée : SERVER contient le marqueur
    pub fn is_target(&self, marker: &str) -> bool {
        self.server_header.contains(marker)
    }

    pub fn location_for(&self, st: &str) -> Option<&str> {
        self.advertised_services
            .iter()
            .find(|(s, _)| s == st)
            .map(|(_, location)| location.as_str())
    }

    pub fn has_root_device(&self) -> bool {
        self.location_for(ROOT_DEVICE).is_some()
    }

    pub fn root_location(&self) -> Option<&str> {
        self.location_for(ROOT_DEVICE)
    }
}

/// Pairs d'une fenêtre de découverte, dans l'ordre de première réponse
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: Vec<DiscoveredPeer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, from: SocketAddr, reply: SearchReply) {
        match self.peers.iter_mut().find(|p| p.address == from) {
            Some(peer) => peer.update(reply),
            None => {
                debug!("New SSDP peer {} ({})", from, reply.server);
                self.peers.push(DiscoveredPeer::new(from, reply));
            }
        }
    }

    /// Fusionne un datagramme brut, sans effet s'il est illisible
    pub fn merge_datagram(&mut self, from: SocketAddr, data: &[u8]) -> bool {
        match SearchReply::parse(data) {
            Ok(reply) => {
                self.merge(from, reply);
                true
            }
            Err(e) => {
                trace!("Dropping SSDP datagram from {}: {}", from, e);
                false
            }
        }
    }

    pub fn peers(&self) -> &[DiscoveredPeer] {
        &self.peers
    }

    pub fn into_peers(self) -> Vec<DiscoveredPeer> {
        self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub search_target: String,
    pub window: Duration,
    pub mx: u32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            search_target: "ssdp:all".to_string(),
            window: Duration::from_secs(9),
            mx: 3,
        }
    }
}

/// M-SEARCH sur le groupe multicast puis collecte pendant la fenêtre
pub fn discover(options: &DiscoveryOptions) -> Result<Vec<DiscoveredPeer>, ControlPointError> {
    if options.window.is_zero() {
        debug!("Empty discovery window, skipping M-SEARCH");
        return Ok(Vec::new());
    }

    let client = SsdpClient::new().map_err(dlnaupnp::ssdp::SsdpError::from)?;
    discover_with(&client, options)
}

/// Même découverte avec un client déjà construit
pub fn discover_with(
    client: &SsdpClient,
    options: &DiscoveryOptions,
) -> Result<Vec<DiscoveredPeer>, ControlPointError> {
    if options.window.is_zero() {
        return Ok(Vec::new());
    }

    client.send_msearch(&options.search_target, options.mx)?;

    let mut table = PeerTable::new();
    client
        .collect(options.window, |from, data| {
            table.merge_datagram(from, data);
        })
        .map_err(dlnaupnp::ssdp::SsdpError::from)?;

    info!("🔎 Discovery finished: {} peer(s)", table.len());
    Ok(table.into_peers())
}

/// Pairs dont le SERVER contient le marqueur
pub fn target_peers<'a>(
    peers: &'a [DiscoveredPeer],
    marker: &'a str,
) -> impl Iterator<Item = &'a DiscoveredPeer> + 'a {
    peers.iter().filter(move |p| p.is_target(marker))
}
