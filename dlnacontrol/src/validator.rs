//! Orchestrateur de validation
//!
//! Chaque pair visé est exercé de bout en bout, un à la fois. La première
//! erreur interrompt le pair avec un verdict `Fail`.

use crate::connection_manager_client::ConnectionManagerClient;
use crate::content_directory::{
    ContentDirectoryClient, DEFAULT_MAX_DEPTH, DEFAULT_REQUESTED_COUNT, ROOT_OBJECT_ID,
};
use crate::description::{self, DeviceDescription};
use crate::discovery::{DiscoveredPeer, DiscoveryOptions, discover};
use crate::errors::ControlPointError;
use crate::resource_check::check_resource;
use crate::verdict::{Outcome, Verdict};
use crate::{DEFAULT_HTTP_TIMEOUT, build_agent};
use std::time::Duration;
use tracing::{info, warn};
use ureq::Agent;
use url::Url;

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub search_target: String,
    pub window: Duration,
    pub mx: u32,
    /// Sous-chaîne du SERVER désignant l'implémentation visée
    pub server_marker: String,
    pub max_depth: usize,
    pub requested_count: u32,
    pub http_timeout: Duration,
    /// LOCATION attendue (celle configurée pour l'annonceur)
    pub expected_location: Option<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        let discovery = DiscoveryOptions::default();
        Self {
            search_target: discovery.search_target,
            window: discovery.window,
            mx: discovery.mx,
            server_marker: "PHPDLNA".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            requested_count: DEFAULT_REQUESTED_COUNT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            expected_location: None,
        }
    }
}

impl ValidationOptions {
    pub fn discovery(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            search_target: self.search_target.clone(),
            window: self.window,
            mx: self.mx,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Tous les pairs ayant répondu
    pub peers: Vec<DiscoveredPeer>,
    /// Un verdict par pair visé, dans l'ordre de découverte
    pub verdicts: Vec<Verdict>,
}

impl ValidationReport {
    /// 0 : au moins un pair visé et aucun échec, 1 : un échec, 2 : aucun pair visé
    pub fn exit_code(&self) -> i32 {
        if self.verdicts.is_empty() {
            2
        } else if self.verdicts.iter().any(|v| v.outcome == Outcome::Fail) {
            1
        } else {
            0
        }
    }
}

pub struct Validator {
    agent: Agent,
    options: ValidationOptions,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            agent: build_agent(options.http_timeout),
            options,
        }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Découverte puis validation de chaque pair visé
    pub fn run(&self) -> Result<ValidationReport, ControlPointError> {
        let peers = discover(&self.options.discovery())?;
        Ok(self.validate_peers(peers))
    }

    pub fn validate_peers(&self, peers: Vec<DiscoveredPeer>) -> ValidationReport {
        let verdicts = peers
            .iter()
            .filter(|p| p.is_target(&self.options.server_marker))
            .map(|p| self.validate_peer(p))
            .collect();

        ValidationReport { peers, verdicts }
    }

    pub fn validate_peer(&self, peer: &DiscoveredPeer) -> Verdict {
        let mut verdict = Verdict::new(peer.clone());
        info!("🧪 Validating {} ({})", peer.address, peer.server_header);

        if let Err(e) = self.check_peer(peer, &mut verdict) {
            if e.is_content_warning() {
                verdict.warn(e.to_string());
            } else {
                warn!("❌ {}: {}", peer.address, e);
                verdict.fail(e.to_string());
            }
        }

        info!("{} {}", verdict.outcome, peer.address);
        verdict
    }

    fn check_peer(
        &self,
        peer: &DiscoveredPeer,
        verdict: &mut Verdict,
    ) -> Result<(), ControlPointError> {
        let location = self.pick_location(peer, verdict)?;
        self.cross_check_location(peer, &location, verdict);

        let device = description::fetch(&self.agent, &location)?;
        report_description(&device, verdict);

        let cm = device.connection_manager()?;
        let cm_client = ConnectionManagerClient::new(self.agent.clone(), cm.control_url()?);
        let protocol_info = cm_client.get_protocol_info()?;
        if protocol_info.source.is_empty() {
            return Err(ControlPointError::EmptyValue {
                action: "GetProtocolInfo".to_string(),
                element: "Source".to_string(),
            });
        }
        verdict.info(format!(
            "GetProtocolInfo: {} source protocol(s)",
            protocol_info.source.len()
        ));

        let cd = device.content_directory()?;
        description::fetch_scpd(&self.agent, cd.scpd_url()?)?;
        verdict.info("ContentDirectory SCPD is well-formed XML");

        let browser = ContentDirectoryClient::new(self.agent.clone(), cd.control_url()?)
            .with_max_depth(self.options.max_depth)
            .with_requested_count(self.options.requested_count);

        let root_level = browser.browse_children(ROOT_OBJECT_ID)?;
        for node in &root_level {
            verdict.info(format!("Top-level entry: {}", node.title()));
        }

        let playable = browser.find_playable_from(root_level)?;
        verdict.info(format!(
            "Playable item /{} at {}",
            playable.path.join("/"),
            playable.resource_url
        ));

        let warnings = check_resource(&self.agent, &playable.resource_url)?;
        for warning in &warnings {
            verdict.warn(format!("{}: {}", playable.resource_url, warning));
        }

        verdict.info("Media server answered every validation step");
        Ok(())
    }

    /// LOCATION du `upnp:rootdevice`, sinon la première annoncée
    fn pick_location(
        &self,
        peer: &DiscoveredPeer,
        verdict: &mut Verdict,
    ) -> Result<String, ControlPointError> {
        if let Some(location) = peer.root_location() {
            return Ok(location.to_string());
        }

        match peer.advertised_services.first() {
            Some((st, location)) => {
                verdict.warn(format!(
                    "no upnp:rootdevice advertisement, using LOCATION of {}",
                    st
                ));
                Ok(location.clone())
            }
            None => Err(ControlPointError::MalformedMessage {
                what: "discovery".to_string(),
                message: format!("{} advertised no LOCATION", peer.address),
            }),
        }
    }

    /// Seuls les hôtes sont comparés : chemin, port et slash final sont ignorés
    fn cross_check_location(&self, peer: &DiscoveredPeer, location: &str, verdict: &mut Verdict) {
        let host = match location_host(location) {
            Ok(host) => host,
            Err(e) => {
                verdict.warn(format!("LOCATION '{}' is not a valid URL: {}", location, e));
                return;
            }
        };

        if host != peer.address.ip().to_string() {
            verdict.warn(format!(
                "LOCATION host {} differs from answering address {}",
                host,
                peer.address.ip()
            ));
        }

        if let Some(expected) = &self.options.expected_location {
            match location_host(expected) {
                Ok(expected_host) if expected_host == host => {}
                Ok(expected_host) => verdict.warn(format!(
                    "LOCATION host {} differs from configured host {} ({})",
                    host, expected_host, expected
                )),
                Err(e) => verdict.warn(format!(
                    "configured location '{}' is not a valid URL: {}",
                    expected, e
                )),
            }
        }
    }
}

fn location_host(location: &str) -> Result<String, url::ParseError> {
    let url = Url::parse(location)?;
    let host = url.host_str().unwrap_or_default();
    Ok(host.trim_start_matches('[').trim_end_matches(']').to_string())
}

fn report_description(device: &DeviceDescription, verdict: &mut Verdict) {
    let name = device.friendly_name.as_deref().unwrap_or("<unnamed>");
    verdict.info(format!("Device description fetched: {}", name));
    if !device.declares_url_base {
        verdict.info(format!(
            "no URLBase declared, service URLs resolved against {}",
            device.base_url
        ));
    }
}
