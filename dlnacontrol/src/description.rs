//! Client de description de device (`rootDesc.xml`) et des SCPD
//!
//! Les URLs de service sont résolues contre `URLBase` s'il est déclaré,
//! sinon contre l'URL du document lui-même.

use crate::errors::ControlPointError;
use dlnaupnp::ssdp::{CONNECTION_MANAGER, CONTENT_DIRECTORY};
use tracing::debug;
use ureq::Agent;
use url::Url;
use xmltree::Element;

/// Un service déclaré dans la description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub service_type: String,
    /// URL absolue de contrôle, si déclarée
    pub control_url: Option<String>,
    /// URL absolue du SCPD, si déclarée
    pub scpd_url: Option<String>,
}

impl ServiceEntry {
    pub fn control_url(&self) -> Result<&str, ControlPointError> {
        self.control_url
            .as_deref()
            .ok_or_else(|| ControlPointError::MissingServiceUrl {
                service: self.service_type.clone(),
                field: "controlURL",
            })
    }

    pub fn scpd_url(&self) -> Result<&str, ControlPointError> {
        self.scpd_url
            .as_deref()
            .ok_or_else(|| ControlPointError::MissingServiceUrl {
                service: self.service_type.clone(),
                field: "SCPDURL",
            })
    }
}

/// Description d'un media server
///
/// Invariant : exactement une entrée ConnectionManager:1 et une entrée
/// ContentDirectory:1.
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    pub base_url: String,
    /// `false` quand `base_url` est l'URL du document faute de `URLBase`
    pub declares_url_base: bool,
    pub friendly_name: Option<String>,
    pub services: Vec<ServiceEntry>,
}

impl DeviceDescription {
    /// Premier service de ce type
    pub fn service(&self, service_type: &str) -> Option<&ServiceEntry> {
        self.services.iter().find(|s| s.service_type == service_type)
    }

    fn required(&self, service_type: &str) -> Result<&ServiceEntry, ControlPointError> {
        self.service(service_type)
            .ok_or_else(|| ControlPointError::MissingService(service_type.to_string()))
    }

    pub fn connection_manager(&self) -> Result<&ServiceEntry, ControlPointError> {
        self.required(CONNECTION_MANAGER)
    }

    pub fn content_directory(&self) -> Result<&ServiceEntry, ControlPointError> {
        self.required(CONTENT_DIRECTORY)
    }
}

/// GET d'un document XML, le statut doit être 2xx
pub(crate) fn http_get(agent: &Agent, url: &str) -> Result<String, ControlPointError> {
    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| ControlPointError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ControlPointError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            detail: String::new(),
        });
    }

    response
        .body_mut()
        .read_to_string()
        .map_err(|e| ControlPointError::transport(url, e))
}

/// Télécharge et analyse la description d'un device
pub fn fetch(agent: &Agent, location: &str) -> Result<DeviceDescription, ControlPointError> {
    debug!("Fetching device description at {}", location);
    let body = http_get(agent, location)?;
    parse_description(location, body.as_bytes())
}

/// Télécharge un SCPD et vérifie que c'est du XML bien formé
pub fn fetch_scpd(agent: &Agent, url: &str) -> Result<Element, ControlPointError> {
    debug!("Fetching SCPD at {}", url);
    let body = http_get(agent, url)?;
    Element::parse(body.as_bytes()).map_err(|e| ControlPointError::malformed("SCPD XML", e))
}

fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .get_child(name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Collecte les `<service>` du device racine et des devices embarqués
fn collect_services<'a>(root: &'a Element, out: &mut Vec<&'a Element>) {
    for child in root.children.iter().filter_map(|n| n.as_element()) {
        if child.name == "service" {
            out.push(child);
        } else {
            collect_services(child, out);
        }
    }
}

fn resolve(base: &Url, raw: Option<String>) -> Result<Option<String>, ControlPointError> {
    match raw {
        Some(raw) => base
            .join(&raw)
            .map(|u| Some(u.to_string()))
            .map_err(|e| ControlPointError::malformed(format!("service URL '{}'", raw), e)),
        None => Ok(None),
    }
}

/// Analyse un document de description déjà téléchargé depuis `location`
pub fn parse_description(
    location: &str,
    xml: &[u8],
) -> Result<DeviceDescription, ControlPointError> {
    let root =
        Element::parse(xml).map_err(|e| ControlPointError::malformed("device description XML", e))?;

    let location_url =
        Url::parse(location).map_err(|e| ControlPointError::malformed("description URL", e))?;

    let (base, declares_url_base) = match child_text(&root, "URLBase") {
        Some(url_base) => {
            let base = Url::parse(&url_base)
                .map_err(|e| ControlPointError::malformed("URLBase", e))?;
            (base, true)
        }
        None => (location_url, false),
    };

    let friendly_name = root.get_child("device").and_then(|d| child_text(d, "friendlyName"));

    let mut service_elements = Vec::new();
    collect_services(&root, &mut service_elements);

    let mut services = Vec::new();
    for elem in service_elements {
        let Some(service_type) = child_text(elem, "serviceType") else {
            continue;
        };
        services.push(ServiceEntry {
            control_url: resolve(&base, child_text(elem, "controlURL"))?,
            scpd_url: resolve(&base, child_text(elem, "SCPDURL"))?,
            service_type,
        });
    }

    for required in [CONNECTION_MANAGER, CONTENT_DIRECTORY] {
        match services.iter().filter(|s| s.service_type == required).count() {
            0 => return Err(ControlPointError::MissingService(required.to_string())),
            1 => {}
            _ => return Err(ControlPointError::DuplicateService(required.to_string())),
        }
    }

    Ok(DeviceDescription {
        base_url: base.to_string(),
        declares_url_base,
        friendly_name,
        services,
    })
}
