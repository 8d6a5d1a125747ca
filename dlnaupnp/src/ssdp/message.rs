//! Construction des datagrammes SSDP
//!
//! Fonctions pures : aucun socket, aucune horloge. Chaque ligne se termine
//! par CRLF et le message par une ligne vide. Ordre des en-têtes :
//! start-line, HOST/EXT, CACHE-CONTROL, LOCATION, SERVER, NT/ST, USN, NTS.

use super::{ADVERTISED_SERVICES, SSDP_MULTICAST_ADDR, SSDP_PORT};
use dlnaconfig::DeviceIdentity;
use std::fmt::Write;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SsdpMessageError {
    #[error("Invalid SSDP identifier for {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },
}

/// Sous-type NTS d'un NOTIFY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    Alive,
    ByeBye,
}

impl NotifyStatus {
    pub fn as_nts(&self) -> &'static str {
        match self {
            NotifyStatus::Alive => "ssdp:alive",
            NotifyStatus::ByeBye => "ssdp:byebye",
        }
    }
}

/// Couple (type annoncé, USN) dérivé de l'UUID du device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAdvertisement {
    pub service_type_urn: String,
    pub usn: String,
}

impl ServiceAdvertisement {
    /// `USN = uuid:<uuid>::<type>`
    pub fn new(uuid: &str, service_type_urn: &str) -> Self {
        Self {
            service_type_urn: service_type_urn.to_string(),
            usn: format!("uuid:{}::{}", uuid, service_type_urn),
        }
    }

    /// Annonce du root device : `NT = USN = uuid:<uuid>`
    pub fn root_device(uuid: &str) -> Self {
        let usn = format!("uuid:{}", uuid);
        Self {
            service_type_urn: usn.clone(),
            usn,
        }
    }

    /// Liste fixe des services annoncés par le media server
    pub fn for_identity(identity: &DeviceIdentity) -> Vec<Self> {
        ADVERTISED_SERVICES
            .iter()
            .map(|urn| Self::new(&identity.uuid, urn))
            .collect()
    }
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), SsdpMessageError> {
    let valid = !value.is_empty()
        && value.is_ascii()
        && !value.contains('\r')
        && !value.contains('\n');

    if valid {
        Ok(())
    } else {
        Err(SsdpMessageError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

fn check_identity(identity: &DeviceIdentity) -> Result<(), SsdpMessageError> {
    check_identifier("uuid", &identity.uuid)?;
    check_identifier("server_id", &identity.server_id)?;
    check_identifier("location", &identity.location_url)
}

fn check_advertisement(advertisement: &ServiceAdvertisement) -> Result<(), SsdpMessageError> {
    check_identifier("service_type", &advertisement.service_type_urn)?;
    check_identifier("usn", &advertisement.usn)
}

/// Construit un NOTIFY alive ou byebye pour une annonce
pub fn build_notify(
    identity: &DeviceIdentity,
    advertisement: &ServiceAdvertisement,
    status: NotifyStatus,
) -> Result<Vec<u8>, SsdpMessageError> {
    check_identity(identity)?;
    check_advertisement(advertisement)?;

    let mut msg = String::new();
    let _ = write!(
        msg,
        "NOTIFY * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         CACHE-CONTROL: max-age={}\r\n\
         LOCATION: {}\r\n\
         SERVER: {}\r\n\
         NT: {}\r\n\
         USN: {}\r\n\
         NTS: {}\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR,
        SSDP_PORT,
        identity.cache_seconds,
        identity.location_url,
        identity.server_id,
        advertisement.service_type_urn,
        advertisement.usn,
        status.as_nts()
    );

    Ok(msg.into_bytes())
}

/// Burst complet : le root device d'abord, puis une annonce par service
pub fn notify_burst(
    identity: &DeviceIdentity,
    advertisements: &[ServiceAdvertisement],
    status: NotifyStatus,
) -> Result<Vec<Vec<u8>>, SsdpMessageError> {
    let root = ServiceAdvertisement::root_device(&identity.uuid);

    std::iter::once(&root)
        .chain(advertisements.iter())
        .map(|advertisement| build_notify(identity, advertisement, status))
        .collect()
}

/// Réponse unicast à un M-SEARCH pour une annonce
pub fn build_msearch_response(
    identity: &DeviceIdentity,
    advertisement: &ServiceAdvertisement,
) -> Result<Vec<u8>, SsdpMessageError> {
    check_identity(identity)?;
    check_advertisement(advertisement)?;

    let mut msg = String::new();
    let _ = write!(
        msg,
        "HTTP/1.1 200 OK\r\n\
         EXT:\r\n\
         CACHE-CONTROL: max-age={}\r\n\
         LOCATION: {}\r\n\
         SERVER: {}\r\n\
         ST: {}\r\n\
         USN: {}\r\n\
         \r\n",
        identity.cache_seconds,
        identity.location_url,
        identity.server_id,
        advertisement.service_type_urn,
        advertisement.usn
    );

    Ok(msg.into_bytes())
}

/// Requête M-SEARCH multicast (MX est ramené à au moins 1)
pub fn build_msearch(search_target: &str, max_wait_seconds: u32) -> Result<Vec<u8>, SsdpMessageError> {
    check_identifier("search_target", search_target)?;

    let mx = max_wait_seconds.max(1);
    let mut msg = String::new();
    let _ = write!(
        msg,
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR, SSDP_PORT, mx, search_target
    );

    Ok(msg.into_bytes())
}
