//! Utilitaires réseau et système partagés par les crates dlna.
//!
//! - [`guess_local_ip`] : devine l'adresse IP utilisée pour les connexions sortantes
//! - [`list_ipv4_addrs`] : liste les adresses IPv4 non-loopback des interfaces
//! - [`get_os_string`] : décrit le système pour l'en-tête SSDP `SERVER`
mod ip_utils;

pub use ip_utils::{guess_local_ip, list_ipv4_addrs};

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// # Format
/// - Linux: "Linux/6.5.0" ou "Ubuntu/22.04"
/// - macOS: "Macos/15.1"
/// - Autre: "{OS}/Unknown"
///
/// ```
/// let os = dlnautils::get_os_string();
/// assert!(os.contains('/'));
/// ```
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}

/// Construit l'identifiant `SERVER` SSDP d'un produit : `<os>/<version> UPnP/1.0 <product>`.
pub fn server_string(product: &str) -> String {
    format!("{} UPnP/1.0 {}", get_os_string(), product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_string_layout() {
        let server = server_string("PHPDLNA/1.0");
        assert!(server.ends_with(" UPnP/1.0 PHPDLNA/1.0"));
        assert!(!server.contains('\r'));
        assert!(!server.contains('\n'));
    }
}
