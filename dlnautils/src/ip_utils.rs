use get_if_addrs::get_if_addrs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Devine l'adresse IP locale de la machine.
///
/// Un socket UDP est "connecté" vers un serveur public (8.8.8.8) : aucun paquet
/// n'est émis, mais le système choisit l'interface de sortie, dont on lit
/// l'adresse. En cas d'échec, retourne `127.0.0.1`.
///
/// ```
/// let ip = dlnautils::guess_local_ip();
/// assert!(!ip.is_empty());
/// ```
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Liste les adresses IPv4 non-loopback des interfaces réseau.
///
/// Les erreurs d'énumération donnent une liste vide : l'appelant retombe alors
/// sur `INADDR_ANY`.
pub fn list_ipv4_addrs() -> Vec<Ipv4Addr> {
    let mut result = Vec::new();

    if let Ok(interfaces) = get_if_addrs() {
        for iface in interfaces {
            if let IpAddr::V4(ipv4) = iface.ip() {
                if !ipv4.is_loopback() && !result.contains(&ipv4) {
                    result.push(ipv4);
                }
            }
        }
    }

    result
}
