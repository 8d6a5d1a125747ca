//! Annonceur SSDP du media server
//!
//! Deux états : `Idle` (aucun socket) et `Announcing` (socket de réception
//! lié à 0.0.0.0:1900 et abonné au groupe multicast, socket d'émission
//! séparé avec un TTL de 3). Le passage `Announcing -> Idle` émet le burst
//! byebye et quitte le groupe, y compris depuis `Drop`.

use super::{
    DEFAULT_TTL, SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpMessage, StartLine,
    message::{
        NotifyStatus, ServiceAdvertisement, SsdpMessageError, build_msearch_response, notify_burst,
    },
};
use dlnaconfig::DeviceIdentity;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Délai maximal d'attente d'un datagramme avant de revérifier l'arrêt
const POLL_INTERVAL: Duration = Duration::from_secs(1);

const BUFFER_SIZE: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum AnnouncerError {
    #[error("SSDP socket error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Message(#[from] SsdpMessageError),

    #[error("SSDP announcer is already announcing")]
    AlreadyAnnouncing,

    #[error("SSDP announcer is not announcing")]
    NotAnnouncing,
}

/// Partie pure de l'annonceur : quels datagrammes émettre et quand
#[derive(Debug, Clone)]
pub struct Advertiser {
    identity: DeviceIdentity,
    services: Vec<ServiceAdvertisement>,
    strict_search_target: bool,
}

impl Advertiser {
    /// Annonce la liste fixe des services du media server
    pub fn new(identity: DeviceIdentity) -> Self {
        let services = ServiceAdvertisement::for_identity(&identity);
        Self {
            identity,
            services,
            strict_search_target: false,
        }
    }

    /// Ne répond qu'aux M-SEARCH dont le ST correspond à une annonce
    pub fn with_strict_search_target(mut self, strict: bool) -> Self {
        self.strict_search_target = strict;
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn services(&self) -> &[ServiceAdvertisement] {
        &self.services
    }

    pub fn notify_burst(&self, status: NotifyStatus) -> Result<Vec<Vec<u8>>, SsdpMessageError> {
        notify_burst(&self.identity, &self.services, status)
    }

    /// Réponses unicast à un datagramme reçu sur le groupe
    ///
    /// Tout datagramme qui ne commence pas par `M-SEARCH` donne zéro réponse.
    /// Hors mode strict, la liste complète est renvoyée quel que soit le ST.
    pub fn search_responses(&self, datagram: &[u8]) -> Result<Vec<Vec<u8>>, SsdpMessageError> {
        if !datagram.starts_with(b"M-SEARCH") {
            return Ok(Vec::new());
        }

        let targets = if self.strict_search_target {
            let search_target = SsdpMessage::from_bytes(datagram)
                .ok()
                .filter(|m| m.start_line == StartLine::MSearch)
                .and_then(|m| m.headers.get("ST").map(str::to_string));
            self.matching(search_target.as_deref())
        } else {
            self.services.clone()
        };

        targets
            .iter()
            .map(|advertisement| build_msearch_response(&self.identity, advertisement))
            .collect()
    }

    fn matching(&self, search_target: Option<&str>) -> Vec<ServiceAdvertisement> {
        let Some(st) = search_target else {
            return Vec::new();
        };

        if st == "ssdp:all" {
            return self.services.clone();
        }

        let root = ServiceAdvertisement::root_device(&self.identity.uuid);
        if st == root.service_type_urn {
            return vec![root];
        }

        self.services
            .iter()
            .filter(|s| s.service_type_urn == st)
            .cloned()
            .collect()
    }
}

/// Paramètres réseau de l'annonceur
#[derive(Debug, Clone)]
pub struct AnnouncerOptions {
    /// TTL multicast des NOTIFY
    pub ttl: u32,

    /// Interface sur laquelle rejoindre le groupe (`None` = INADDR_ANY)
    pub interface: Option<Ipv4Addr>,
}

impl Default for AnnouncerOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            interface: None,
        }
    }
}

struct Sockets {
    receive: UdpSocket,
    send: UdpSocket,
    interface: Ipv4Addr,
    /// Destination des NOTIFY
    group: SocketAddr,
}

enum State {
    Idle,
    Announcing(Sockets),
}

/// Annonceur SSDP avec nettoyage garanti
pub struct SsdpAnnouncer {
    advertiser: Advertiser,
    options: AnnouncerOptions,
    state: State,
}

impl SsdpAnnouncer {
    pub fn new(advertiser: Advertiser, options: AnnouncerOptions) -> Self {
        Self {
            advertiser,
            options,
            state: State::Idle,
        }
    }

    pub fn advertiser(&self) -> &Advertiser {
        &self.advertiser
    }

    pub fn is_announcing(&self) -> bool {
        matches!(self.state, State::Announcing(_))
    }

    /// Période de ré-annonce : la moitié du max-age
    pub fn reannounce_interval(&self) -> Duration {
        Duration::from_secs((self.advertiser.identity().cache_seconds / 2).max(1))
    }

    /// Idle -> Announcing : sockets, abonnement au groupe, burst alive
    pub fn start(&mut self) -> Result<(), AnnouncerError> {
        if self.is_announcing() {
            return Err(AnnouncerError::AlreadyAnnouncing);
        }

        // Identifiants invalides : on échoue avant d'ouvrir le moindre socket
        let alive = self.advertiser.notify_burst(NotifyStatus::Alive)?;

        let interface = self.options.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let sockets = Sockets {
            receive: open_receive_socket(interface)?,
            send: open_send_socket(self.options.ttl, self.options.interface)?,
            interface,
            group: SocketAddr::from((SSDP_MULTICAST_ADDR, SSDP_PORT)),
        };

        info!(
            "✅ SSDP announcer joined {}:{} on {}",
            SSDP_MULTICAST_ADDR, SSDP_PORT, interface
        );

        send_burst(&sockets, &alive, "alive");
        self.state = State::Announcing(sockets);
        Ok(())
    }

    /// Boucle de service jusqu'à ce que `shutdown` passe à `true`
    ///
    /// Chaque itération attend au plus une seconde un datagramme. Les erreurs
    /// d'émission ou de réception sont journalisées sans interrompre la boucle.
    pub fn serve(&mut self, shutdown: &AtomicBool) -> Result<(), AnnouncerError> {
        let State::Announcing(sockets) = &self.state else {
            return Err(AnnouncerError::NotAnnouncing);
        };

        let period = self.reannounce_interval();
        let mut last_announce = Instant::now();
        let mut buf = [0u8; BUFFER_SIZE];

        info!("📡 SSDP announcer serving (re-announce every {:?})", period);

        while !shutdown.load(Ordering::SeqCst) {
            if last_announce.elapsed() >= period {
                match self.advertiser.notify_burst(NotifyStatus::Alive) {
                    Ok(alive) => send_burst(sockets, &alive, "alive (periodic)"),
                    Err(e) => warn!("❌ Cannot build periodic NOTIFY alive: {}", e),
                }
                last_announce = Instant::now();
            }

            match sockets.receive.recv_from(&mut buf) {
                Ok((n, src)) => self.answer(&sockets.send, &buf[..n], src),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => warn!("❌ SSDP read error: {}", e),
            }
        }

        info!("SSDP announcer loop stopped");
        Ok(())
    }

    fn answer(&self, send: &UdpSocket, datagram: &[u8], src: SocketAddr) {
        let responses = match self.advertiser.search_responses(datagram) {
            Ok(responses) => responses,
            Err(e) => {
                warn!("❌ Cannot build M-SEARCH responses: {}", e);
                return;
            }
        };

        if responses.is_empty() {
            trace!("Ignoring SSDP datagram from {} ({} bytes)", src, datagram.len());
            return;
        }

        debug!(
            "📥 M-SEARCH from {}\n<details>\n\n```\n{}\n```\n</details>\n",
            src,
            String::from_utf8_lossy(datagram)
        );

        for response in &responses {
            if let Err(e) = send.send_to(response, src) {
                warn!("❌ Failed to send M-SEARCH response to {}: {}", src, e);
            }
        }
        info!("📡 {} M-SEARCH responses sent to {}", responses.len(), src);
    }

    /// Announcing -> Idle : burst byebye, sortie du groupe, fermeture des sockets
    ///
    /// Best effort : les erreurs sont journalisées, jamais propagées.
    pub fn stop(&mut self) {
        let State::Announcing(sockets) = std::mem::replace(&mut self.state, State::Idle) else {
            return;
        };

        match self.advertiser.notify_burst(NotifyStatus::ByeBye) {
            Ok(byebye) => send_burst(&sockets, &byebye, "byebye"),
            Err(e) => warn!("❌ Cannot build NOTIFY byebye: {}", e),
        }

        if let Err(e) = sockets
            .receive
            .leave_multicast_v4(&SSDP_MULTICAST_ADDR, &sockets.interface)
        {
            warn!("❌ Failed to leave {}: {}", SSDP_MULTICAST_ADDR, e);
        }

        drop(sockets);
        info!("👋 SSDP announcer stopped");
    }
}

impl Drop for SsdpAnnouncer {
    fn drop(&mut self) {
        if self.is_announcing() {
            info!("Shutting down SSDP announcer, sending byebye");
            self.stop();
        }
    }
}

fn send_burst(sockets: &Sockets, burst: &[Vec<u8>], label: &str) {
    let mut sent = 0;
    for datagram in burst {
        match sockets.send.send_to(datagram, sockets.group) {
            Ok(_) => sent += 1,
            Err(e) => warn!("❌ Failed to send NOTIFY {}: {}", label, e),
        }
    }
    info!("✅ NOTIFY {} burst: {}/{} datagrams sent", label, sent, burst.len());
}

fn open_receive_socket(interface: Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, SSDP_PORT));
    socket.bind(&bind_addr.into())?;
    socket.join_multicast_v4(&SSDP_MULTICAST_ADDR, &interface)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;

    Ok(socket.into())
}

fn open_send_socket(ttl: u32, interface: Option<Ipv4Addr>) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_multicast_ttl_v4(ttl)?;
    if let Some(interface) = interface {
        socket.set_multicast_if_v4(&interface)?;
    }

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
    socket.bind(&bind_addr.into())?;

    Ok(socket.into())
}
