/*!
The SSDP client is a *control point*.
It must **not** bind to UDP port 1900.

If both the announcer and the client listen on 1900 (even with SO_REUSEADDR)
the kernel may hand the unicast HTTP/200 replies to the wrong socket, and
they are lost for the client.

Therefore:

* announcer → bind(0.0.0.0:1900), join multicast, answer M-SEARCH.
* client → bind(0.0.0.0:0), use an ephemeral port, send M-SEARCH, receive replies.
*/
//! Client SSDP pour la découverte des media servers

use super::{SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpError, message::build_msearch};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Attente maximale par itération de la boucle de collecte
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const BUFFER_SIZE: usize = 8192;

/// Client SSDP : envoie un M-SEARCH et collecte les réponses unicast
pub struct SsdpClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl SsdpClient {
    /// Client visant le groupe multicast standard
    pub fn new() -> io::Result<Self> {
        Self::with_target(SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT).into())
    }

    /// Client envoyant ses M-SEARCH vers une adresse arbitraire
    ///
    /// Utile pour interroger un device en unicast ou sur l'interface loopback.
    pub fn with_target(target: SocketAddr) -> io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_multicast_loop_v4(true)?; // utile en dev local

        debug!("SSDP client bound to {}", socket.local_addr()?);

        Ok(Self { socket, target })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Envoie un M-SEARCH pour un type donné (MX >= 1)
    pub fn send_msearch(&self, st: &str, mx: u32) -> Result<(), SsdpError> {
        let msg = build_msearch(st, mx)?;

        match self.socket.send_to(&msg, self.target) {
            Ok(_) => {
                info!("📤 M-SEARCH sent to {} (ST={}, MX={})", self.target, st, mx.max(1));
                Ok(())
            }
            Err(e) => {
                warn!("❌ Failed to send M-SEARCH: {}", e);
                Err(e.into())
            }
        }
    }

    /// Collecte les datagrammes reçus pendant `window`
    ///
    /// La durée est une borne inférieure : la boucle s'arrête au premier
    /// réveil après l'échéance. Les erreurs de réception sont journalisées
    /// et n'interrompent pas la collecte.
    pub fn collect<F>(&self, window: Duration, mut on_datagram: F) -> io::Result<()>
    where
        F: FnMut(SocketAddr, &[u8]),
    {
        let deadline = Instant::now() + window;
        let mut buf = [0u8; BUFFER_SIZE];

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let wait = (deadline - now).min(POLL_INTERVAL);
            if wait.is_zero() {
                break;
            }
            self.socket.set_read_timeout(Some(wait))?;

            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => on_datagram(from, &buf[..n]),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    warn!("❌ SSDP client read error: {}", e);
                    std::thread::sleep(wait);
                }
            }
        }

        Ok(())
    }
}
