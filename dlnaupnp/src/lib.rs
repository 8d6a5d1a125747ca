//! # dlnaupnp - briques protocolaires UPnP
//!
//! - [`ssdp`] : construction et analyse des datagrammes SSDP, annonceur
//!   multicast et client M-SEARCH
//! - [`soap`] : enveloppes SOAP 1.1 (construction, analyse, faults UPnP)

pub mod soap;
pub mod ssdp;
