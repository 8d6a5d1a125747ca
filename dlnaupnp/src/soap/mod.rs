//! # Module SOAP - Simple Object Access Protocol
//!
//! Côté control point : construction des requêtes d'action UPnP et lecture
//! des réponses. La construction des réponses et des faults sert aux
//! devices simulés.
//!
//! ## Fonctionnalités
//!
//! - ✅ Enveloppe SOAP 1.1 (`s:Envelope`, `s:encodingStyle`)
//! - ✅ Action `u:<Action>` dans le namespace du service, arguments ordonnés
//! - ✅ Parsing d'enveloppes et extraction du `Body`
//! - ✅ Lecture des SOAP Faults et de l'erreur UPnP détaillée
//!
//! ## Example
//!
//! ```
//! use dlnaupnp::soap::{build_soap_request, parse_soap_envelope};
//!
//! let xml = build_soap_request(
//!     "urn:schemas-upnp-org:service:ConnectionManager:1",
//!     "GetProtocolInfo",
//!     &[],
//! )
//! .unwrap();
//!
//! let envelope = parse_soap_envelope(xml.as_bytes()).unwrap();
//! assert_eq!(envelope.body.first_element().unwrap().name, "GetProtocolInfo");
//! ```

mod builder;
mod envelope;
mod fault;
mod parser;

pub use builder::{build_soap_request, build_soap_response};
pub use envelope::{SoapBody, SoapEnvelope, SoapHeader};
pub use fault::{SoapFault, UpnpError, build_soap_fault, parse_soap_fault};
pub use parser::parse_soap_envelope;

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const UPNP_CONTROL_NS: &str = "urn:schemas-upnp-org:control-1-0";

/// Erreur SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("XML parse error: {0}")]
    Parse(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Write(#[from] xmltree::Error),

    #[error("Generated XML is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

/// Codes d'erreur UPnP standards
pub mod error_codes {
    pub const INVALID_ACTION: &str = "401";
    pub const INVALID_ARGS: &str = "402";
    pub const ACTION_FAILED: &str = "501";
    pub const NO_SUCH_OBJECT: &str = "701";
}
