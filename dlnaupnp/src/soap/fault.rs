//! SOAP Faults pour UPnP

use super::{SoapBody, SoapError, UPNP_CONTROL_NS, builder, envelope::local_name};
use std::fmt;
use xmltree::{Element, XMLNode};

/// Erreur SOAP (Fault)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Code d'erreur (ex: "s:Client")
    pub fault_code: String,

    /// Description de l'erreur
    pub fault_string: String,

    /// Détails UPnP optionnels
    pub upnp_error: Option<UpnpError>,
}

/// Erreur UPnP spécifique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpError {
    /// Code d'erreur UPnP (ex: "401", "701")
    pub error_code: String,

    pub error_description: String,
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.upnp_error {
            Some(err) if err.error_description.is_empty() => {
                write!(f, "UPnP error {}", err.error_code)
            }
            Some(err) => write!(f, "UPnP error {}: {}", err.error_code, err.error_description),
            None => write!(f, "{}: {}", self.fault_code, self.fault_string),
        }
    }
}

fn descendant<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
    for node in &root.children {
        if let Some(elem) = node.as_element() {
            if local_name(&elem.name) == name {
                return Some(elem);
            }
            if let Some(found) = descendant(elem, name) {
                return Some(found);
            }
        }
    }
    None
}

fn text_of(root: &Element, name: &str) -> String {
    descendant(root, name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Extrait le Fault d'un Body, s'il y en a un
pub fn parse_soap_fault(body: &SoapBody) -> Option<SoapFault> {
    let fault = body.find("Fault")?;

    let upnp_error = descendant(fault, "UPnPError").map(|err| UpnpError {
        error_code: text_of(err, "errorCode"),
        error_description: text_of(err, "errorDescription"),
    });

    Some(SoapFault {
        fault_code: text_of(fault, "faultcode"),
        fault_string: text_of(fault, "faultstring"),
        upnp_error,
    })
}

/// Construit un SOAP Fault XML avec erreur UPnP optionnelle
pub fn build_soap_fault(
    fault_code: &str,
    fault_string: &str,
    upnp_error: Option<(&str, &str)>,
) -> Result<String, SoapError> {
    let mut fault = Element::new("s:Fault");
    fault
        .children
        .push(XMLNode::Element(builder::text_element("faultcode", fault_code)));
    fault
        .children
        .push(XMLNode::Element(builder::text_element("faultstring", fault_string)));

    if let Some((code, description)) = upnp_error {
        let mut error = Element::new("UPnPError");
        error
            .attributes
            .insert("xmlns".to_string(), UPNP_CONTROL_NS.to_string());
        error
            .children
            .push(XMLNode::Element(builder::text_element("errorCode", code)));
        error.children.push(XMLNode::Element(builder::text_element(
            "errorDescription",
            description,
        )));

        let mut detail = Element::new("detail");
        detail.children.push(XMLNode::Element(error));
        fault.children.push(XMLNode::Element(detail));
    }

    builder::write_envelope(fault, true)
}
