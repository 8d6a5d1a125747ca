//! Parser d'enveloppes SOAP

use super::{SoapBody, SoapEnvelope, SoapError, SoapHeader, envelope::local_name};
use xmltree::Element;

fn child_named<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
    root.children
        .iter()
        .filter_map(|n| n.as_element())
        .find(|e| local_name(&e.name) == name)
}

/// Parse une enveloppe SOAP complète
///
/// Le `Body` est obligatoire, le `Header` optionnel. Le contenu du `Body`
/// n'est pas interprété : un `Fault` est rendu tel quel.
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapError> {
    let root = Element::parse(xml)?;

    if local_name(&root.name) != "Envelope" {
        return Err(SoapError::MissingEnvelope);
    }

    let header = child_named(&root, "Header").map(|e| SoapHeader { content: e.clone() });

    let body = child_named(&root, "Body")
        .map(|e| SoapBody { content: e.clone() })
        .ok_or(SoapError::MissingBody)?;

    Ok(SoapEnvelope { header, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::build_soap_response;

    #[test]
    fn test_parse_response_roundtrip() {
        let xml = build_soap_response(
            "urn:schemas-upnp-org:service:ConnectionManager:1",
            "GetProtocolInfo",
            &[("Source", "http-get:*:audio/mpeg:*"), ("Sink", "")],
        )
        .unwrap();

        let envelope = parse_soap_envelope(xml.as_bytes()).unwrap();
        let response = envelope.body.find("GetProtocolInfoResponse").unwrap();
        let source = response.get_child("Source").unwrap();
        assert_eq!(source.get_text().unwrap(), "http-get:*:audio/mpeg:*");
        assert!(envelope.header.is_none());
    }

    #[test]
    fn test_parse_missing_body() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Header/>
</s:Envelope>"#;

        assert!(matches!(
            parse_soap_envelope(xml.as_bytes()),
            Err(SoapError::MissingBody)
        ));
    }

    #[test]
    fn test_parse_not_an_envelope() {
        assert!(matches!(
            parse_soap_envelope(b"<root/>"),
            Err(SoapError::MissingEnvelope)
        ));
        assert!(matches!(
            parse_soap_envelope(b"<s:Envelope"),
            Err(SoapError::Parse(_))
        ));
    }
}
