//! Construction de requêtes et de réponses SOAP

use super::{SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS, SoapError};
use xmltree::{Element, XMLNode};

pub(crate) fn text_element(name: &str, text: &str) -> Element {
    let mut child = Element::new(name);
    child.children.push(XMLNode::Text(text.to_string()));
    child
}

pub(crate) fn write_envelope(body_child: Element, indent: bool) -> Result<String, SoapError> {
    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(body_child));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope
        .attributes
        .insert("s:encodingStyle".to_string(), SOAP_ENCODING_STYLE.to_string());
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(indent)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8(buf)?)
}

fn action_element(service_urn: &str, name: &str, args: &[(&str, &str)]) -> Element {
    let mut action = Element::new(&format!("u:{}", name));
    action
        .attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());

    for (arg, value) in args {
        action
            .children
            .push(XMLNode::Element(text_element(arg, value)));
    }
    action
}

/// Construit la requête SOAP d'une action UPnP
///
/// Les arguments sont émis dans l'ordre de l'appel.
pub fn build_soap_request(
    service_urn: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String, SoapError> {
    write_envelope(action_element(service_urn, action, args), false)
}

/// Construit la réponse SOAP `u:<Action>Response`
pub fn build_soap_response(
    service_urn: &str,
    action: &str,
    values: &[(&str, &str)],
) -> Result<String, SoapError> {
    write_envelope(
        action_element(service_urn, &format!("{}Response", action), values),
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_browse_request() {
        let xml = build_soap_request(
            "urn:schemas-upnp-org:service:ContentDirectory:1",
            "Browse",
            &[
                ("ObjectID", "0"),
                ("BrowseFlag", "BrowseDirectChildren"),
                ("Filter", "*"),
                ("StartingIndex", "0"),
                ("RequestedCount", "8"),
                ("SortCriteria", ""),
            ],
        )
        .unwrap();

        assert!(xml.contains("s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\""));
        assert!(xml.contains("<u:Browse xmlns:u=\"urn:schemas-upnp-org:service:ContentDirectory:1\">"));
        assert!(xml.contains("<ObjectID>0</ObjectID>"));

        let object_id = xml.find("<ObjectID>").unwrap();
        let flag = xml.find("<BrowseFlag>").unwrap();
        let count = xml.find("<RequestedCount>").unwrap();
        assert!(object_id < flag && flag < count);
    }

    #[test]
    fn test_build_response_escapes_text() {
        let xml = build_soap_response(
            "urn:schemas-upnp-org:service:ContentDirectory:1",
            "Browse",
            &[("Result", "<DIDL-Lite/>"), ("NumberReturned", "0")],
        )
        .unwrap();

        assert!(xml.contains("BrowseResponse"));
        assert!(xml.contains("&lt;DIDL-Lite/>") || xml.contains("&lt;DIDL-Lite/&gt;"));
        assert!(xml.contains("<NumberReturned>0</NumberReturned>"));
    }
}
