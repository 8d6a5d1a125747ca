use crate::errors::ControlPointError;
use dlnaupnp::soap::{
    SoapBody, SoapEnvelope, build_soap_request, parse_soap_envelope, parse_soap_fault,
};
use tracing::debug;
use ureq::Agent;
use xmltree::Element;

/// Result of a SOAP call:
/// - HTTP status code
/// - raw XML body (always)
/// - parsed SOAP envelope if parsing succeeded
pub struct SoapCallResult {
    pub status: u16,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

/// POST a UPnP SOAP action on a control URL, whatever the HTTP status.
///
/// - `control_url`: full HTTP URL of the service control endpoint
/// - `service_type`: service URN, e.g. "urn:schemas-upnp-org:service:ContentDirectory:1"
/// - `action`: action name, e.g. "Browse"
/// - `args`: list of (name, value) pairs, serialized in this order
pub fn invoke_upnp_action(
    agent: &Agent,
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<SoapCallResult, ControlPointError> {
    let body_xml = build_soap_request(service_type, action, args)
        .map_err(|e| ControlPointError::malformed(format!("{} request", action), e))?;

    let soap_action_header = format!(r#""{}#{}""#, service_type, action);
    debug!("📤 SOAP {} -> {}", soap_action_header, control_url);

    let mut response = agent
        .post(control_url)
        .header("Content-Type", r#"text/xml; charset="utf-8""#)
        .header("SOAPACTION", &soap_action_header)
        .send(body_xml)
        .map_err(|e| ControlPointError::transport(control_url, e))?;

    let status = response.status().as_u16();

    let raw_body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ControlPointError::transport(control_url, e))?;

    // Un corps illisible n'est pas une erreur ici : l'appelant décide
    let envelope = parse_soap_envelope(raw_body.as_bytes()).ok();

    Ok(SoapCallResult {
        status,
        raw_body,
        envelope,
    })
}

/// Invoke an action and return the SOAP `Body`.
///
/// HTTP 200 with a well-formed envelope is the only success. A fault sent
/// with HTTP 200 is returned as is: callers notice the missing response
/// element (see [`find_action_response`]).
pub fn invoke(
    agent: &Agent,
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<SoapBody, ControlPointError> {
    let call_result = invoke_upnp_action(agent, control_url, service_type, action, args)?;

    if call_result.status != 200 {
        let detail = match call_result
            .envelope
            .as_ref()
            .and_then(|env| parse_soap_fault(&env.body))
        {
            Some(fault) => format!(" ({} failed with {})", action, fault),
            None => format!(" ({} failed)", action),
        };
        return Err(ControlPointError::HttpStatus {
            url: control_url.to_string(),
            status: call_result.status,
            detail,
        });
    }

    match call_result.envelope {
        Some(envelope) => Ok(envelope.body),
        None => Err(ControlPointError::malformed(
            format!("{} response", action),
            parse_soap_envelope(call_result.raw_body.as_bytes())
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        )),
    }
}

/// `<u:{action}Response>` element of a Body, enriched with the fault if any
pub fn find_action_response<'a>(
    body: &'a SoapBody,
    action: &str,
) -> Result<&'a Element, ControlPointError> {
    let response_name = format!("{}Response", action);
    if let Some(response) = body.find(&response_name) {
        return Ok(response);
    }

    let detail = parse_soap_fault(body)
        .map(|fault| format!(" ({})", fault))
        .unwrap_or_default();

    Err(ControlPointError::MissingElement {
        action: action.to_string(),
        element: response_name,
        detail,
    })
}

/// Texte (éventuellement vide) d'un argument de sortie
pub fn extract_child_text_allow_empty(
    parent: &Element,
    action: &str,
    name: &str,
) -> Result<String, ControlPointError> {
    let child = parent
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .find(|e| e.name == name || e.name.ends_with(&format!(":{}", name)))
        .ok_or_else(|| ControlPointError::missing_element(action, name))?;

    Ok(child
        .get_text()
        .map(|t| t.trim().to_string())
        .unwrap_or_default())
}
