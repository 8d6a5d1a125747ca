use crate::errors::ControlPointError;
use crate::soap_client::{extract_child_text_allow_empty, find_action_response, invoke};
use dlnaupnp::ssdp::CONNECTION_MANAGER;
use tracing::debug;
use ureq::Agent;

#[derive(Debug, Clone)]
pub struct ConnectionManagerClient {
    agent: Agent,
    pub control_url: String,
    pub service_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// Liste des protocolInfo "source" (séparés par virgule dans UPnP)
    pub source: Vec<String>,
    /// Liste des protocolInfo "sink"
    pub sink: Vec<String>,
}

impl ConnectionManagerClient {
    pub fn new(agent: Agent, control_url: impl Into<String>) -> Self {
        Self {
            agent,
            control_url: control_url.into(),
            service_type: CONNECTION_MANAGER.to_string(),
        }
    }

    /// GetProtocolInfo
    pub fn get_protocol_info(&self) -> Result<ProtocolInfo, ControlPointError> {
        const ACTION: &str = "GetProtocolInfo";

        let body = invoke(&self.agent, &self.control_url, &self.service_type, ACTION, &[])?;
        let response = find_action_response(&body, ACTION)?;

        let source_text = extract_child_text_allow_empty(response, ACTION, "Source")?;
        // Sink est facultatif pour un media server
        let sink_text = extract_child_text_allow_empty(response, ACTION, "Sink").unwrap_or_default();

        let info = ProtocolInfo {
            source: split_list(&source_text),
            sink: split_list(&sink_text),
        };
        debug!(
            "GetProtocolInfo: {} source / {} sink entries",
            info.source.len(),
            info.sink.len()
        );
        Ok(info)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
