//! Mock UPnP MediaServer for validator tests
//!
//! Serves the device description, a ContentDirectory SCPD, the two SOAP
//! control endpoints and one media resource. SSDP is not simulated: tests
//! build the `DiscoveredPeer` directly from `location()`.

#![allow(dead_code)]

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dlnacontrol::DiscoveredPeer;
use dlnaupnp::soap::{build_soap_fault, build_soap_response, error_codes, parse_soap_envelope};
use dlnaupnp::ssdp::{CONNECTION_MANAGER, CONTENT_DIRECTORY, ROOT_DEVICE};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

pub const SERVER_HEADER: &str = "Linux/6.1 UPnP/1.0 PHPDLNA/1.0";

pub const TRACK_URL_PATH: &str = "/media/track.mp3";

/// Mock server behaviour
#[derive(Debug, Clone)]
pub struct MockPeerState {
    pub declare_content_directory: bool,
    pub protocol_source: String,
    /// `None` omits the Sink argument from the response
    pub protocol_sink: Option<String>,
    /// ObjectID -> DIDL-Lite children
    pub tree: HashMap<String, String>,
    /// Browse answers HTTP 500 with UPnP error 701
    pub browse_fault: bool,
    /// Media HEAD carries Accept-Ranges and an audio Content-Type
    pub streamable_media: bool,
}

impl Default for MockPeerState {
    fn default() -> Self {
        let mut tree = HashMap::new();
        tree.insert(
            "0".to_string(),
            didl(&[container("1", "Music")], &[]),
        );
        tree.insert(
            "1".to_string(),
            didl(&[], &[item("1$1", "First track", Some(TRACK_URL_PATH))]),
        );

        Self {
            declare_content_directory: true,
            protocol_source: "http-get:*:audio/mpeg:*,http-get:*:audio/flac:*".to_string(),
            protocol_sink: Some(String::new()),
            tree,
            browse_fault: false,
            streamable_media: true,
        }
    }
}

pub fn container(id: &str, title: &str) -> String {
    format!(
        r#"<container id="{id}" parentID="0" restricted="1"><dc:title>{title}</dc:title><upnp:class>object.container.storageFolder</upnp:class></container>"#
    )
}

pub fn item(id: &str, title: &str, res: Option<&str>) -> String {
    let res = res
        .map(|url| format!(r#"<res protocolInfo="http-get:*:audio/mpeg:*">{url}</res>"#))
        .unwrap_or_default();
    format!(
        r#"<item id="{id}" parentID="0" restricted="1"><dc:title>{title}</dc:title><upnp:class>object.item.audioItem.musicTrack</upnp:class>{res}</item>"#
    )
}

pub fn didl(containers: &[String], items: &[String]) -> String {
    format!(
        r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">{}{}</DIDL-Lite>"#,
        containers.concat(),
        items.concat()
    )
}

/// Mock media server running on its own tokio runtime
pub struct MockPeer {
    addr: SocketAddr,
    runtime: Runtime,
}

impl MockPeer {
    pub fn start() -> Self {
        Self::start_with_state(MockPeerState::default())
    }

    pub fn start_with_state(state: MockPeerState) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();

        let state = Arc::new(state);
        let app = Router::new()
            .route("/rootDesc.xml", get(handle_description))
            .route("/cds.xml", get(handle_scpd))
            .route("/cms.xml", get(handle_scpd))
            .route("/ctl/ConnectionMgr", post(handle_connection_manager))
            .route("/ctl/ContentDir", post(handle_content_directory))
            .route(TRACK_URL_PATH, get(handle_media))
            .with_state(state);

        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();

        runtime.spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, runtime }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn location(&self) -> String {
        format!("http://{}/rootDesc.xml", self.addr)
    }

    /// Peer as discovery would have produced it
    pub fn peer(&self) -> DiscoveredPeer {
        DiscoveredPeer {
            address: SocketAddr::new(self.addr.ip(), 1900),
            server_header: SERVER_HEADER.to_string(),
            advertised_services: vec![
                (ROOT_DEVICE.to_string(), self.location()),
                (CONTENT_DIRECTORY.to_string(), self.location()),
            ],
        }
    }
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, r#"text/xml; charset="utf-8""#)],
        body,
    )
        .into_response()
}

async fn handle_description(State(state): State<Arc<MockPeerState>>) -> Response {
    let mut services = format!(
        r#"<service>
        <serviceType>{CONNECTION_MANAGER}</serviceType>
        <serviceId>urn:upnp-org:serviceId:ConnectionManager</serviceId>
        <controlURL>/ctl/ConnectionMgr</controlURL>
        <eventSubURL>/evt/ConnectionMgr</eventSubURL>
        <SCPDURL>/cms.xml</SCPDURL>
      </service>"#
    );
    if state.declare_content_directory {
        services.push_str(&format!(
            r#"<service>
        <serviceType>{CONTENT_DIRECTORY}</serviceType>
        <serviceId>urn:upnp-org:serviceId:ContentDirectory</serviceId>
        <controlURL>/ctl/ContentDir</controlURL>
        <eventSubURL>/evt/ContentDir</eventSubURL>
        <SCPDURL>/cds.xml</SCPDURL>
      </service>"#
        ));
    }

    let body = format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
    <friendlyName>Mock PHPDLNA</friendlyName>
    <UDN>uuid:4d696e69-444c-164e-9d41-b827eb54e3c8</UDN>
    <serviceList>
      {services}
    </serviceList>
  </device>
</root>"#
    );
    xml_response(StatusCode::OK, body)
}

async fn handle_scpd() -> Response {
    let body = r#"<?xml version="1.0"?>
<scpd xmlns="urn:schemas-upnp-org:service-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <actionList>
    <action><name>Browse</name></action>
  </actionList>
</scpd>"#;
    xml_response(StatusCode::OK, body.to_string())
}

async fn handle_connection_manager(State(state): State<Arc<MockPeerState>>) -> Response {
    let mut values = vec![("Source", state.protocol_source.as_str())];
    if let Some(sink) = &state.protocol_sink {
        values.push(("Sink", sink.as_str()));
    }

    match build_soap_response(CONNECTION_MANAGER, "GetProtocolInfo", &values) {
        Ok(xml) => xml_response(StatusCode::OK, xml),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn upnp_fault(code: &str, description: &str) -> Response {
    match build_soap_fault("s:Client", "UPnPError", Some((code, description))) {
        Ok(xml) => xml_response(StatusCode::INTERNAL_SERVER_ERROR, xml),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_content_directory(State(state): State<Arc<MockPeerState>>, body: Bytes) -> Response {
    if state.browse_fault {
        return upnp_fault(error_codes::NO_SUCH_OBJECT, "No such object");
    }

    let object_id = parse_soap_envelope(&body)
        .ok()
        .and_then(|env| {
            env.body
                .find("Browse")
                .and_then(|browse| browse.get_child("ObjectID"))
                .and_then(|e| e.get_text())
                .map(|t| t.to_string())
        });

    let Some(didl_result) = object_id.and_then(|id| state.tree.get(&id).cloned()) else {
        return upnp_fault(error_codes::NO_SUCH_OBJECT, "No such object");
    };

    match build_soap_response(
        CONTENT_DIRECTORY,
        "Browse",
        &[
            ("Result", didl_result.as_str()),
            ("NumberReturned", "1"),
            ("TotalMatches", "1"),
            ("UpdateID", "1"),
        ],
    ) {
        Ok(xml) => xml_response(StatusCode::OK, xml),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_media(State(state): State<Arc<MockPeerState>>) -> Response {
    let payload = vec![0u8; 1024];
    if state.streamable_media {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "audio/mpeg"),
                (header::ACCEPT_RANGES, "bytes"),
                (header::CONTENT_LENGTH, "1024"),
            ],
            payload,
        )
            .into_response()
    } else {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            payload,
        )
            .into_response()
    }
}
