mod mock_peer;

use dlnaconfig::DeviceIdentity;
use dlnacontrol::discovery::{DiscoveryOptions, discover_with};
use dlnacontrol::{Outcome, ValidationOptions, Validator};
use dlnaupnp::ssdp::{Advertiser, ROOT_DEVICE, SsdpClient};
use mock_peer::MockPeer;
use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Answers one M-SEARCH on loopback the way the announcer does, plus noise
fn spawn_ssdp_device(location: String) -> (SocketAddr, JoinHandle<()>) {
    let device = UdpSocket::bind("127.0.0.1:0").unwrap();
    device
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let addr = device.local_addr().unwrap();

    let advertiser = Advertiser::new(DeviceIdentity::new(
        "4d696e69-444c-164e-9d41-b827eb54e3c8",
        mock_peer::SERVER_HEADER,
        location,
        1800,
    ));

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 2048];
        let (n, from) = device.recv_from(&mut buf).unwrap();
        for response in advertiser.search_responses(&buf[..n]).unwrap() {
            device.send_to(&response, from).unwrap();
        }
        device.send_to(b"NOTIFY * HTTP/1.1\r\n\r\n", from).unwrap();
    });

    (addr, handle)
}

fn options() -> DiscoveryOptions {
    DiscoveryOptions {
        search_target: "ssdp:all".to_string(),
        window: Duration::from_millis(600),
        mx: 1,
    }
}

#[test]
fn test_replies_merge_into_one_peer() {
    let (device_addr, handle) = spawn_ssdp_device("http://127.0.0.1:8200/rootDesc.xml".to_string());
    let client = SsdpClient::with_target(device_addr).unwrap();

    let peers = discover_with(&client, &options()).unwrap();
    handle.join().unwrap();

    assert_eq!(peers.len(), 1);
    let peer = &peers[0];
    assert_eq!(peer.address, device_addr);
    assert!(peer.is_target("PHPDLNA"));
    assert!(peer.has_root_device());
    assert_eq!(peer.advertised_services.len(), 4);
    assert_eq!(peer.advertised_services[0].0, ROOT_DEVICE);
}

#[test]
fn test_discovered_peer_validates() {
    let mock = MockPeer::start();
    let (device_addr, handle) = spawn_ssdp_device(mock.location());
    let client = SsdpClient::with_target(device_addr).unwrap();

    let peers = discover_with(&client, &options()).unwrap();
    handle.join().unwrap();

    let validator = Validator::new(ValidationOptions {
        expected_location: Some(mock.location()),
        ..ValidationOptions::default()
    });
    let report = validator.validate_peers(peers);

    assert_eq!(report.verdicts.len(), 1);
    assert_eq!(report.verdicts[0].outcome, Outcome::Pass, "{:?}", report.verdicts[0].diagnostics);
    assert_eq!(report.exit_code(), 0);
}
