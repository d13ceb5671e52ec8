//! Encodes a SIP message as a HEPv3 packet, then decodes it back,
//! printing the envelope fields a HOMER-style capture agent would send.

use sipscope::dissect::{hep_decode, hep_encode, HepPacket, HepVersion};
use std::net::{IpAddr, Ipv4Addr};
use tracing::Level;

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let payload = b"OPTIONS sip:ping@h SIP/2.0\r\nCall-ID: keepalive@h\r\nCSeq: 1 OPTIONS\r\nFrom: <sip:a@h>\r\nTo: <sip:b@h>\r\nContent-Length: 0\r\n\r\n";

    let packet = HepPacket {
        version: HepVersion::V3,
        src_addr: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
        dst_addr: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        src_port: 5060,
        dst_port: 5060,
        protocol: 17,
        timestamp: (1_700_000_000, 0),
        capture_id: Some(101),
        auth_key: None,
        payload: bytes::Bytes::from_static(payload),
    };

    let encoded = hep_encode(&packet);
    println!("encoded {} bytes", encoded.len());

    let decoded = hep_decode(&encoded).expect("round-trips");
    println!("from {}:{} to {}:{}", decoded.src_addr, decoded.src_port, decoded.dst_addr, decoded.dst_port);
    println!("capture_id={:?}", decoded.capture_id);
    println!("payload={}", String::from_utf8_lossy(&decoded.payload));
}
