//! HEP (Homer Encapsulation Protocol) v2/v3 codec and dissector (§4.7).
//!
//! HEP is the wire format EEP-speaking capture agents use to ship
//! already-captured packets to a collector: the encapsulated envelope
//! carries the original addresses and timestamp, and the payload is the
//! original protocol's bytes (SIP, almost always). Decoding overwrites
//! the packet's `Ip`/`Udp` layer attributes with the envelope's addresses
//! before handing the payload on to the `Sip` child, so a message
//! received via HEP looks, from `Storage`'s point of view, exactly like
//! one captured directly between those two addresses.
//!
//! v2 is a flat 22-byte header, IPv4-only: `family(u8) proto(u8)
//! src_port(u16) dst_port(u16) time_sec(u32) time_usec(u32) src_ip(u32)
//! dst_ip(u32)`. v3 is TLV: a `"HEP3"` magic, a `u16` total length, then
//! a run of chunks (`vendor_id(u16) type_id(u16) length(u16) data`,
//! `length` counting its own 6-byte header).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use util::ArcStr;

use crate::error::{Error, Result};
use crate::packet::{LayerAttrs, Packet, ProtocolId};
use crate::settings::Settings;

use super::{DissectOutcome, Dissector, Emission};

const HEP3_MAGIC: &[u8; 4] = b"HEP3";
const HEP2_HEADER_LEN: usize = 22;

const CHUNK_IP_FAMILY: u16 = 0x0001;
const CHUNK_IP_PROTOCOL: u16 = 0x0002;
const CHUNK_SRC_IP4: u16 = 0x0003;
const CHUNK_DST_IP4: u16 = 0x0004;
const CHUNK_SRC_IP6: u16 = 0x0005;
const CHUNK_DST_IP6: u16 = 0x0006;
const CHUNK_SRC_PORT: u16 = 0x0007;
const CHUNK_DST_PORT: u16 = 0x0008;
const CHUNK_TIME_SEC: u16 = 0x0009;
const CHUNK_TIME_USEC: u16 = 0x000a;
const CHUNK_PROTO_TYPE: u16 = 0x000b;
const CHUNK_CAPTURE_ID: u16 = 0x000c;
const CHUNK_AUTH_KEY: u16 = 0x000e;
const CHUNK_PAYLOAD: u16 = 0x000f;

const FAMILY_IP4: u8 = 2;
const FAMILY_IP6: u8 = 10;

/// Which HEP wire version a packet was (or should be) encoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HepVersion {
    V2,
    V3,
}

/// A decoded (or to-be-encoded) HEP envelope.
#[derive(Debug, Clone)]
pub struct HepPacket {
    pub version: HepVersion,
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    /// IANA protocol number of the encapsulated payload (17 for UDP-carried
    /// SIP, the common case).
    pub protocol: u8,
    /// Capture timestamp: `(seconds, microseconds)`.
    pub timestamp: (u32, u32),
    pub capture_id: Option<u32>,
    pub auth_key: Option<ArcStr>,
    pub payload: Bytes,
}

/// Encodes a [`HepPacket`] to its wire form.
///
/// `HepVersion::V2` only represents IPv4 endpoints; a packet carrying an
/// IPv6 address is encoded as v3 instead regardless of the requested
/// version, since there's no v2 wire representation to fall back to.
pub fn encode(packet: &HepPacket) -> Bytes {
    let use_v3 = packet.version == HepVersion::V3 || packet.src_addr.is_ipv6() || packet.dst_addr.is_ipv6();
    if use_v3 {
        encode_v3(packet)
    } else {
        encode_v2(packet)
    }
}

fn encode_v2(packet: &HepPacket) -> Bytes {
    let (IpAddr::V4(src), IpAddr::V4(dst)) = (packet.src_addr, packet.dst_addr) else {
        unreachable!("encode() routes IPv6 endpoints to encode_v3");
    };

    let mut buf = BytesMut::with_capacity(HEP2_HEADER_LEN + packet.payload.len());
    buf.put_u8(FAMILY_IP4);
    buf.put_u8(packet.protocol);
    buf.put_u16(packet.src_port);
    buf.put_u16(packet.dst_port);
    buf.put_u32(packet.timestamp.0);
    buf.put_u32(packet.timestamp.1);
    buf.put_slice(&src.octets());
    buf.put_slice(&dst.octets());
    buf.put_slice(&packet.payload);
    buf.freeze()
}

fn put_chunk(buf: &mut BytesMut, type_id: u16, data: &[u8]) {
    buf.put_u16(0); // vendor_id: none
    buf.put_u16(type_id);
    buf.put_u16((6 + data.len()) as u16);
    buf.put_slice(data);
}

fn encode_v3(packet: &HepPacket) -> Bytes {
    let mut body = BytesMut::new();

    let family = if packet.src_addr.is_ipv6() { FAMILY_IP6 } else { FAMILY_IP4 };
    put_chunk(&mut body, CHUNK_IP_FAMILY, &[family]);
    put_chunk(&mut body, CHUNK_IP_PROTOCOL, &[packet.protocol]);

    match (packet.src_addr, packet.dst_addr) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => {
            put_chunk(&mut body, CHUNK_SRC_IP4, &src.octets());
            put_chunk(&mut body, CHUNK_DST_IP4, &dst.octets());
        }
        (src, dst) => {
            put_chunk(&mut body, CHUNK_SRC_IP6, &to_v6_octets(src));
            put_chunk(&mut body, CHUNK_DST_IP6, &to_v6_octets(dst));
        }
    }

    put_chunk(&mut body, CHUNK_SRC_PORT, &packet.src_port.to_be_bytes());
    put_chunk(&mut body, CHUNK_DST_PORT, &packet.dst_port.to_be_bytes());
    put_chunk(&mut body, CHUNK_TIME_SEC, &packet.timestamp.0.to_be_bytes());
    put_chunk(&mut body, CHUNK_TIME_USEC, &packet.timestamp.1.to_be_bytes());
    put_chunk(&mut body, CHUNK_PROTO_TYPE, &[1]); // 1 = SIP

    if let Some(id) = packet.capture_id {
        put_chunk(&mut body, CHUNK_CAPTURE_ID, &id.to_be_bytes());
    }
    if let Some(key) = &packet.auth_key {
        put_chunk(&mut body, CHUNK_AUTH_KEY, key.as_bytes());
    }
    put_chunk(&mut body, CHUNK_PAYLOAD, &packet.payload);

    let total_len = 6 + body.len();
    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_slice(HEP3_MAGIC);
    buf.put_u16(total_len as u16);
    buf.put_slice(&body);
    buf.freeze()
}

fn to_v6_octets(addr: IpAddr) -> [u8; 16] {
    match addr {
        IpAddr::V6(v6) => v6.octets(),
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
    }
}

/// Decodes a HEP v2 or v3 packet, auto-detecting the version from the
/// `"HEP3"` magic.
pub fn decode(bytes: &[u8]) -> Result<HepPacket> {
    if bytes.starts_with(HEP3_MAGIC) {
        decode_v3(bytes)
    } else {
        decode_v2(bytes)
    }
}

fn decode_v2(bytes: &[u8]) -> Result<HepPacket> {
    if bytes.len() < HEP2_HEADER_LEN {
        return Err(Error::MalformedHep("v2 header truncated"));
    }
    let family = bytes[0];
    if family != FAMILY_IP4 {
        return Err(Error::UnsupportedHepVersion(2));
    }
    let protocol = bytes[1];
    let src_port = u16::from_be_bytes([bytes[2], bytes[3]]);
    let dst_port = u16::from_be_bytes([bytes[4], bytes[5]]);
    let ts_sec = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let ts_usec = u32::from_be_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);
    let src_addr = IpAddr::V4(Ipv4Addr::new(bytes[14], bytes[15], bytes[16], bytes[17]));
    let dst_addr = IpAddr::V4(Ipv4Addr::new(bytes[18], bytes[19], bytes[20], bytes[21]));

    Ok(HepPacket {
        version: HepVersion::V2,
        src_addr,
        dst_addr,
        src_port,
        dst_port,
        protocol,
        timestamp: (ts_sec, ts_usec),
        capture_id: None,
        auth_key: None,
        payload: Bytes::copy_from_slice(&bytes[HEP2_HEADER_LEN..]),
    })
}

fn decode_v3(bytes: &[u8]) -> Result<HepPacket> {
    if bytes.len() < 6 {
        return Err(Error::MalformedHep("v3 magic truncated"));
    }
    let total_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
    if total_len > bytes.len() {
        return Err(Error::MalformedHep("v3 declared length exceeds buffer"));
    }

    let mut family = None;
    let mut protocol = 0u8;
    let mut src_v4 = None;
    let mut dst_v4 = None;
    let mut src_v6 = None;
    let mut dst_v6 = None;
    let mut src_port = 0u16;
    let mut dst_port = 0u16;
    let mut ts_sec = 0u32;
    let mut ts_usec = 0u32;
    let mut capture_id = None;
    let mut auth_key = None;
    let mut payload = Bytes::new();

    let mut cursor = &bytes[6..total_len];
    while cursor.len() >= 6 {
        let _vendor_id = u16::from_be_bytes([cursor[0], cursor[1]]);
        let type_id = u16::from_be_bytes([cursor[2], cursor[3]]);
        let chunk_len = u16::from_be_bytes([cursor[4], cursor[5]]) as usize;
        if chunk_len < 6 || chunk_len > cursor.len() {
            return Err(Error::MalformedHep("v3 chunk length out of bounds"));
        }
        let data = &cursor[6..chunk_len];

        match type_id {
            CHUNK_IP_FAMILY if !data.is_empty() => family = Some(data[0]),
            CHUNK_IP_PROTOCOL if !data.is_empty() => protocol = data[0],
            CHUNK_SRC_IP4 if data.len() >= 4 => src_v4 = Some(Ipv4Addr::new(data[0], data[1], data[2], data[3])),
            CHUNK_DST_IP4 if data.len() >= 4 => dst_v4 = Some(Ipv4Addr::new(data[0], data[1], data[2], data[3])),
            CHUNK_SRC_IP6 if data.len() >= 16 => src_v6 = <[u8; 16]>::try_from(data).ok().map(Ipv6Addr::from),
            CHUNK_DST_IP6 if data.len() >= 16 => dst_v6 = <[u8; 16]>::try_from(data).ok().map(Ipv6Addr::from),
            CHUNK_SRC_PORT if data.len() >= 2 => src_port = u16::from_be_bytes([data[0], data[1]]),
            CHUNK_DST_PORT if data.len() >= 2 => dst_port = u16::from_be_bytes([data[0], data[1]]),
            CHUNK_TIME_SEC if data.len() >= 4 => ts_sec = u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            CHUNK_TIME_USEC if data.len() >= 4 => ts_usec = u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            CHUNK_CAPTURE_ID if data.len() >= 4 => {
                capture_id = Some(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
            CHUNK_AUTH_KEY => auth_key = std::str::from_utf8(data).ok().map(ArcStr::from),
            CHUNK_PAYLOAD => payload = Bytes::copy_from_slice(data),
            _ => {}
        }

        cursor = &cursor[chunk_len..];
    }

    let is_v6 = family == Some(FAMILY_IP6);
    let (src_addr, dst_addr) = if is_v6 {
        (
            src_v6.map(IpAddr::V6).ok_or(Error::MalformedHep("missing IPv6 source chunk"))?,
            dst_v6.map(IpAddr::V6).ok_or(Error::MalformedHep("missing IPv6 destination chunk"))?,
        )
    } else {
        (
            src_v4.map(IpAddr::V4).ok_or(Error::MalformedHep("missing IPv4 source chunk"))?,
            dst_v4.map(IpAddr::V4).ok_or(Error::MalformedHep("missing IPv4 destination chunk"))?,
        )
    };

    Ok(HepPacket {
        version: HepVersion::V3,
        src_addr,
        dst_addr,
        src_port,
        dst_port,
        protocol,
        timestamp: (ts_sec, ts_usec),
        capture_id,
        auth_key,
        payload,
    })
}

/// The HEP dissector (§4.7): decodes the envelope, overwrites the
/// packet's `Ip`/`Udp` layers with it, and hands the payload to the
/// registered `Sip` child.
pub struct HepDissector {
    required_auth_key: Option<String>,
}

impl HepDissector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            required_auth_key: settings.get_str("eep.listen.pass").map(str::to_string),
        }
    }
}

impl Dissector for HepDissector {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Hep
    }

    fn children(&self) -> &'static [ProtocolId] {
        &[ProtocolId::Sip]
    }

    fn dissect(&self, packet: &Packet, bytes: Bytes, _out: &mut Vec<Emission>) -> DissectOutcome {
        let Ok(decoded) = decode(&bytes) else {
            return DissectOutcome::NotMine;
        };

        if let Some(expected) = &self.required_auth_key {
            if decoded.auth_key.as_deref() != Some(expected.as_str()) {
                tracing::debug!("dropping HEP packet: auth key mismatch");
                return DissectOutcome::Done;
            }
        }

        packet.set_layer(
            ProtocolId::Ip,
            LayerAttrs::Ip {
                version: if decoded.src_addr.is_ipv6() { 6 } else { 4 },
                protocol: decoded.protocol,
                src: decoded.src_addr,
                dst: decoded.dst_addr,
            },
        );
        packet.set_layer(
            ProtocolId::Udp,
            LayerAttrs::Transport {
                is_tcp: false,
                src_port: decoded.src_port,
                dst_port: decoded.dst_port,
            },
        );

        DissectOutcome::Consumed(decoded.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet(version: HepVersion) -> HepPacket {
        HepPacket {
            version,
            src_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            dst_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            src_port: 5060,
            dst_port: 5060,
            protocol: 17,
            timestamp: (1_700_000_000, 123),
            capture_id: Some(7),
            auth_key: Some("secret".into()),
            payload: Bytes::from_static(b"OPTIONS sip:b@h SIP/2.0\r\n\r\n"),
        }
    }

    #[test]
    fn v2_round_trips() {
        let encoded = encode(&sample_packet(HepVersion::V2));
        let decoded = decode(&encoded).unwrap();

        assert_eq!(decoded.version, HepVersion::V2);
        assert_eq!(decoded.src_addr, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(decoded.dst_port, 5060);
        assert_eq!(decoded.payload, Bytes::from_static(b"OPTIONS sip:b@h SIP/2.0\r\n\r\n"));
        // v2 carries neither capture id nor auth key.
        assert_eq!(decoded.capture_id, None);
    }

    #[test]
    fn v3_round_trips_with_vendor_chunks() {
        let encoded = encode(&sample_packet(HepVersion::V3));
        assert!(encoded.starts_with(HEP3_MAGIC));

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.version, HepVersion::V3);
        assert_eq!(decoded.capture_id, Some(7));
        assert_eq!(decoded.auth_key.as_deref(), Some("secret"));
        assert_eq!(decoded.payload, Bytes::from_static(b"OPTIONS sip:b@h SIP/2.0\r\n\r\n"));
    }

    #[test]
    fn v2_rejects_truncated_header() {
        assert!(decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn ipv6_endpoint_forces_v3_encoding_even_when_v2_requested() {
        let mut pkt = sample_packet(HepVersion::V2);
        pkt.src_addr = IpAddr::V6(Ipv6Addr::LOCALHOST);
        pkt.dst_addr = IpAddr::V6(Ipv6Addr::LOCALHOST);

        let encoded = encode(&pkt);
        assert!(encoded.starts_with(HEP3_MAGIC));
    }
}
