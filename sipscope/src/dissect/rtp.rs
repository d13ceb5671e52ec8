//! RTP/RTCP dissectors (§4.6): leaves of the UDP subtree that identify a
//! media or control stream sighting without reassembling a session.
//!
//! Both protocols share RFC 3550 §5.1's version bits in their first byte,
//! which is the only thing that distinguishes an RTP packet from a
//! non-RTP one at this layer — there's no port convention to lean on
//! (dynamic/negotiated ports are exactly what SDP binding resolves
//! later). The real ambiguity is RTP vs. RTCP: an RTCP packet's second
//! byte is a packet-type 200-204 (SR/RR/SDES/BYE/APP), which numerically
//! overlaps where RTP's payload-type byte could also land. Since
//! `UdpDissector` tries RTP before RTCP (§4.1), RTP defers via
//! `NotMine` whenever the raw second byte falls in that range, letting
//! RTCP claim it.

use bytes::Bytes;

use crate::address::Address;
use crate::packet::{LayerAttrs, Packet, ProtocolId};

use super::{DissectOutcome, Dissector, Emission, RtpSighting};

const RTP_VERSION: u8 = 2;
const RTCP_TYPE_MIN: u8 = 200;
const RTCP_TYPE_MAX: u8 = 204;

fn addresses(packet: &Packet) -> Option<(Address, Address)> {
    let ip = packet.layer(ProtocolId::Ip)?;
    let transport = packet.layer(ProtocolId::Udp)?;
    LayerAttrs::addresses(&ip, &transport)
}

/// RTP media stream dissector.
pub struct RtpDissector;

impl Dissector for RtpDissector {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Rtp
    }

    fn children(&self) -> &'static [ProtocolId] {
        &[]
    }

    fn dissect(&self, packet: &Packet, bytes: Bytes, out: &mut Vec<Emission>) -> DissectOutcome {
        if bytes.len() < 12 {
            return DissectOutcome::NotMine;
        }
        if bytes[0] >> 6 != RTP_VERSION {
            return DissectOutcome::NotMine;
        }
        if (RTCP_TYPE_MIN..=RTCP_TYPE_MAX).contains(&bytes[1]) {
            // Ambiguous with RTCP's packet-type byte; let it claim this.
            return DissectOutcome::NotMine;
        }

        let Some((src, dst)) = addresses(packet) else {
            return DissectOutcome::NotMine;
        };

        let payload_type = bytes[1] & 0x7f;
        let ssrc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        out.push(Emission::Rtp(RtpSighting {
            src,
            dst,
            is_rtcp: false,
            payload_type,
            ssrc,
            rtcp_packet_type: None,
            timestamp: packet.timestamp(),
        }));

        DissectOutcome::Done
    }
}

/// RTCP control stream dissector.
pub struct RtcpDissector;

impl Dissector for RtcpDissector {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Rtcp
    }

    fn children(&self) -> &'static [ProtocolId] {
        &[]
    }

    fn dissect(&self, packet: &Packet, bytes: Bytes, out: &mut Vec<Emission>) -> DissectOutcome {
        if bytes.len() < 8 {
            return DissectOutcome::NotMine;
        }
        if bytes[0] >> 6 != RTP_VERSION {
            return DissectOutcome::NotMine;
        }
        let packet_type = bytes[1];
        if !(RTCP_TYPE_MIN..=RTCP_TYPE_MAX).contains(&packet_type) {
            return DissectOutcome::NotMine;
        }

        let Some((src, dst)) = addresses(packet) else {
            return DissectOutcome::NotMine;
        };

        // SR/RR carry the sender/reporter SSRC at the same fixed offset;
        // SDES/BYE/APP carry a source identifier there too (RFC 3550
        // §6.4-6.7), so this read is safe across every packet type we
        // recognize.
        let ssrc = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        out.push(Emission::Rtp(RtpSighting {
            src,
            dst,
            is_rtcp: true,
            payload_type: 0,
            ssrc,
            rtcp_packet_type: Some(packet_type),
            timestamp: packet.timestamp(),
        }));

        DissectOutcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Frame;
    use std::net::{IpAddr, Ipv4Addr};

    fn packet_with_udp() -> Packet {
        let packet = Packet::new(Frame::new(Bytes::from_static(b"x"), 5, 0, 0));
        packet.set_layer(
            ProtocolId::Ip,
            LayerAttrs::Ip {
                version: 4,
                protocol: 17,
                src: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                dst: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            },
        );
        packet.set_layer(
            ProtocolId::Udp,
            LayerAttrs::Transport {
                is_tcp: false,
                src_port: 40000,
                dst_port: 40002,
            },
        );
        packet
    }

    fn rtp_packet(payload_type: u8, ssrc: u32) -> Bytes {
        let mut buf = vec![0x80, payload_type, 0, 1];
        buf.extend_from_slice(&0u32.to_be_bytes()); // timestamp
        buf.extend_from_slice(&ssrc.to_be_bytes());
        buf.extend_from_slice(b"payload");
        Bytes::from(buf)
    }

    #[test]
    fn plain_rtp_packet_is_recognized() {
        let packet = packet_with_udp();
        let mut out = Vec::new();
        let outcome = RtpDissector.dissect(&packet, rtp_packet(0, 42), &mut out);

        assert!(matches!(outcome, DissectOutcome::Done));
        assert_eq!(out.len(), 1);
        let Emission::Rtp(sighting) = &out[0] else { panic!("expected Rtp") };
        assert_eq!(sighting.payload_type, 0);
        assert_eq!(sighting.ssrc, 42);
        assert!(!sighting.is_rtcp);
    }

    #[test]
    fn rtp_defers_to_rtcp_on_ambiguous_payload_type() {
        let packet = packet_with_udp();
        let mut out = Vec::new();
        let outcome = RtpDissector.dissect(&packet, rtp_packet(200, 42), &mut out);

        assert!(matches!(outcome, DissectOutcome::NotMine));
        assert!(out.is_empty());
    }

    #[test]
    fn rtcp_sender_report_is_recognized() {
        let packet = packet_with_udp();
        let mut buf = vec![0x80, 200, 0, 6];
        buf.extend_from_slice(&99u32.to_be_bytes());
        buf.extend_from_slice(&[0u8; 20]);
        let mut out = Vec::new();

        let outcome = RtcpDissector.dissect(&packet, Bytes::from(buf), &mut out);

        assert!(matches!(outcome, DissectOutcome::Done));
        let Emission::Rtp(sighting) = &out[0] else { panic!("expected Rtp") };
        assert!(sighting.is_rtcp);
        assert_eq!(sighting.ssrc, 99);
        assert_eq!(sighting.rtcp_packet_type, Some(200));
    }

    #[test]
    fn non_rtcp_packet_type_is_not_mine() {
        let packet = packet_with_udp();
        let mut out = Vec::new();
        let outcome = RtcpDissector.dissect(&packet, rtp_packet(8, 1), &mut out);

        assert!(matches!(outcome, DissectOutcome::NotMine));
    }
}
