//! UDP transport dissector (§4.3).

use bytes::{Buf, Bytes};

use crate::packet::{LayerAttrs, Packet, ProtocolId};

use super::{DissectOutcome, Dissector, Emission};

const UDP_HEADER_LEN: usize = 8;

pub struct UdpDissector;

impl Dissector for UdpDissector {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Udp
    }

    fn children(&self) -> &'static [ProtocolId] {
        &[ProtocolId::Sip, ProtocolId::Rtp, ProtocolId::Rtcp, ProtocolId::Hep]
    }

    fn dissect(&self, packet: &Packet, mut bytes: Bytes, _out: &mut Vec<Emission>) -> DissectOutcome {
        if bytes.len() < UDP_HEADER_LEN {
            return DissectOutcome::NotMine;
        }

        let src_port = bytes.get_u16();
        let dst_port = bytes.get_u16();
        let length = bytes.get_u16() as usize;
        let _checksum = bytes.get_u16();

        // `length` counts the UDP header itself; the payload is whatever
        // follows after subtracting it, clamped to what actually remains
        // (captures are routinely truncated to a snaplen).
        let payload_len = length.saturating_sub(UDP_HEADER_LEN).min(bytes.len());
        let payload = bytes.split_to(payload_len);

        packet.set_layer(
            ProtocolId::Udp,
            LayerAttrs::Transport {
                is_tcp: false,
                src_port,
                dst_port,
            },
        );

        DissectOutcome::Consumed(payload)
    }
}
