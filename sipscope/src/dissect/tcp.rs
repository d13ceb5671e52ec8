//! TCP dissector and best-effort stream reassembly (§4.3).
//!
//! Reassembly is keyed by the unordered `{(src ip, src port), (dst ip, dst
//! port)}` flow (both directions share a buffer only in the sense that each
//! direction gets its own entry, keyed independently on `(src, dst)`); there
//! is no window validation, no retransmission detection at this layer (that
//! happens later, on fully framed SIP messages, §4.4), and no handling of
//! out-of-order segments beyond discarding ones that don't extend the
//! buffer contiguously. A `RST` or `FIN` releases the flow's state.

use std::cell::RefCell;
use std::collections::HashMap;

use bytes::{Buf, Bytes};

use crate::address::Address;
use crate::packet::{LayerAttrs, Packet, ProtocolId};
use crate::settings::Settings;

use super::sip::SipDissector;
use super::{DissectOutcome, Dissector, Emission};

const FIN: u8 = 0x01;
const RST: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FlowKey {
    src: Address,
    dst: Address,
}

#[derive(Default)]
struct FlowState {
    next_seq: Option<u32>,
    buffer: Vec<u8>,
}

/// TCP owns `sip` directly and calls [`SipDissector::frame_and_parse`]
/// itself rather than handing reassembled bytes to the generic tree-walk
/// (`Registry::dispatch_node`): the tree-walk only sees `Done`/`NotMine`,
/// not how many bytes were actually consumed, and without that count
/// there is no way to trim an already-parsed prefix back out of
/// `FlowState::buffer` — every subsequent segment would re-parse and
/// re-emit every earlier message in the flow.
pub struct TcpDissector {
    flows: RefCell<HashMap<FlowKey, FlowState>>,
    sip: SipDissector,
}

impl TcpDissector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            flows: RefCell::new(HashMap::new()),
            sip: SipDissector::new(settings),
        }
    }
}

impl Dissector for TcpDissector {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Tcp
    }

    fn children(&self) -> &'static [ProtocolId] {
        &[]
    }

    fn dissect(&self, packet: &Packet, mut bytes: Bytes, out: &mut Vec<Emission>) -> DissectOutcome {
        if bytes.len() < 20 {
            return DissectOutcome::NotMine;
        }

        let src_port = bytes.get_u16();
        let dst_port = bytes.get_u16();
        let seq = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let data_offset = (bytes[8] >> 4) as usize * 4;
        let flags = bytes[9];

        // `data_offset` counts the whole TCP header from its start; the
        // port fields above already consumed 4 of those bytes.
        if data_offset < 20 || bytes.len() + 4 < data_offset {
            return DissectOutcome::NotMine;
        }
        bytes.advance(data_offset - 4);

        let Some((src, dst)) = self.addresses(packet, src_port, dst_port) else {
            return DissectOutcome::NotMine;
        };

        packet.set_layer(
            ProtocolId::Tcp,
            LayerAttrs::Transport {
                is_tcp: true,
                src_port,
                dst_port,
            },
        );

        let key = FlowKey { src, dst };

        if flags & (FIN | RST) != 0 {
            self.flows.borrow_mut().remove(&key);
            if !bytes.is_empty() {
                let (_, emissions) = self.sip.frame_and_parse(packet, bytes);
                out.extend(emissions);
            }
            return DissectOutcome::Done;
        }

        if bytes.is_empty() {
            return DissectOutcome::Done;
        }

        let mut flows = self.flows.borrow_mut();
        let state = flows.entry(key).or_default();

        match state.next_seq {
            Some(expected) if expected == seq => {
                state.buffer.extend_from_slice(&bytes);
                state.next_seq = Some(seq.wrapping_add(bytes.len() as u32));
            }
            Some(_) => {
                // Out of order or a gap: best-effort means we drop state
                // rather than try to stitch a hole. The next in-order
                // segment restarts the buffer from scratch.
                state.buffer.clear();
                state.buffer.extend_from_slice(&bytes);
                state.next_seq = Some(seq.wrapping_add(bytes.len() as u32));
            }
            None => {
                state.buffer.extend_from_slice(&bytes);
                state.next_seq = Some(seq.wrapping_add(bytes.len() as u32));
            }
        }

        let assembled = Bytes::from(state.buffer.clone());
        let (consumed, emissions) = self.sip.frame_and_parse(packet, assembled);
        if consumed > 0 {
            state.buffer.drain(..consumed);
        }
        out.extend(emissions);
        drop(flows);
        DissectOutcome::Done
    }
}

impl TcpDissector {
    fn addresses(&self, packet: &Packet, src_port: u16, dst_port: u16) -> Option<(Address, Address)> {
        let ip = packet.layer(ProtocolId::Ip)?;
        let transport = LayerAttrs::Transport {
            is_tcp: true,
            src_port,
            dst_port,
        };
        LayerAttrs::addresses(&ip, &transport)
    }
}
