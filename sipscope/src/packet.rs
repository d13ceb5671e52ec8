//! The packet/frame carrier shared across the dissection pipeline.
//!
//! A [`Packet`] is a reference-counted container for one or more captured
//! [`Frame`]s plus a per-protocol attribute map. It starts life with a
//! single frame at the link layer; IP fragment reassembly (§4.2) folds the
//! frames of every contributing fragment into the frame list of the packet
//! that finally completes the datagram, so a `Message` built on top of a
//! reassembled packet still carries every wire capture that produced it.
//!
//! The pipeline is single-threaded (§5): `Packet` uses `Rc`/`RefCell`
//! rather than `Arc`/`Mutex`, matching the teacher's preference for the
//! cheapest container that satisfies the actual sharing requirement.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::IpAddr;
use std::rc::Rc;

use bytes::Bytes;

use crate::address::Address;

/// Protocol identifiers used to index dissectors, the dissector tree, and
/// a packet's per-layer attribute map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolId {
    /// Link layer (root of the live/file capture tree).
    Link,
    /// IPv4/IPv6.
    Ip,
    /// UDP.
    Udp,
    /// TCP.
    Tcp,
    /// SIP, carried over UDP or a reassembled TCP stream.
    Sip,
    /// SDP, carried in a SIP message body.
    Sdp,
    /// RTP media stream.
    Rtp,
    /// RTCP control stream.
    Rtcp,
    /// HEP (root of the HEP-ingest tree).
    Hep,
}

/// A single captured frame: raw bytes plus capture metadata.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Bytes,
    ts_sec: u64,
    ts_usec: u32,
    iface: u32,
}

impl Frame {
    /// Creates a new `Frame`.
    ///
    /// `data` must be non-empty: an empty frame carries no protocol
    /// information and is rejected by every `PacketSource` before it
    /// reaches the dissector tree.
    pub fn new(data: impl Into<Bytes>, ts_sec: u64, ts_usec: u32, iface: u32) -> Self {
        Self {
            data: data.into(),
            ts_sec,
            ts_usec,
            iface,
        }
    }

    /// The raw captured bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Capture timestamp, seconds component.
    pub fn ts_sec(&self) -> u64 {
        self.ts_sec
    }

    /// Capture timestamp, microseconds component.
    pub fn ts_usec(&self) -> u32 {
        self.ts_usec
    }

    /// Ingress interface id, as reported by the `PacketSource`.
    pub fn iface(&self) -> u32 {
        self.iface
    }
}

/// Parsed attributes recorded by a dissector on the layer it owns.
///
/// Every protocol appears at most once per packet (§3 invariant); a
/// dissector revisiting its own layer (e.g. a second IP header after VPN
/// decapsulation) overwrites the prior entry rather than stacking one.
#[derive(Debug, Clone)]
pub enum LayerAttrs {
    /// IP layer: version, next-level protocol number, source/destination.
    Ip {
        /// `4` or `6`.
        version: u8,
        /// IANA protocol number (17 UDP, 6 TCP, ...).
        protocol: u8,
        /// Source address.
        src: IpAddr,
        /// Destination address.
        dst: IpAddr,
    },
    /// UDP or TCP transport layer: source/destination port.
    Transport {
        /// `true` for TCP, `false` for UDP.
        is_tcp: bool,
        /// Source port.
        src_port: u16,
        /// Destination port.
        dst_port: u16,
    },
}

impl LayerAttrs {
    /// Builds the `Address` pair `(src, dst)` from an IP layer combined
    /// with a transport layer, if both are present on the packet.
    pub fn addresses(ip: &LayerAttrs, transport: &LayerAttrs) -> Option<(Address, Address)> {
        match (ip, transport) {
            (
                LayerAttrs::Ip { src, dst, .. },
                LayerAttrs::Transport {
                    src_port, dst_port, ..
                },
            ) => Some((Address::new(*src, *src_port), Address::new(*dst, *dst_port))),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct PacketInner {
    frames: Vec<Frame>,
    layers: HashMap<ProtocolId, LayerAttrs>,
}

/// A reference-counted carrier for one or more captured frames.
///
/// Cloning a `Packet` is cheap (an `Rc` bump); reassembly tables and
/// `Message`s share the same underlying packet. Interior mutability is
/// used while the packet travels down the dissector tree; by convention
/// (not enforced by the type system, matching the teacher's own note)
/// dissectors finish mutating a packet's layers before handing it to
/// storage.
#[derive(Debug, Clone)]
pub struct Packet(Rc<RefCell<PacketInner>>);

impl Packet {
    /// Creates a new packet from its first captured frame.
    pub fn new(frame: Frame) -> Self {
        Self(Rc::new(RefCell::new(PacketInner {
            frames: vec![frame],
            layers: HashMap::new(),
        })))
    }

    /// Records (or overwrites) the attributes for a protocol layer.
    pub fn set_layer(&self, id: ProtocolId, attrs: LayerAttrs) {
        self.0.borrow_mut().layers.insert(id, attrs);
    }

    /// Returns a clone of the recorded attributes for a layer, if present.
    pub fn layer(&self, id: ProtocolId) -> Option<LayerAttrs> {
        self.0.borrow().layers.get(&id).cloned()
    }

    /// Appends another packet's frames onto this packet's frame list.
    ///
    /// Used by IP fragment reassembly (§4.2): when a datagram completes,
    /// every contributing fragment's frame is folded into the packet that
    /// carries the reassembled bytes upstream.
    pub fn absorb_frames(&self, other: &Packet) {
        let mut other_frames = other.0.borrow().frames.clone();
        self.0.borrow_mut().frames.append(&mut other_frames);
    }

    /// The frames carried by this packet, in the order they were merged.
    pub fn frames(&self) -> Vec<Frame> {
        self.0.borrow().frames.clone()
    }

    /// The timestamp of this packet's first frame: `(seconds, microseconds)`.
    ///
    /// Used to order messages and streams chronologically; every `Frame`'s
    /// timestamp is monotonic per-source, so the first frame is always the
    /// earliest.
    pub fn timestamp(&self) -> (u64, u32) {
        let inner = self.0.borrow();
        let f = &inner.frames[0];
        (f.ts_sec(), f.ts_usec())
    }

    /// Number of live references to this packet (including this one).
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn frame(ts_sec: u64) -> Frame {
        Frame::new(Bytes::from_static(b"hello"), ts_sec, 0, 0)
    }

    #[test]
    fn layer_round_trip() {
        let p = Packet::new(frame(1));
        p.set_layer(
            ProtocolId::Ip,
            LayerAttrs::Ip {
                version: 4,
                protocol: 17,
                src: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                dst: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            },
        );

        assert!(matches!(p.layer(ProtocolId::Ip), Some(LayerAttrs::Ip { version: 4, .. })));
        assert!(p.layer(ProtocolId::Tcp).is_none());
    }

    #[test]
    fn absorb_frames_preserves_order() {
        let p1 = Packet::new(frame(1));
        let p2 = Packet::new(frame(2));
        let p3 = Packet::new(frame(3));

        p1.absorb_frames(&p2);
        p1.absorb_frames(&p3);

        let frames = p1.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].ts_sec(), 1);
        assert_eq!(frames[1].ts_sec(), 2);
        assert_eq!(frames[2].ts_sec(), 3);
    }

    #[test]
    fn refcount_tracks_clones() {
        let p = Packet::new(frame(1));
        assert_eq!(p.refcount(), 1);
        let p2 = p.clone();
        assert_eq!(p.refcount(), 2);
        drop(p2);
        assert_eq!(p.refcount(), 1);
    }
}
