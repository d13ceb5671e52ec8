//! The call/dialog storage engine (§4.8, §4.9): correlates dissected SIP
//! messages into `Call`s keyed by Call-ID, tracks SDP-negotiated media
//! endpoints, and binds RTP/RTCP streams to the owning call.

mod group;
mod storage;

pub use group::CallGroup;
pub use storage::{Filter, SortKey, Storage};

use std::collections::HashSet;

use bytes::Bytes;
use util::ArcStr;

use crate::address::Address;
use crate::message::SipMethod;
use crate::packet::Packet;

/// A media endpoint and its negotiated codecs, extracted from a SIP
/// message's SDP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpMedia {
    /// The advertised `(address, port)` for this media line.
    pub address: Address,
    /// Every format offered, in SDP order; `formats[0]` is the preferred
    /// codec.
    pub formats: Vec<SdpFormat>,
}

/// One `a=rtpmap:` (or statically-assigned) codec entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpFormat {
    /// RTP payload type number.
    pub payload_type: u8,
    /// Codec name, e.g. `PCMU`, or `"unknown"` for an unmapped dynamic
    /// payload type.
    pub alias: ArcStr,
    /// Clock rate in Hz, when known.
    pub clock_rate: Option<u32>,
}

/// The lifecycle state of a `Call`, derived from its message stream on
/// every read rather than tracked as mutable primary state (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Dialog establishment in progress.
    Setup,
    /// A final 2xx has been seen and the dialog is active.
    InCall,
    /// The dialog ended normally (BYE).
    Completed,
    /// The initial INVITE was cancelled before a final response.
    Cancelled,
    /// A final 4xx/5xx/6xx (other than 486) rejected the dialog.
    Rejected,
    /// A 486 Busy Here rejected the dialog.
    Busy,
    /// A 3xx redirected the dialog elsewhere.
    Diverted,
}

/// A small integer key for `Message`'s lazily-computed attribute cache,
/// following the design note to key by an enum rather than a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AttrId {
    SummaryLine,
}

#[derive(Default)]
struct AttrCache {
    summary_line: std::cell::OnceCell<String>,
}

/// Headers extracted from a single dissected SIP message (§3, §4.4).
#[derive(Debug, Clone)]
pub struct SipSummary {
    /// `Call-ID` header value.
    pub call_id: ArcStr,
    /// `CSeq` sequence number.
    pub cseq: u32,
    /// `CSeq` method.
    pub cseq_method: SipMethod,
    /// Request method, if this message is a request.
    pub method: Option<SipMethod>,
    /// Response status code, if this message is a response.
    pub status: Option<u16>,
    /// `From` URI, as written on the wire.
    pub from_uri: ArcStr,
    /// `From` tag parameter.
    pub from_tag: Option<ArcStr>,
    /// `To` URI, as written on the wire.
    pub to_uri: ArcStr,
    /// `To` tag parameter.
    pub to_tag: Option<ArcStr>,
    /// Topmost `Via` branch parameter.
    pub via_branch: Option<ArcStr>,
    /// Cross-reference header (`X-Call-ID` or a configured alternate).
    pub x_call_id: Option<ArcStr>,
    /// `Reason` header, formatted as written.
    pub reason: Option<ArcStr>,
    /// `Warning` header, formatted as written.
    pub warning: Option<ArcStr>,
}

impl SipSummary {
    /// `true` if this message is a request.
    pub fn is_request(&self) -> bool {
        self.method.is_some()
    }

    /// `true` if this message is a response.
    pub fn is_response(&self) -> bool {
        self.status.is_some()
    }
}

/// One dissected SIP message, attached to the `Call` identified by its
/// Call-ID (§3, invariant 1).
pub struct Message {
    packet: Packet,
    src: Address,
    dst: Address,
    raw: Bytes,
    body: Option<Bytes>,
    summary: SipSummary,
    sdp: Vec<SdpMedia>,
    is_initial: bool,
    attrs: AttrCache,
}

impl Message {
    /// Builds a new `Message` from its dissected parts. `is_initial` is
    /// filled in by `Call::append` once the message is placed in context.
    pub fn new(
        packet: Packet,
        src: Address,
        dst: Address,
        raw: Bytes,
        body: Option<Bytes>,
        summary: SipSummary,
        sdp: Vec<SdpMedia>,
    ) -> Self {
        Self {
            packet,
            src,
            dst,
            raw,
            body,
            summary,
            sdp,
            is_initial: false,
            attrs: AttrCache::default(),
        }
    }

    /// The packet that carried this message.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// Source transport address.
    pub fn src(&self) -> Address {
        self.src
    }

    /// Destination transport address.
    pub fn dst(&self) -> Address {
        self.dst
    }

    /// The raw message bytes (start line through body), used for
    /// retransmission comparison.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The message body, if any (the input to the SDP dissector).
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The extracted header summary.
    pub fn summary(&self) -> &SipSummary {
        &self.summary
    }

    /// Media endpoints extracted from this message's SDP body, if any.
    pub fn sdp(&self) -> &[SdpMedia] {
        &self.sdp
    }

    /// `true` if this message began a new transaction within its dialog
    /// (§4.4's initial-transaction test).
    pub fn is_initial_transaction(&self) -> bool {
        self.is_initial
    }

    /// This message's capture timestamp, taken from its owning packet.
    pub fn timestamp(&self) -> (u64, u32) {
        self.packet.timestamp()
    }

    /// A one-line human-readable summary (`"INVITE sip:bob@h"` or
    /// `"200 OK"`), computed once and cached.
    pub fn summary_line(&self) -> &str {
        self.attrs.summary_line.get_or_init(|| match self.summary.method {
            Some(method) => format!("{} {}", method.as_str(), self.summary.from_uri),
            None => format!("{} {}", self.summary.status.unwrap_or(0), self.summary.to_uri),
        })
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("summary", &self.summary)
            .finish()
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            packet: self.packet.clone(),
            src: self.src,
            dst: self.dst,
            raw: self.raw.clone(),
            body: self.body.clone(),
            summary: self.summary.clone(),
            sdp: self.sdp.clone(),
            is_initial: self.is_initial,
            attrs: AttrCache::default(),
        }
    }
}

/// An RTP or RTCP stream bound (or not yet bound) to a `Call` (§3, §4.6).
#[derive(Debug, Clone)]
pub struct Stream {
    src: Address,
    dst: Address,
    payload_type: u8,
    ssrc: u32,
    is_rtcp: bool,
    first_seen: (u64, u32),
    last_seen: (u64, u32),
    count: u64,
}

impl Stream {
    fn new(src: Address, dst: Address, payload_type: u8, ssrc: u32, is_rtcp: bool, ts: (u64, u32)) -> Self {
        Self {
            src,
            dst,
            payload_type,
            ssrc,
            is_rtcp,
            first_seen: ts,
            last_seen: ts,
            count: 1,
        }
    }

    /// Source address of the stream.
    pub fn src(&self) -> Address {
        self.src
    }

    /// Destination address of the stream.
    pub fn dst(&self) -> Address {
        self.dst
    }

    /// RTP payload type (meaningless for RTCP streams).
    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// Synchronization source identifier.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// `true` if this is an RTCP control stream rather than RTP media.
    pub fn is_rtcp(&self) -> bool {
        self.is_rtcp
    }

    /// Timestamp of the first packet that created this stream.
    pub fn first_seen(&self) -> (u64, u32) {
        self.first_seen
    }

    /// Timestamp of the most recent packet on this stream.
    pub fn last_seen(&self) -> (u64, u32) {
        self.last_seen
    }

    /// Number of packets seen on this stream so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    fn touch(&mut self, ts: (u64, u32)) {
        self.last_seen = ts;
        self.count += 1;
    }

    /// Identifies a stream by `(src, dst, payload_type, ssrc)` (§4.6), the
    /// same tuple across RTP and RTCP since the two never share a
    /// payload-type/ssrc pair in recorded practice.
    fn key(&self) -> (Address, Address, u8, u32, bool) {
        (self.src, self.dst, self.payload_type, self.ssrc, self.is_rtcp)
    }
}

/// A SIP dialog: every message sharing a Call-ID, plus the media streams
/// bound to it (§3, §4.8).
pub struct Call {
    call_id: ArcStr,
    arrival_index: u64,
    messages: Vec<Message>,
    streams: Vec<Stream>,
    xcalls: HashSet<ArcStr>,
}

impl Call {
    pub(crate) fn new(call_id: ArcStr, arrival_index: u64) -> Self {
        Self {
            call_id,
            arrival_index,
            messages: Vec::new(),
            streams: Vec::new(),
            xcalls: HashSet::new(),
        }
    }

    /// This call's Call-ID.
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// This call's position in global arrival order, used as the
    /// tie-break for every other sort key (§4.8).
    pub fn arrival_index(&self) -> u64 {
        self.arrival_index
    }

    /// Every message attached to this call, sorted non-decreasing by
    /// timestamp (§3, invariant 2).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Every RTP/RTCP stream bound to this call.
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// The Call-IDs of every call cross-referenced via `X-Call-ID`.
    pub fn xcalls(&self) -> &HashSet<ArcStr> {
        &self.xcalls
    }

    /// Appends a message to this call, computing its initial-transaction
    /// flag in context (§4.4) and keeping `messages` timestamp-sorted.
    pub(crate) fn append(&mut self, mut msg: Message) {
        msg.is_initial = self.is_initial_transaction(&msg);
        let pos = self.messages.partition_point(|m| m.timestamp() <= msg.timestamp());
        self.messages.insert(pos, msg);
    }

    fn is_initial_transaction(&self, msg: &Message) -> bool {
        let cseq = msg.summary.cseq;
        for earlier in self.messages.iter().rev() {
            if earlier.summary.cseq != cseq {
                continue;
            }
            if !earlier.summary.is_request() {
                continue;
            }
            let same_endpoint = if msg.summary.is_request() {
                earlier.src == msg.src
            } else {
                earlier.dst == msg.dst
            };
            if same_endpoint {
                return false;
            }
        }
        true
    }

    /// Finds the index of an earlier message in this call that `self.messages[idx]`
    /// is a byte-for-byte retransmission of (same src/dst and identical raw
    /// payload), scanning newest-first and excluding itself (§4.4 `[ADD]`,
    /// S5).
    pub fn retransmission_of(&self, idx: usize) -> Option<usize> {
        let msg = self.messages.get(idx)?;
        self.messages[..idx].iter().enumerate().rev().find_map(|(i, earlier)| {
            if earlier.src == msg.src && earlier.dst == msg.dst && earlier.raw == msg.raw {
                Some(i)
            } else {
                None
            }
        })
    }

    /// Links this call with another by `X-Call-ID` cross-reference.
    /// Symmetric: the caller is responsible for calling this on both
    /// calls (§8, invariant 7; see `Storage::link_xcall`).
    pub(crate) fn link(&mut self, other_call_id: ArcStr) {
        self.xcalls.insert(other_call_id);
    }

    /// Registers (or updates) a stream sighting, creating it unbound on
    /// first sight.
    pub(crate) fn record_stream(
        &mut self,
        src: Address,
        dst: Address,
        payload_type: u8,
        ssrc: u32,
        is_rtcp: bool,
        ts: (u64, u32),
    ) {
        let key = (src, dst, payload_type, ssrc, is_rtcp);
        if let Some(stream) = self.streams.iter_mut().find(|s| s.key() == key) {
            stream.touch(ts);
        } else {
            self.streams.push(Stream::new(src, dst, payload_type, ssrc, is_rtcp, ts));
        }
    }

    /// Derives this call's lifecycle state by folding over its message
    /// stream (§4.8). Not stored as primary state.
    pub fn state(&self) -> CallState {
        let is_invite_dialog = self
            .messages
            .first()
            .map(|m| m.summary.method == Some(SipMethod::Invite))
            .unwrap_or(false);

        if is_invite_dialog {
            self.invite_dialog_state()
        } else {
            self.simple_dialog_state()
        }
    }

    fn invite_dialog_state(&self) -> CallState {
        let mut state = CallState::Setup;
        for msg in &self.messages {
            let s = &msg.summary;
            if s.is_request() {
                match s.method {
                    Some(SipMethod::Cancel) if !matches!(state, CallState::InCall | CallState::Completed) => {
                        state = CallState::Cancelled;
                    }
                    Some(SipMethod::Bye) => {
                        state = CallState::Completed;
                    }
                    _ => {}
                }
                continue;
            }
            let Some(code) = s.status else { continue };
            match code {
                100..=199 => {}
                200..=299 => state = CallState::InCall,
                300..=399 => state = CallState::Diverted,
                486 => state = CallState::Busy,
                400..=699 => state = CallState::Rejected,
                _ => {}
            }
        }
        state
    }

    fn simple_dialog_state(&self) -> CallState {
        for msg in self.messages.iter().rev() {
            if let Some(code) = msg.summary.status {
                return if (200..300).contains(&code) {
                    CallState::InCall
                } else {
                    CallState::Rejected
                };
            }
        }
        CallState::Setup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Frame;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> Address {
        Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), port)
    }

    fn msg(method: Option<SipMethod>, status: Option<u16>, cseq: u32, ts: u64) -> Message {
        let packet = Packet::new(Frame::new(Bytes::from_static(b"x"), ts, 0, 0));
        let summary = SipSummary {
            call_id: "abc@h".into(),
            cseq,
            cseq_method: method.unwrap_or(SipMethod::Invite),
            method,
            status,
            from_uri: "sip:a@h".into(),
            from_tag: None,
            to_uri: "sip:b@h".into(),
            to_tag: None,
            via_branch: None,
            x_call_id: None,
            reason: None,
            warning: None,
        };
        Message::new(packet, addr(5060), addr(5061), Bytes::from_static(b"raw"), None, summary, Vec::new())
    }

    #[test]
    fn invite_dialog_transitions() {
        let mut call = Call::new("abc@h".into(), 0);
        call.append(msg(Some(SipMethod::Invite), None, 1, 1));
        assert!(matches!(call.state(), CallState::Setup));

        call.append(msg(None, Some(180), 1, 2));
        assert!(matches!(call.state(), CallState::Setup));

        call.append(msg(None, Some(200), 1, 3));
        assert!(matches!(call.state(), CallState::InCall));

        call.append(msg(Some(SipMethod::Ack), None, 1, 4));
        assert!(matches!(call.state(), CallState::InCall));

        call.append(msg(Some(SipMethod::Bye), None, 2, 5));
        assert!(matches!(call.state(), CallState::Completed));
    }

    #[test]
    fn messages_stay_timestamp_sorted_on_out_of_order_arrival() {
        let mut call = Call::new("abc@h".into(), 0);
        call.append(msg(Some(SipMethod::Invite), None, 1, 5));
        call.append(msg(None, Some(200), 1, 2));

        let timestamps: Vec<_> = call.messages().iter().map(|m| m.timestamp().0).collect();
        assert_eq!(timestamps, vec![2, 5]);
    }

    #[test]
    fn retransmission_detected_by_identical_payload() {
        let mut call = Call::new("abc@h".into(), 0);
        let mut first = msg(Some(SipMethod::Invite), None, 1, 1);
        first.raw = Bytes::from_static(b"identical");
        call.append(first);

        let mut second = msg(Some(SipMethod::Invite), None, 1, 2);
        second.raw = Bytes::from_static(b"identical");
        call.append(second);

        assert_eq!(call.retransmission_of(1), Some(0));

        let mut third = msg(Some(SipMethod::Ack), None, 2, 3);
        third.raw = Bytes::from_static(b"different");
        call.append(third);
        assert_eq!(call.retransmission_of(2), None);
    }
}
