//! SIP framing and message extraction (§4.4).
//!
//! Framing is Content-Length-exact: a message boundary is never guessed
//! from whitespace heuristics alone. Given a buffer that may hold more
//! than one message back-to-back (pipelined UDP or reassembled TCP), this
//! module finds the start of the next message, finds where its headers
//! end, reads its `Content-Length`, and slices exactly that many body
//! bytes before handing the whole thing to [`crate::parser::Parser`].
//!
//! [`SipDissector::frame_and_parse`] is the shared core: both this
//! module's own `Dissector` impl (one UDP datagram) and
//! `super::tcp::TcpDissector` (a growing reassembly buffer) call it
//! directly, since TCP needs its `usize` consumed-count to trim the
//! buffer rather than the `DissectOutcome` this module's own `dissect`
//! wraps it in.

use bytes::Bytes;
use tracing::debug;
use util::ArcStr;

use crate::call::{Message, SipSummary};
use crate::headers::Header;
use crate::message::SipMsg;
use crate::packet::{LayerAttrs, Packet, ProtocolId};
use crate::parser::Parser;
use crate::settings::Settings;

use super::{parse_sdp, DissectOutcome, Dissector, Emission};

const REQUEST_METHODS: &[&[u8]] = &[
    b"INVITE ",
    b"ACK ",
    b"BYE ",
    b"CANCEL ",
    b"REGISTER ",
    b"OPTIONS ",
    b"INFO ",
    b"NOTIFY ",
    b"SUBSCRIBE ",
    b"UPDATE ",
    b"REFER ",
    b"PRACK ",
    b"MESSAGE ",
    b"PUBLISH ",
];

const RESPONSE_PREFIX: &[u8] = b"SIP/2.0 ";

fn looks_like_message_start(buf: &[u8]) -> bool {
    buf.starts_with(RESPONSE_PREFIX) || REQUEST_METHODS.iter().any(|m| buf.starts_with(m))
}

/// Finds the offset of the next plausible message start in `buf`,
/// checking position `0` and every line start after a `\r\n`.
fn find_message_start(buf: &[u8]) -> Option<usize> {
    if buf.is_empty() {
        return None;
    }
    if looks_like_message_start(buf) {
        return Some(0);
    }
    let mut searched = 0;
    while let Some(rel) = find_subslice(&buf[searched..], b"\r\n") {
        let candidate = searched + rel + 2;
        if candidate >= buf.len() {
            return None;
        }
        if looks_like_message_start(&buf[candidate..]) {
            return Some(candidate);
        }
        searched = candidate;
    }
    None
}

/// The byte offset just past the terminating `\r\n\r\n`, i.e. the start
/// of the body, if the full header block is present.
fn find_header_end(buf: &[u8]) -> Option<usize> {
    find_subslice(buf, b"\r\n\r\n").map(|rel| rel + 4)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reads `Content-Length` (or its compact form `l`) directly out of the
/// raw header text, without invoking the full header parser, so framing
/// doesn't pay for two parses of the same bytes.
fn peek_content_length(header_bytes: &[u8]) -> usize {
    let Ok(text) = std::str::from_utf8(header_bytes) else {
        return 0;
    };
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("l") {
            return value.trim().parse().unwrap_or(0);
        }
    }
    0
}

/// Strips a header's own `Display` prefix (`"Warning: "`, `"Reason: "`)
/// so `SipSummary` stores just the value, not a re-serialized header line.
fn strip_header_prefix(formatted: String, name: &str) -> ArcStr {
    let prefix = format!("{name}: ");
    match formatted.strip_prefix(&prefix) {
        Some(rest) => rest.into(),
        None => formatted.as_str().into(),
    }
}

/// The SIP dissector (§4.4): leaf of the dissector tree, since SDP is
/// extracted directly from the message body rather than dispatched
/// through a child `Dissector`.
pub struct SipDissector {
    xcid_headers: Vec<String>,
    sdp_enabled: bool,
}

impl SipDissector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            xcid_headers: settings
                .get_str_list("sip.xcid")
                .unwrap_or_else(|| vec!["X-Call-ID".to_string(), "X-CID".to_string()]),
            sdp_enabled: settings.get_bool("capture.packet.sdp", true),
        }
    }

    /// Frames and parses as many complete messages as `bytes` holds,
    /// returning the number of bytes consumed and every [`Emission`]
    /// produced.
    ///
    /// The consumed count is:
    /// - `0` if nothing in `bytes` was recognizable at all (the caller
    ///   should try a sibling dissector, or for TCP, keep buffering);
    /// - the offset of a partial message's start, if earlier messages
    ///   parsed but the last one is still missing header or body bytes
    ///   (TCP keeps buffering from there);
    /// - `bytes.len()`, if every recognized message parsed and anything
    ///   left over doesn't look like a message start (discarded as
    ///   trailing noise).
    pub(crate) fn frame_and_parse(&self, packet: &Packet, bytes: Bytes) -> (usize, Vec<Emission>) {
        let mut out = Vec::new();
        let mut offset = 0usize;
        let mut recognized_any = false;

        loop {
            let remaining = &bytes[offset..];
            let Some(start_rel) = find_message_start(remaining) else {
                if recognized_any {
                    offset = bytes.len();
                }
                break;
            };
            let msg_start = offset + start_rel;
            let tail = &bytes[msg_start..];

            let Some(header_end) = find_header_end(tail) else {
                offset = msg_start;
                break;
            };
            let content_length = peek_content_length(&tail[..header_end]);
            let total_len = header_end + content_length;
            if tail.len() < total_len {
                offset = msg_start;
                break;
            }

            let msg_bytes = bytes.slice(msg_start..msg_start + total_len);
            recognized_any = true;
            match Parser::new(&msg_bytes).parse_sip_msg() {
                Ok(sip_msg) => {
                    if let Some(msg) = self.build_message(packet, &msg_bytes, sip_msg) {
                        out.push(Emission::Sip(msg));
                    }
                }
                Err(err) => {
                    debug!(error = %err, "dropping malformed SIP message");
                }
            }
            offset = msg_start + total_len;
        }

        if offset == 0 && !recognized_any {
            return (0, out);
        }
        (offset, out)
    }

    fn build_message(&self, packet: &Packet, raw: &Bytes, sip_msg: SipMsg) -> Option<Message> {
        let (src, dst) = addresses(packet)?;
        let body = sip_msg.body().map(|b| raw.slice_ref(b));
        let summary = self.build_summary(&sip_msg)?;
        let sdp = match (&body, self.sdp_enabled) {
            (Some(body), true) => parse_sdp(body),
            _ => Vec::new(),
        };

        Some(Message::new(packet.clone(), src, dst, raw.clone(), body, summary, sdp))
    }

    fn build_summary(&self, sip_msg: &SipMsg) -> Option<SipSummary> {
        let headers = sip_msg.headers();

        let call_id = headers.iter().find_map(|h| h.as_call_id())?.id().into();
        let cseq_header = headers.iter().find_map(|h| h.as_cseq())?;
        let from = headers.iter().find_map(|h| h.as_from())?;
        let to = headers.iter().find_map(|h| h.as_to())?;

        let via_branch = headers.iter().find_map(|h| h.as_via()).and_then(|v| v.branch()).map(Into::into);

        let x_call_id = headers.iter().find_map(|h| match h {
            Header::Other(other) if self.xcid_headers.iter().any(|name| other.name.eq_ignore_ascii_case(name)) => {
                Some(ArcStr::from(other.value))
            }
            _ => None,
        });

        let reason = headers
            .iter()
            .find_map(|h| h.as_reason())
            .map(|r| strip_header_prefix(r.to_string(), "Reason"));
        let warning = headers
            .iter()
            .find_map(|h| h.as_warning())
            .map(|w| strip_header_prefix(w.to_string(), "Warning"));

        Some(SipSummary {
            call_id,
            cseq: cseq_header.cseq(),
            cseq_method: *cseq_header.method(),
            method: sip_msg.request().map(|r| *r.method()),
            status: sip_msg.response().map(|r| r.code().into_i32() as u16),
            from_uri: from.uri().to_string().into(),
            from_tag: from.tag().map(Into::into),
            to_uri: to.uri().to_string().into(),
            to_tag: to.tag().map(Into::into),
            via_branch,
            x_call_id,
            reason,
            warning,
        })
    }
}

fn addresses(packet: &Packet) -> Option<(crate::address::Address, crate::address::Address)> {
    let ip = packet.layer(ProtocolId::Ip)?;
    let transport = packet.layer(ProtocolId::Udp).or_else(|| packet.layer(ProtocolId::Tcp))?;
    LayerAttrs::addresses(&ip, &transport)
}

impl Dissector for SipDissector {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Sip
    }

    fn children(&self) -> &'static [ProtocolId] {
        &[]
    }

    fn dissect(&self, packet: &Packet, bytes: Bytes, out: &mut Vec<Emission>) -> DissectOutcome {
        let (consumed, emissions) = self.frame_and_parse(packet, bytes);
        if consumed == 0 && emissions.is_empty() {
            return DissectOutcome::NotMine;
        }
        out.extend(emissions);
        DissectOutcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Frame;
    use std::net::{IpAddr, Ipv4Addr};

    fn packet_with_udp() -> Packet {
        let packet = Packet::new(Frame::new(Bytes::from_static(b"x"), 1, 0, 0));
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
                src_port: 5060,
                dst_port: 5060,
            },
        );
        packet
    }

    #[test]
    fn single_message_is_fully_consumed() {
        let settings = Settings::new();
        let dissector = SipDissector::new(&settings);
        let packet = packet_with_udp();

        let raw = Bytes::from_static(
            b"INVITE sip:b@h SIP/2.0\r\nCall-ID: abc@h\r\nCSeq: 1 INVITE\r\nFrom: <sip:a@h>;tag=1\r\nTo: <sip:b@h>\r\nVia: SIP/2.0/UDP h;branch=z9hG4bKabc\r\nContent-Length: 0\r\n\r\n",
        );
        let (consumed, out) = dissector.frame_and_parse(&packet, raw.clone());

        assert_eq!(consumed, raw.len());
        assert_eq!(out.len(), 1);
        let Emission::Sip(msg) = &out[0] else { panic!("expected Sip emission") };
        assert_eq!(msg.summary().call_id.as_ref(), "abc@h");
        assert_eq!(msg.summary().via_branch.as_deref(), Some("z9hG4bKabc"));
    }

    #[test]
    fn two_pipelined_messages_both_parse() {
        let settings = Settings::new();
        let dissector = SipDissector::new(&settings);
        let packet = packet_with_udp();

        let one = b"OPTIONS sip:b@h SIP/2.0\r\nCall-ID: 1@h\r\nCSeq: 1 OPTIONS\r\nFrom: <sip:a@h>\r\nTo: <sip:b@h>\r\nContent-Length: 0\r\n\r\n".to_vec();
        let two = b"OPTIONS sip:b@h SIP/2.0\r\nCall-ID: 2@h\r\nCSeq: 1 OPTIONS\r\nFrom: <sip:a@h>\r\nTo: <sip:b@h>\r\nContent-Length: 0\r\n\r\n".to_vec();
        let mut both = one.clone();
        both.extend_from_slice(&two);
        let raw = Bytes::from(both);

        let (consumed, out) = dissector.frame_and_parse(&packet, raw.clone());

        assert_eq!(consumed, raw.len());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn incomplete_headers_report_partial_offset() {
        let settings = Settings::new();
        let dissector = SipDissector::new(&settings);
        let packet = packet_with_udp();

        let raw = Bytes::from_static(b"INVITE sip:b@h SIP/2.0\r\nCall-ID: abc@h\r\n");
        let (consumed, out) = dissector.frame_and_parse(&packet, raw);

        assert_eq!(consumed, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn unrecognized_bytes_are_not_mine() {
        let settings = Settings::new();
        let dissector = SipDissector::new(&settings);
        let packet = packet_with_udp();

        let (consumed, out) = dissector.frame_and_parse(&packet, Bytes::from_static(b"not a sip message"));

        assert_eq!(consumed, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn xcallid_header_is_extracted() {
        let settings = Settings::new();
        let dissector = SipDissector::new(&settings);
        let packet = packet_with_udp();

        let raw = Bytes::from_static(
            b"INVITE sip:b@h SIP/2.0\r\nCall-ID: abc@h\r\nCSeq: 1 INVITE\r\nFrom: <sip:a@h>\r\nTo: <sip:b@h>\r\nX-Call-ID: other@h\r\nContent-Length: 0\r\n\r\n",
        );
        let (_, out) = dissector.frame_and_parse(&packet, raw);

        let Emission::Sip(msg) = &out[0] else { panic!("expected Sip emission") };
        assert_eq!(msg.summary().x_call_id.as_deref(), Some("other@h"));
    }
}
