//! SDP body parsing (§4.5): media-endpoint and codec extraction from the
//! body of a SIP message.
//!
//! SDP is simple line-oriented text, one `type=value` pair per line, so
//! this parser works directly on `&str` lines rather than going through
//! `util::Scanner` (which is tailored to SIP's token/parameter grammar).
//! Only the three line types the analyzer needs are recognized; every
//! other `type=` is skipped.

use util::ArcStr;

use crate::address::Address;
use crate::call::{SdpFormat, SdpMedia};

/// RFC 3551 §6 static payload type assignments: `(payload_type, name,
/// clock_rate)`. Used as the fallback codec for a payload type with no
/// `a=rtpmap:` line naming it explicitly.
const STATIC_PAYLOAD_TYPES: &[(u8, &str, u32)] = &[
    (0, "PCMU", 8000),
    (3, "GSM", 8000),
    (4, "G723", 8000),
    (5, "DVI4", 8000),
    (6, "DVI4", 16000),
    (7, "LPC", 8000),
    (8, "PCMA", 8000),
    (9, "G722", 8000),
    (10, "L16", 44100),
    (11, "L16", 44100),
    (12, "QCELP", 8000),
    (13, "CN", 8000),
    (14, "MPA", 90000),
    (15, "G728", 8000),
    (16, "DVI4", 11025),
    (17, "DVI4", 22050),
    (18, "G729", 8000),
    (25, "CelB", 90000),
    (26, "JPEG", 90000),
    (28, "nv", 90000),
    (31, "H261", 90000),
    (32, "MPV", 90000),
    (33, "MP2T", 90000),
    (34, "H263", 90000),
];

fn static_format(payload_type: u8) -> SdpFormat {
    match STATIC_PAYLOAD_TYPES.iter().find(|(pt, ..)| *pt == payload_type) {
        Some((pt, name, rate)) => SdpFormat {
            payload_type: *pt,
            alias: (*name).into(),
            clock_rate: Some(*rate),
        },
        None => SdpFormat {
            payload_type,
            alias: "unknown".into(),
            clock_rate: None,
        },
    }
}

/// One `m=` line in progress: the media's transport port, its offered
/// payload types in order, and any `a=rtpmap:` overrides collected for
/// it before the next `m=` (or end of body) closes it out.
struct MediaBuilder {
    port: u16,
    payload_types: Vec<u8>,
    rtpmaps: Vec<(u8, ArcStr, Option<u32>)>,
    addr: Option<std::net::IpAddr>,
}

/// Parses a SIP message body as SDP, returning one [`SdpMedia`] per `m=`
/// line that resolved to a usable address.
///
/// A media-level `c=` line overrides the session-level `c=` for that
/// media block only (RFC 4566 §5.7); a media block with neither falls
/// back to the session-level address, and is dropped if there is none.
pub fn parse_sdp(body: &[u8]) -> Vec<SdpMedia> {
    let Ok(text) = std::str::from_utf8(body) else {
        return Vec::new();
    };

    let mut session_addr: Option<std::net::IpAddr> = None;
    let mut medias: Vec<MediaBuilder> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some((kind, value)) = line.split_once('=') else {
            continue;
        };

        match kind {
            "c" => {
                if let Some(addr) = parse_connection_addr(value) {
                    match medias.last_mut() {
                        Some(m) => m.addr = Some(addr),
                        None => session_addr = Some(addr),
                    }
                }
            }
            "m" => {
                if let Some(media) = parse_media_line(value) {
                    medias.push(media);
                }
            }
            "a" => {
                if let Some(rest) = value.strip_prefix("rtpmap:") {
                    if let (Some(media), Some((pt, name, rate))) = (medias.last_mut(), parse_rtpmap(rest)) {
                        media.rtpmaps.push((pt, name, rate));
                    }
                }
            }
            _ => {}
        }
    }

    medias
        .into_iter()
        .filter_map(|media| {
            let addr = media.addr.or(session_addr)?;
            let formats = media
                .payload_types
                .iter()
                .map(|pt| {
                    media
                        .rtpmaps
                        .iter()
                        .find(|(mpt, ..)| mpt == pt)
                        .map(|(pt, alias, clock_rate)| SdpFormat {
                            payload_type: *pt,
                            alias: alias.clone(),
                            clock_rate: *clock_rate,
                        })
                        .unwrap_or_else(|| static_format(*pt))
                })
                .collect();
            Some(SdpMedia {
                address: Address::new(addr, media.port),
                formats,
            })
        })
        .collect()
}

/// `c=<nettype> <addrtype> <connection-address>`, e.g. `c=IN IP4 10.0.0.1`.
fn parse_connection_addr(value: &str) -> Option<std::net::IpAddr> {
    let mut parts = value.split_whitespace();
    let _nettype = parts.next()?;
    let addrtype = parts.next()?;
    let addr = parts.next()?;
    // Multicast TTL (`addr/ttl`) or layer count is irrelevant to us.
    let addr = addr.split('/').next()?;
    match addrtype {
        "IP4" => addr.parse::<std::net::Ipv4Addr>().ok().map(std::net::IpAddr::V4),
        "IP6" => addr.parse::<std::net::Ipv6Addr>().ok().map(std::net::IpAddr::V6),
        _ => None,
    }
}

/// `m=<media> <port> <proto> <fmt> ...`, e.g. `m=audio 49170 RTP/AVP 0 8 101`.
fn parse_media_line(value: &str) -> Option<MediaBuilder> {
    let mut parts = value.split_whitespace();
    let _media = parts.next()?;
    let port = parts.next()?.parse::<u16>().ok()?;
    let _proto = parts.next()?;
    let payload_types = parts.filter_map(|p| p.parse::<u8>().ok()).collect();
    Some(MediaBuilder {
        port,
        payload_types,
        rtpmaps: Vec::new(),
        addr: None,
    })
}

/// `<payload-type> <encoding-name>/<clock-rate>[/<channels>]`.
fn parse_rtpmap(value: &str) -> Option<(u8, ArcStr, Option<u32>)> {
    let mut parts = value.splitn(2, char::is_whitespace);
    let pt = parts.next()?.parse::<u8>().ok()?;
    let encoding = parts.next()?.trim();
    let mut fields = encoding.split('/');
    let name = fields.next()?;
    let rate = fields.next().and_then(|r| r.parse::<u32>().ok());
    Some((pt, name.into(), rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn session_level_address_is_inherited() {
        let sdp = b"v=0\r\no=- 1 1 IN IP4 10.0.0.1\r\ns=-\r\nc=IN IP4 10.0.0.5\r\nt=0 0\r\nm=audio 40000 RTP/AVP 0\r\n";
        let media = parse_sdp(sdp);

        assert_eq!(media.len(), 1);
        assert_eq!(media[0].address.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(media[0].address.port(), 40000);
        assert_eq!(media[0].formats[0].alias, "PCMU");
        assert_eq!(media[0].formats[0].clock_rate, Some(8000));
    }

    #[test]
    fn media_level_address_overrides_session_level() {
        let sdp = b"v=0\r\nc=IN IP4 10.0.0.5\r\nm=audio 40000 RTP/AVP 0\r\nc=IN IP4 10.0.0.9\r\nm=video 40002 RTP/AVP 97\r\n";
        let media = parse_sdp(sdp);

        assert_eq!(media.len(), 2);
        assert_eq!(media[0].address.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)));
        assert_eq!(media[1].address.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn dynamic_payload_type_resolved_by_rtpmap() {
        let sdp = b"v=0\r\nc=IN IP4 10.0.0.5\r\nm=audio 40000 RTP/AVP 97\r\na=rtpmap:97 opus/48000/2\r\n";
        let media = parse_sdp(sdp);

        assert_eq!(media[0].formats[0].payload_type, 97);
        assert_eq!(media[0].formats[0].alias, "opus");
        assert_eq!(media[0].formats[0].clock_rate, Some(48000));
    }

    #[test]
    fn unmapped_dynamic_payload_type_is_unknown() {
        let sdp = b"v=0\r\nc=IN IP4 10.0.0.5\r\nm=audio 40000 RTP/AVP 99\r\n";
        let media = parse_sdp(sdp);

        assert_eq!(media[0].formats[0].alias, "unknown");
        assert_eq!(media[0].formats[0].clock_rate, None);
    }

    #[test]
    fn media_with_no_resolvable_address_is_dropped() {
        let sdp = b"v=0\r\nm=audio 40000 RTP/AVP 0\r\n";
        let media = parse_sdp(sdp);

        assert!(media.is_empty());
    }
}
