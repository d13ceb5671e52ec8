//! Feeds a canned INVITE/200/ACK/BYE dialog through an `Analyzer` and
//! prints the resulting call's state once every source has run dry.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use sipscope::analyzer::{Analyzer, PacketSource, SourceFrame};
use sipscope::call::{Filter, SortKey};
use sipscope::packet::ProtocolId;
use sipscope::Settings;
use tracing::Level;

/// Wraps a SIP message in a minimal IPv4 + UDP envelope so it can enter
/// the dissector tree at `ProtocolId::Ip`, the same as a captured frame
/// would.
fn ip_udp_frame(payload: &[u8]) -> Bytes {
    let udp_len = 8 + payload.len();
    let total_len = 20 + udp_len;

    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u8(0x45);
    buf.put_u8(0);
    buf.put_u16(total_len as u16);
    buf.put_u16(1);
    buf.put_u16(0);
    buf.put_u8(64);
    buf.put_u8(17);
    buf.put_u16(0);
    buf.put_slice(&[10, 0, 0, 1]);
    buf.put_slice(&[10, 0, 0, 2]);

    buf.put_u16(5060);
    buf.put_u16(5060);
    buf.put_u16(udp_len as u16);
    buf.put_u16(0);
    buf.put_slice(payload);

    buf.freeze()
}

/// A `PacketSource` that replays a fixed list of frames then stops.
struct CannedSource {
    frames: std::vec::IntoIter<Bytes>,
    ts_sec: u64,
}

#[async_trait]
impl PacketSource for CannedSource {
    fn root(&self) -> ProtocolId {
        ProtocolId::Ip
    }

    fn name(&self) -> &str {
        "canned-dialog"
    }

    async fn recv(&mut self) -> Option<SourceFrame> {
        let bytes = self.frames.next()?;
        self.ts_sec += 1;
        Some(SourceFrame::new(bytes, self.ts_sec, 0, 0))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_env_filter("sipscope=debug").init();

    let invite = b"INVITE sip:bob@biloxi.example.com SIP/2.0\r\nVia: SIP/2.0/UDP atlanta.example.com;branch=z9hG4bK776asdhds\r\nFrom: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\nTo: Bob <sip:bob@biloxi.example.com>\r\nCall-ID: a84b4c76e66710@pc33.atlanta.example.com\r\nCSeq: 314159 INVITE\r\nContent-Length: 0\r\n\r\n";
    let ok = b"SIP/2.0 200 OK\r\nVia: SIP/2.0/UDP atlanta.example.com;branch=z9hG4bK776asdhds\r\nFrom: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\nTo: Bob <sip:bob@biloxi.example.com>;tag=a6c85cf\r\nCall-ID: a84b4c76e66710@pc33.atlanta.example.com\r\nCSeq: 314159 INVITE\r\nContent-Length: 0\r\n\r\n";
    let ack = b"ACK sip:bob@biloxi.example.com SIP/2.0\r\nVia: SIP/2.0/UDP atlanta.example.com;branch=z9hG4bK776asdhds9\r\nFrom: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\nTo: Bob <sip:bob@biloxi.example.com>;tag=a6c85cf\r\nCall-ID: a84b4c76e66710@pc33.atlanta.example.com\r\nCSeq: 314159 ACK\r\nContent-Length: 0\r\n\r\n";
    let bye = b"BYE sip:alice@atlanta.example.com SIP/2.0\r\nVia: SIP/2.0/UDP biloxi.example.com;branch=z9hG4bKnashds8\r\nFrom: Bob <sip:bob@biloxi.example.com>;tag=a6c85cf\r\nTo: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\nCall-ID: a84b4c76e66710@pc33.atlanta.example.com\r\nCSeq: 231 BYE\r\nContent-Length: 0\r\n\r\n";

    let frames = vec![ip_udp_frame(invite), ip_udp_frame(ok), ip_udp_frame(ack), ip_udp_frame(bye)];

    let mut analyzer = Analyzer::builder(Settings::new())
        .with_source(Box::new(CannedSource { frames: frames.into_iter(), ts_sec: 0 }))
        .build();

    analyzer.run().await;

    for call in analyzer.storage().list_calls(&Filter::all(), SortKey::Arrival) {
        println!("call {} -> {:?} ({} messages)", call.call_id(), call.state(), call.messages().len());
    }
}
