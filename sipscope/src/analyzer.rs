//! The analyzer (§4.11): the engine that ties a set of packet sources to
//! the dissector [`Registry`] and the call [`Storage`], and drives the
//! single-threaded event loop described in §5.
//!
//! Every source runs its own read loop in its own spawned task and
//! forwards frames onto one shared `mpsc` channel, mirroring the
//! transport layer's `TransportTx`/`TransportRx` split: many producers,
//! one consumer. Dissection and every `Storage` mutation happen on
//! whichever task owns the receiver end, so there is exactly one writer
//! and no locking inside the pipeline itself.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::call::Storage;
use crate::dissect::{Emission, Registry};
use crate::packet::{Frame, Packet, ProtocolId};
use crate::settings::Settings;

/// One frame as handed to the pipeline by a [`PacketSource`] (§6): raw
/// bytes plus the capture timestamp and interface index the rest of the
/// pipeline threads through as [`Frame`] metadata.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub bytes: Bytes,
    pub ts_sec: u64,
    pub ts_usec: u32,
    pub iface: u32,
}

impl SourceFrame {
    pub fn new(bytes: Bytes, ts_sec: u64, ts_usec: u32, iface: u32) -> Self {
        Self { bytes, ts_sec, ts_usec, iface }
    }
}

/// A producer of captured frames: a pcap file reader, a live capture
/// device, or a HEP listener socket. Concrete I/O is outside this crate's
/// scope (§1, Non-goals); this trait is the seam an embedder implements
/// to feed frames into the pipeline.
#[async_trait]
pub trait PacketSource: Send {
    /// The dissector-tree root this source's frames enter at —
    /// [`ProtocolId::Link`] for live/file capture, [`ProtocolId::Hep`]
    /// for a HEP listener that hands over already-decoded SIP payloads.
    fn root(&self) -> ProtocolId;

    /// A short label for logging (interface name, listen address, file path).
    fn name(&self) -> &str;

    /// Waits for and returns the next frame, or `None` once the source is
    /// exhausted (end of capture file, socket closed).
    async fn recv(&mut self) -> Option<SourceFrame>;
}

/// Accumulates a [`Settings`] snapshot and the set of [`PacketSource`]s an
/// [`Analyzer`] should poll, then builds one.
pub struct Builder {
    settings: Settings,
    sources: Vec<Box<dyn PacketSource>>,
}

impl Builder {
    fn new(settings: Settings) -> Self {
        Self { settings, sources: Vec::new() }
    }

    pub fn with_source(mut self, source: Box<dyn PacketSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(self) -> Analyzer {
        let registry = Registry::new(&self.settings);
        let storage = Storage::new(&self.settings);
        Analyzer {
            registry,
            storage,
            sources: self.sources,
        }
    }
}

/// The top-level pipeline object (§4.11): owns the dissector tree, the
/// call storage, and every registered packet source.
pub struct Analyzer {
    registry: Registry,
    storage: Storage,
    sources: Vec<Box<dyn PacketSource>>,
}

impl Analyzer {
    /// Starts building an `Analyzer` over the given settings snapshot.
    pub fn builder(settings: Settings) -> Builder {
        Builder::new(settings)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Dispatches one already-received frame through the dissector tree
    /// and folds every emission into storage. Split out from `run` so
    /// tests and demo binaries can drive the pipeline with synthetic
    /// frames without standing up a real `PacketSource`.
    pub fn ingest(&mut self, root: ProtocolId, frame: SourceFrame) {
        let packet = Packet::new(Frame::new(frame.bytes.clone(), frame.ts_sec, frame.ts_usec, frame.iface));
        for emission in self.registry.dispatch(root, &packet, frame.bytes) {
            match emission {
                Emission::Sip(msg) => self.storage.ingest_sip(msg),
                Emission::Rtp(sighting) => self.storage.ingest_rtp(sighting),
            }
        }
    }

    /// Runs the event loop (§5) until every source is exhausted: each
    /// source's `recv` loop runs in its own task, forwarding onto one
    /// channel; this task is the single consumer, so dissection and
    /// `Storage` mutation never race. Takes `&mut self` rather than
    /// consuming the analyzer so callers can inspect `storage()` once the
    /// sources run dry.
    pub async fn run(&mut self) {
        let (tx, mut rx) = mpsc::channel::<(ProtocolId, SourceFrame)>(1_000);

        for mut source in std::mem::take(&mut self.sources) {
            let tx = tx.clone();
            let root = source.root();
            let name = source.name().to_string();
            tokio::spawn(async move {
                while let Some(frame) = source.recv().await {
                    if tx.send((root, frame)).await.is_err() {
                        break;
                    }
                }
                debug!(source = %name, "packet source exhausted");
            });
        }
        drop(tx);

        while let Some((root, frame)) = rx.recv().await {
            self.ingest(root, frame);
        }
        warn!("all packet sources exhausted, analyzer loop exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::SortKey;
    use crate::dissect::ip_test_support::ipv4_udp_packet;

    fn sip_options_frame() -> SourceFrame {
        let payload = b"OPTIONS sip:b@h SIP/2.0\r\nCall-ID: abc@h\r\nCSeq: 1 OPTIONS\r\nFrom: <sip:a@h>\r\nTo: <sip:b@h>\r\nContent-Length: 0\r\n\r\n";
        SourceFrame::new(ipv4_udp_packet(payload), 1, 0, 0)
    }

    #[test]
    fn ingest_feeds_storage() {
        let mut analyzer = Analyzer::builder(Settings::new()).build();

        analyzer.ingest(ProtocolId::Ip, sip_options_frame());

        let stats = analyzer.storage().calls_stats(&crate::call::Filter::all());
        assert_eq!(stats.total, 1);
        let calls = analyzer.storage().list_calls(&crate::call::Filter::all(), SortKey::Arrival);
        assert_eq!(calls[0].call_id().as_ref(), "abc@h");
    }
}
