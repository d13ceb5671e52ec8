//! Indexed call storage: the primary `Call-ID → Call` index, the
//! secondary `X-Call-ID` cross-reference, the SDP endpoint fan-out index,
//! and the capacity/filter/sort policies of §4.8.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};
use util::ArcStr;

use crate::address::Address;
use crate::call::{Call, CallGroup, CallState, Message};
use crate::dissect::RtpSighting;
use crate::message::SipMethod;
use crate::settings::Settings;

/// A filter predicate applied at display time (§4.8). Every clause is
/// optional (`None` matches everything); `negate` inverts the combined
/// result, matching the "negated matches" the original supports.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    /// Substring match against every message's raw payload.
    pub payload_contains: Option<String>,
    /// Restrict to calls whose first message used one of these methods.
    pub methods: Option<HashSet<SipMethod>>,
    /// Restrict to calls with at least one message from this source.
    pub src: Option<Address>,
    /// Restrict to calls with at least one message to this destination.
    pub dst: Option<Address>,
    /// Restrict to calls currently in this derived state.
    pub state: Option<CallState>,
    /// Invert the combined result of every other clause.
    pub negate: bool,
}

impl Filter {
    /// An empty filter: matches every call.
    pub fn all() -> Self {
        Self::default()
    }

    fn matches(&self, call: &Call) -> bool {
        let result = self.matches_inner(call);
        if self.negate {
            !result
        } else {
            result
        }
    }

    fn matches_inner(&self, call: &Call) -> bool {
        if let Some(needle) = &self.payload_contains {
            let hit = call
                .messages()
                .iter()
                .any(|m| String::from_utf8_lossy(m.raw()).contains(needle.as_str()));
            if !hit {
                return false;
            }
        }
        if let Some(methods) = &self.methods {
            let hit = call
                .messages()
                .iter()
                .any(|m| m.summary().method.is_some_and(|mth| methods.contains(&mth)));
            if !hit {
                return false;
            }
        }
        if let Some(src) = &self.src {
            if !call.messages().iter().any(|m| m.src() == *src) {
                return false;
            }
        }
        if let Some(dst) = &self.dst {
            if !call.messages().iter().any(|m| m.dst() == *dst) {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if std::mem::discriminant(&call.state()) != std::mem::discriminant(state) {
                return false;
            }
        }
        true
    }
}

/// The field calls are ordered by for display (§4.8). Sort is always
/// stable, with arrival order as the ultimate tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Arrival order (the default).
    Arrival,
    /// `From` URI.
    FromUri,
    /// `To` URI.
    ToUri,
    /// First message's source address.
    Src,
    /// First message's destination address.
    Dst,
    /// First message's timestamp, date component.
    Date,
    /// First message's timestamp, time-of-day component.
    Time,
    /// First message's SIP method.
    Method,
    /// Number of messages in the call.
    MessageCount,
    /// Derived call state.
    State,
    /// Elapsed time between first and last message.
    Duration,
}

/// Aggregate counts returned by `Storage::calls_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Total calls currently held.
    pub total: usize,
    /// Calls matching the last-applied filter.
    pub displayed: usize,
}

/// The call/dialog storage engine (§4.8).
pub struct Storage {
    calls: HashMap<ArcStr, Call>,
    arrival_order: Vec<ArcStr>,
    endpoint_index: HashMap<Address, ArcStr>,
    groups: Vec<CallGroup>,
    next_arrival_index: u64,
    limit: usize,
    rotate_logs: bool,
    dialog_creating_methods: HashSet<SipMethod>,
    noincomplete: bool,
    changed: bool,
}

impl Storage {
    /// Builds an empty `Storage` from a `Settings` snapshot.
    pub fn new(settings: &Settings) -> Self {
        let dialog_creating_methods = settings
            .get_str_list("sip.calls")
            .map(|methods| methods.iter().filter_map(|m| method_from_str(m)).collect())
            .unwrap_or_else(default_dialog_creating_methods);

        Self {
            calls: HashMap::new(),
            arrival_order: Vec::new(),
            endpoint_index: HashMap::new(),
            groups: Vec::new(),
            next_arrival_index: 0,
            limit: settings.get_i64("capture.limit", 20_000).max(0) as usize,
            rotate_logs: settings.get_bool("capture.rotate", false),
            dialog_creating_methods,
            noincomplete: settings.get_bool("sip.noincomplete", false),
            changed: false,
        }
    }

    /// Ingests one dissected SIP message per the rules of §4.8.
    pub fn ingest_sip(&mut self, msg: Message) {
        let call_id: ArcStr = msg.summary().call_id.clone();
        let x_call_id = msg.summary().x_call_id.clone();
        let sdp = msg.sdp().to_vec();

        if !self.calls.contains_key(&call_id) {
            let creates_dialog = msg
                .summary()
                .method
                .is_some_and(|m| self.dialog_creating_methods.contains(&m));
            if !creates_dialog && self.noincomplete {
                debug!(call_id = %call_id, "dropping message: not a dialog-creating method and sip.noincomplete is set");
                return;
            }
            let idx = self.next_arrival_index;
            self.next_arrival_index += 1;
            self.calls.insert(call_id.clone(), Call::new(call_id.clone(), idx));
            self.arrival_order.push(call_id.clone());
        }

        if let Some(xid) = x_call_id {
            self.link_xcall(&call_id, &xid);
        }

        for media in &sdp {
            self.endpoint_index.insert(media.address, call_id.clone());
        }

        if let Some(call) = self.calls.get_mut(&call_id) {
            call.append(msg);
        }

        self.changed = true;
        self.enforce_capacity();
    }

    /// Bidirectionally links two calls by `X-Call-ID` (§8, invariant 7).
    fn link_xcall(&mut self, call_id: &ArcStr, other_id: &ArcStr) {
        if !self.calls.contains_key(other_id) {
            return;
        }
        if let Some(call) = self.calls.get_mut(call_id) {
            call.link(other_id.clone());
        }
        if let Some(other) = self.calls.get_mut(other_id) {
            other.link(call_id.clone());
        }
    }

    /// Binds an RTP/RTCP sighting to a call by looking its destination
    /// (falling back to its source) up in the SDP endpoint index, then
    /// records it on that call's stream list (§4.6).
    pub fn ingest_rtp(&mut self, sighting: RtpSighting) {
        let call_id = self
            .endpoint_index
            .get(&sighting.dst)
            .or_else(|| self.endpoint_index.get(&sighting.src))
            .cloned();

        let Some(call_id) = call_id else {
            debug!(src = %sighting.src, dst = %sighting.dst, "RTP/RTCP stream has no matching SDP endpoint, left unbound");
            return;
        };

        if let Some(call) = self.calls.get_mut(&call_id) {
            call.record_stream(
                sighting.src,
                sighting.dst,
                sighting.payload_type,
                sighting.ssrc,
                sighting.is_rtcp,
                sighting.timestamp,
            );
            self.changed = true;
        }
    }

    /// Looks up a call by Call-ID.
    pub fn get_call(&self, call_id: &str) -> Option<&Call> {
        self.calls.get(call_id)
    }

    /// Lists calls matching `filter`, ordered by `sort`.
    pub fn list_calls(&self, filter: &Filter, sort: SortKey) -> Vec<&Call> {
        let mut calls: Vec<&Call> = self
            .arrival_order
            .iter()
            .filter_map(|id| self.calls.get(id))
            .filter(|c| filter.matches(c))
            .collect();

        calls.sort_by(|a, b| sort_cmp(a, b, sort));
        calls
    }

    /// Total vs. filtered-displayed call counts.
    pub fn calls_stats(&self, filter: &Filter) -> Stats {
        Stats {
            total: self.calls.len(),
            displayed: self.calls.values().filter(|c| filter.matches(c)).count(),
        }
    }

    /// Edge-triggered change flag: `true` at most once per mutation batch,
    /// cleared by this call.
    pub fn calls_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Drops every call.
    pub fn clear_all(&mut self) {
        self.calls.clear();
        self.arrival_order.clear();
        self.endpoint_index.clear();
        self.changed = true;
    }

    /// Drops every call that does not match `filter`, retaining only what
    /// is currently displayed.
    pub fn clear_soft(&mut self, filter: &Filter) {
        let keep: HashSet<ArcStr> = self
            .calls
            .iter()
            .filter(|(_, c)| filter.matches(c))
            .map(|(id, _)| id.clone())
            .collect();

        self.calls.retain(|id, _| keep.contains(id));
        self.arrival_order.retain(|id| keep.contains(id));
        self.endpoint_index.retain(|_, id| keep.contains(id));
        self.changed = true;
    }

    /// Creates a new, empty `CallGroup` and returns its index.
    pub fn create_group(&mut self) -> usize {
        self.groups.push(CallGroup::new());
        self.groups.len() - 1
    }

    /// A mutable reference to a previously created group.
    pub fn group_mut(&mut self, index: usize) -> Option<&mut CallGroup> {
        self.groups.get_mut(index)
    }

    /// A reference to a previously created group.
    pub fn group(&self, index: usize) -> Option<&CallGroup> {
        self.groups.get(index)
    }

    fn pinned_call_ids(&self) -> HashSet<ArcStr> {
        self.groups
            .iter()
            .flat_map(|g| g.call_ids().iter().cloned())
            .collect()
    }

    /// Evicts the oldest non-pinned call(s) until storage is back under
    /// `capture.limit` (§4.8, §8 invariant 6).
    fn enforce_capacity(&mut self) {
        if self.calls.len() <= self.limit {
            return;
        }
        let pinned = self.pinned_call_ids();
        let mut i = 0;
        while self.calls.len() > self.limit && i < self.arrival_order.len() {
            let candidate = self.arrival_order[i].clone();
            if pinned.contains(&candidate) {
                i += 1;
                continue;
            }
            self.calls.remove(&candidate);
            self.arrival_order.remove(i);
            self.endpoint_index.retain(|_, id| id != &candidate);
            if self.rotate_logs {
                warn!(call_id = %candidate, "evicted call: capture.limit exceeded");
            } else {
                debug!(call_id = %candidate, "evicted call: capture.limit exceeded");
            }
            // Do not advance `i`: the vector shifted left under us.
        }
    }
}

const SECS_PER_DAY: u64 = 86_400;

fn sort_cmp(a: &Call, b: &Call, sort: SortKey) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let ordering = match sort {
        SortKey::Arrival => Ordering::Equal,
        SortKey::FromUri => first_summary(a, |s| s.from_uri.clone()).cmp(&first_summary(b, |s| s.from_uri.clone())),
        SortKey::ToUri => first_summary(a, |s| s.to_uri.clone()).cmp(&first_summary(b, |s| s.to_uri.clone())),
        SortKey::Src => first_msg(a, |m| m.src()).cmp(&first_msg(b, |m| m.src())),
        SortKey::Dst => first_msg(a, |m| m.dst()).cmp(&first_msg(b, |m| m.dst())),
        SortKey::Date => first_msg(a, |m| m.timestamp().0 / SECS_PER_DAY).cmp(&first_msg(b, |m| m.timestamp().0 / SECS_PER_DAY)),
        SortKey::Time => first_msg(a, |m| (m.timestamp().0 % SECS_PER_DAY, m.timestamp().1))
            .cmp(&first_msg(b, |m| (m.timestamp().0 % SECS_PER_DAY, m.timestamp().1))),
        SortKey::Method => first_summary(a, |s| format!("{:?}", s.method)).cmp(&first_summary(b, |s| format!("{:?}", s.method))),
        SortKey::MessageCount => a.messages().len().cmp(&b.messages().len()),
        SortKey::State => format!("{:?}", a.state()).cmp(&format!("{:?}", b.state())),
        SortKey::Duration => duration(a).cmp(&duration(b)),
    };

    ordering.then_with(|| a.arrival_index().cmp(&b.arrival_index()))
}

fn first_msg<T, F: Fn(&Message) -> T>(call: &Call, f: F) -> Option<T> {
    call.messages().first().map(f)
}

fn first_summary<T, F: Fn(&crate::call::SipSummary) -> T>(call: &Call, f: F) -> Option<T> {
    call.messages().first().map(|m| f(m.summary()))
}

fn duration(call: &Call) -> u64 {
    match (call.messages().first(), call.messages().last()) {
        (Some(first), Some(last)) => last.timestamp().0.saturating_sub(first.timestamp().0),
        _ => 0,
    }
}

fn default_dialog_creating_methods() -> HashSet<SipMethod> {
    [
        SipMethod::Invite,
        SipMethod::Register,
        SipMethod::Subscribe,
        SipMethod::Notify,
        SipMethod::Options,
        SipMethod::Publish,
        SipMethod::Message,
        SipMethod::Info,
        SipMethod::Refer,
        SipMethod::Update,
    ]
    .into_iter()
    .collect()
}

fn method_from_str(s: &str) -> Option<SipMethod> {
    Some(match s.to_ascii_uppercase().as_str() {
        "INVITE" => SipMethod::Invite,
        "ACK" => SipMethod::Ack,
        "BYE" => SipMethod::Bye,
        "CANCEL" => SipMethod::Cancel,
        "REGISTER" => SipMethod::Register,
        "SUBSCRIBE" => SipMethod::Subscribe,
        "NOTIFY" => SipMethod::Notify,
        "OPTIONS" => SipMethod::Options,
        "PUBLISH" => SipMethod::Publish,
        "MESSAGE" => SipMethod::Message,
        "INFO" => SipMethod::Info,
        "REFER" => SipMethod::Refer,
        "UPDATE" => SipMethod::Update,
        "PRACK" => SipMethod::Prack,
        _ => return None,
    })
}
