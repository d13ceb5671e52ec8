//! Ad-hoc selections of calls viewed together (§4.9).

use util::ArcStr;

use super::{Call, Message, Stream};

/// A stable color index, cycling `0..palette_size` in the order calls
/// were added to the group.
pub type ColorIndex = usize;

/// An operator-selected bundle of calls, exposing a chronologically
/// merged view across all of them.
///
/// A `CallGroup` borrows; it never owns a `Call` and is cheap to build and
/// discard. `Storage` treats group membership as a pin against capacity
/// eviction (§4.8's capacity policy, §8 invariant 6).
pub struct CallGroup {
    call_ids: Vec<ArcStr>,
    anchor: Option<ArcStr>,
}

impl CallGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self {
            call_ids: Vec::new(),
            anchor: None,
        }
    }

    /// Adds a call to the group by Call-ID, if not already a member.
    /// `O(n)` in group size, which in practice is small (a handful of
    /// related legs), so a linear scan beats a hash set's overhead.
    pub fn add(&mut self, call_id: ArcStr) {
        if !self.call_ids.contains(&call_id) {
            self.call_ids.push(call_id);
        }
    }

    /// Removes a call from the group.
    pub fn remove(&mut self, call_id: &str) {
        self.call_ids.retain(|id| id.as_ref() != call_id);
        if self.anchor.as_deref() == Some(call_id) {
            self.anchor = None;
        }
    }

    /// Sets the anchor call (the one the operator opened the group from).
    pub fn set_anchor(&mut self, call_id: ArcStr) {
        self.add(call_id.clone());
        self.anchor = Some(call_id);
    }

    /// `true` if `call_id` is a member of this group.
    pub fn contains(&self, call_id: &str) -> bool {
        self.call_ids.iter().any(|id| id.as_ref() == call_id)
    }

    /// Member Call-IDs, in the order they were added.
    pub fn call_ids(&self) -> &[ArcStr] {
        &self.call_ids
    }

    /// A stable color index for `call_id` within this group (its position
    /// in add-order), or `None` if it is not a member.
    pub fn color_of(&self, call_id: &str) -> Option<ColorIndex> {
        self.call_ids.iter().position(|id| id.as_ref() == call_id)
    }

    /// Merges every member call's messages into one chronological
    /// iterator.
    pub fn messages<'a>(&self, calls: &'a [&'a Call]) -> Vec<&'a Message> {
        let mut merged: Vec<&Message> = calls
            .iter()
            .filter(|c| self.contains(c.call_id()))
            .flat_map(|c| c.messages().iter())
            .collect();
        merged.sort_by_key(|m| m.timestamp());
        merged
    }

    /// Merges every member call's streams into one chronological
    /// iterator.
    pub fn streams<'a>(&self, calls: &'a [&'a Call]) -> Vec<&'a Stream> {
        let mut merged: Vec<&Stream> = calls
            .iter()
            .filter(|c| self.contains(c.call_id()))
            .flat_map(|c| c.streams().iter())
            .collect();
        merged.sort_by_key(|s| s.first_seen());
        merged
    }

    /// The message immediately after `current` in the group's merged
    /// chronological view, or `None` if `current` is the last message (or
    /// isn't present in `calls` at all).
    pub fn next_message<'a>(&self, calls: &'a [&'a Call], current: &Message) -> Option<&'a Message> {
        let merged = self.messages(calls);
        let pos = merged.iter().position(|m| std::ptr::eq(*m, current))?;
        merged.get(pos + 1).copied()
    }

    /// The message immediately before `current` in the group's merged
    /// chronological view, or `None` if `current` is the first message (or
    /// isn't present in `calls` at all).
    pub fn prev_message<'a>(&self, calls: &'a [&'a Call], current: &Message) -> Option<&'a Message> {
        let merged = self.messages(calls);
        let pos = merged.iter().position(|m| std::ptr::eq(*m, current))?;
        pos.checked_sub(1).map(|i| merged[i])
    }
}

impl Default for CallGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_and_color_stability() {
        let mut group = CallGroup::new();
        group.add("a@h".into());
        group.add("b@h".into());
        group.add("a@h".into());

        assert_eq!(group.call_ids().len(), 2);
        assert_eq!(group.color_of("a@h"), Some(0));
        assert_eq!(group.color_of("b@h"), Some(1));
        assert_eq!(group.color_of("c@h"), None);
    }

    #[test]
    fn remove_clears_anchor() {
        let mut group = CallGroup::new();
        group.set_anchor("a@h".into());
        group.remove("a@h");

        assert!(!group.contains("a@h"));
        assert!(group.anchor.is_none());
    }

    #[test]
    fn next_and_prev_message_walk_the_merged_timeline() {
        use crate::address::Address;
        use crate::call::{Call, SipSummary};
        use crate::packet::{Frame, Packet};
        use bytes::Bytes;
        use std::net::{IpAddr, Ipv4Addr};

        let addr = Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 5060);

        let summary = |call_id: &str| SipSummary {
            call_id: call_id.into(),
            cseq: 1,
            cseq_method: crate::message::SipMethod::Options,
            method: Some(crate::message::SipMethod::Options),
            status: None,
            from_uri: "sip:a@h".into(),
            from_tag: None,
            to_uri: "sip:b@h".into(),
            to_tag: None,
            via_branch: None,
            x_call_id: None,
            reason: None,
            warning: None,
        };

        let mut one = Call::new("one@h".into(), 0);
        let packet_a = Packet::new(Frame::new(Bytes::from_static(b"a"), 1, 0, 0));
        one.append(Message::new(packet_a, addr, addr, Bytes::from_static(b"a"), None, summary("one@h"), Vec::new()));

        let mut two = Call::new("two@h".into(), 1);
        let packet_b = Packet::new(Frame::new(Bytes::from_static(b"b"), 2, 0, 0));
        two.append(Message::new(packet_b, addr, addr, Bytes::from_static(b"b"), None, summary("two@h"), Vec::new()));

        let mut group = CallGroup::new();
        group.add("one@h".into());
        group.add("two@h".into());

        let calls = [&one, &two];
        let merged = group.messages(&calls);
        assert_eq!(merged.len(), 2);

        let first = merged[0];
        let second = group.next_message(&calls, first).expect("second message exists");
        assert_eq!(second.summary().call_id.as_ref(), "two@h");
        assert!(group.next_message(&calls, second).is_none());

        let back = group.prev_message(&calls, second).expect("first message exists");
        assert_eq!(back.summary().call_id.as_ref(), "one@h");
        assert!(group.prev_message(&calls, back).is_none());
    }
}
