//! Runtime configuration: a flat key → string map with typed accessors.
//!
//! The config-file reader and any UI-driven settings editor are external
//! collaborators; `Settings` only models the map itself and the handful of
//! typed reads the dissection pipeline and storage engine need. Every
//! recognized key is documented on the accessor call site that reads it —
//! there is no central schema to keep in sync.
//!
//! Recognized keys:
//! - `sip.noincomplete` (bool, default `false`): drop messages that would
//!   start a new call under a non-dialog-creating method.
//! - `sip.calls` (comma list, default INVITE/REGISTER/SUBSCRIBE/NOTIFY/
//!   OPTIONS/PUBLISH/MESSAGE/INFO/REFER/UPDATE): methods allowed to create
//!   a new call.
//! - `sip.xcid` (comma list, default `X-Call-ID,X-CID`): header names
//!   checked, in order, for the cross-reference Call-ID.
//! - `capture.limit` (int, default `20000`): maximum calls held at once.
//! - `capture.rotate` (bool, default `false`): log evictions at `warn`
//!   instead of `debug`.
//! - `capture.packet.{ip,udp,tcp,tls,hep,ws,sip,sdp,rtp,rtcp}` (bool,
//!   default `true`): whether the dissector tree includes this protocol.
//! - `filter.methods`, `filter.payload`: operator-facing display filter
//!   defaults, read by callers building a `call::Filter`, not by `Storage`
//!   itself.
//! - `eep.send.{address,port,version,pass,id}`, `eep.listen.{address,port}`:
//!   HEP transport parameters, read by the (external) socket I/O
//!   collaborator and by the HEP dissector/encoder for protocol version and
//!   capture password.

use std::collections::HashMap;

/// A flat runtime configuration snapshot.
///
/// Cloning is a deep copy of the underlying map; `Settings` is built once
/// at startup from whatever external config-file reader or UI the embedder
/// provides, then handed by reference to `Registry::new` and `Storage::new`.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// An empty settings map; every accessor falls back to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, overwriting any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// The raw string value for `key`, if set.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses `key` as a bool (`"true"`/`"false"`, case-insensitive),
    /// falling back to `default` if unset or unparseable.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_str(key)
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(default)
    }

    /// Parses `key` as an `i64`, falling back to `default` if unset or
    /// unparseable.
    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get_str(key).and_then(|v| v.parse::<i64>().ok()).unwrap_or(default)
    }

    /// Splits `key` on commas into a trimmed, non-empty string list, or
    /// `None` if unset.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.get_str(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_keys_fall_back_to_default() {
        let settings = Settings::new();
        assert!(!settings.get_bool("sip.noincomplete", false));
        assert_eq!(settings.get_i64("capture.limit", 20_000), 20_000);
        assert!(settings.get_str_list("sip.xcid").is_none());
    }

    #[test]
    fn typed_accessors_parse_set_values() {
        let mut settings = Settings::new();
        settings.set("capture.rotate", "true");
        settings.set("capture.limit", "500");
        settings.set("sip.xcid", "X-Call-ID, X-CID");

        assert!(settings.get_bool("capture.rotate", false));
        assert_eq!(settings.get_i64("capture.limit", 20_000), 500);
        assert_eq!(
            settings.get_str_list("sip.xcid"),
            Some(vec!["X-Call-ID".to_string(), "X-CID".to_string()])
        );
    }
}
