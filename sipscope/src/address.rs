//! Network endpoint addressing.
//!
//! [`Address`] is the typed `{ip, port}` pair threaded through every layer
//! of the dissection pipeline: it keys fragment and flow reassembly tables,
//! identifies RTP/RTCP streams, and is what SDP media descriptions resolve
//! to.

use std::fmt;
use std::net::IpAddr;

/// A network endpoint: an IP address plus a port.
///
/// Port `0` is only meaningful in filter contexts (`§6` Settings), where it
/// means "any port"; elsewhere a concrete port is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    ip: IpAddr,
    port: u16,
}

impl Address {
    /// Creates a new `Address` from an IP address and a port.
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// The IP address.
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Compares two addresses ignoring their port.
    ///
    /// Used by SDP→RTP binding, where the signaled `c=`/`m=` address must
    /// match a media packet's source or destination IP regardless of the
    /// transport port SIP was carried over.
    pub fn eq_ip(&self, other: &Address) -> bool {
        self.ip == other.ip
    }

    /// Returns `true` if `ip` is one of the well-known loopback or
    /// unspecified addresses, used to recognize "this host" without a
    /// configured list of local interfaces.
    pub fn is_local(&self) -> bool {
        self.ip.is_loopback() || self.ip.is_unspecified()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(v4) => write!(f, "{}:{}", v4, self.port),
            IpAddr::V6(v6) => write!(f, "[{}]:{}", v6, self.port),
        }
    }
}

impl From<std::net::SocketAddr> for Address {
    fn from(value: std::net::SocketAddr) -> Self {
        Self::new(value.ip(), value.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn equality_with_and_without_port() {
        let a = Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 5060);
        let b = Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 5061);

        assert_ne!(a, b);
        assert!(a.eq_ip(&b));
    }

    #[test]
    fn display_v4() {
        let a = Address::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 5060);
        assert_eq!(a.to_string(), "10.0.0.1:5060");
    }

    #[test]
    fn local_address_recognition() {
        let loopback = Address::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5060);
        let remote = Address::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 5060);

        assert!(loopback.is_local());
        assert!(!remote.is_local());
    }
}
