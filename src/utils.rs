use std::error::Error;
use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use ipnetwork::{ipv4_mask_to_prefix, Ipv4Network};

#[derive(Debug)]
pub struct ParseError {
    reason: String,
}

impl ParseError {
    pub fn new(reason: String) -> Self {
        ParseError { reason }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError: {}", self.reason)
    }
}

impl Error for ParseError {}

/// Our address on the link to a neighbor (low octet is always .1)
pub fn self_addr(neighbor: Ipv4Addr) -> Ipv4Addr {
    let mut octets = neighbor.octets();
    octets[3] = 1;
    Ipv4Addr::from(octets)
}

/// The neighbor's address on its link (low octet is always .2)
/// This is the next-hop recorded for routes the neighbor announces
pub fn peer_addr(neighbor: Ipv4Addr) -> Ipv4Addr {
    let mut octets = neighbor.octets();
    octets[3] = 2;
    Ipv4Addr::from(octets)
}

/// Count the leading 1-bits of a contiguous netmask
pub fn mask_to_len(mask: Ipv4Addr) -> Result<u8, ParseError> {
    ipv4_mask_to_prefix(mask).map_err(|err| ParseError::new(format!("{} '{}'", err, mask)))
}

/// Build a prefix from the wire form (dotted network + dotted netmask),
/// rejecting non-contiguous masks and normalizing any host bits
pub fn prefix_from_parts(network: Ipv4Addr, netmask: Ipv4Addr) -> Result<Ipv4Network, ParseError> {
    let length = mask_to_len(netmask)?;
    let network = Ipv4Addr::from(u32::from(network) & u32::from(netmask));
    Ipv4Network::new(network, length).map_err(|err| ParseError::new(err.to_string()))
}

/// "HH:MM:SS" elapsed since the given instant, for status displays
pub fn elapsed_since(start: DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(start).num_seconds().max(0);
    let minutes = seconds / 60;
    format!("{:02}:{:02}:{:02}", minutes / 60, minutes % 60, seconds % 60)
}
