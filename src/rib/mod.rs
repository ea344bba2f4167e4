mod aggregate;
mod history;
mod select;

pub use history::{History, Withdrawal};

use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use log::trace;

use crate::message::{Origin, UpdateParams};
use crate::utils::{elapsed_since, prefix_from_parts, ParseError};

#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub prefix: Ipv4Network,
    // Peer address of the announcing neighbor
    pub next_hop: Ipv4Addr,
    pub local_pref: u32,
    pub as_path: Vec<u32>,
    pub self_origin: bool,
    pub origin: Origin,
    // Time learned, only used for display
    pub(crate) learned_at: DateTime<Utc>,
}

impl RouteEntry {
    pub fn from_update(params: &UpdateParams, next_hop: Ipv4Addr) -> Result<Self, ParseError> {
        let prefix = prefix_from_parts(params.network, params.netmask)?;
        Ok(RouteEntry {
            prefix,
            next_hop,
            local_pref: params.local_pref,
            as_path: params.as_path.clone(),
            self_origin: params.self_origin,
            origin: params.origin,
            learned_at: Utc::now(),
        })
    }

    /// Attribute identity for the aggregation engine. The learned
    /// timestamp is display-only and excluded.
    pub fn same_attributes(&self, other: &Self) -> bool {
        self.next_hop == other.next_hop
            && self.local_pref == other.local_pref
            && self.as_path == other.as_path
            && self.self_origin == other.self_origin
            && self.origin == other.origin
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Route {} via {} age={}>",
            self.prefix,
            self.next_hop,
            elapsed_since(self.learned_at),
        )
    }
}

/// The forwarding table plus the history it is a function of.
///
/// Announcements and withdrawals are the only mutations; both leave the
/// table aggregated to the fixed point.
#[derive(Debug, Default)]
pub struct Rib {
    entries: Vec<RouteEntry>,
    history: History,
}

impl Rib {
    pub fn new() -> Self {
        Rib::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current entries in `(network, length)` order
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn announce(&mut self, entry: RouteEntry) {
        self.history.record_announcement(entry.clone());
        self.entries.push(entry);
        aggregate::to_fixed_point(&mut self.entries);
    }

    pub fn withdraw(&mut self, next_hop: Ipv4Addr, prefixes: Vec<Ipv4Network>) {
        self.history.record_withdrawal(next_hop, prefixes);
        self.rebuild();
    }

    /// Disaggregation: replay every announcement unaggregated, apply every
    /// recorded withdrawal, then aggregate once. A withdrawal of one half
    /// of a merged pair thereby leaves the surviving half behind.
    fn rebuild(&mut self) {
        self.entries.clear();
        self.entries.extend(self.history.announcements().iter().cloned());
        for withdrawal in self.history.withdrawals() {
            self.entries.retain(|entry| {
                entry.next_hop != withdrawal.next_hop
                    || !withdrawal.prefixes.contains(&entry.prefix)
            });
        }
        aggregate::to_fixed_point(&mut self.entries);
        trace!("Rebuilt RIB from history: {} routes", self.entries.len());
    }

    /// Longest-prefix match, tie-broken by the BGP decision ladder
    pub fn best_route(&self, dst: Ipv4Addr) -> Option<&RouteEntry> {
        select::best_route(&self.entries, dst)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::entry;
    use super::*;

    #[test]
    fn test_announce_aggregates() {
        let mut rib = Rib::new();
        rib.announce(entry("192.168.0.0", 24, "192.168.0.2"));
        rib.announce(entry("192.168.1.0", 24, "192.168.0.2"));
        assert_eq!(rib.len(), 1);
        assert_eq!(rib.entries()[0].prefix.to_string(), "192.168.0.0/23");
    }

    #[test]
    fn test_withdraw_disaggregates() {
        let mut rib = Rib::new();
        rib.announce(entry("192.168.0.0", 24, "192.168.0.2"));
        rib.announce(entry("192.168.1.0", 24, "192.168.0.2"));

        let withdrawn = Ipv4Network::new("192.168.1.0".parse().unwrap(), 24).unwrap();
        rib.withdraw("192.168.0.2".parse().unwrap(), vec![withdrawn]);
        assert_eq!(rib.len(), 1);
        assert_eq!(rib.entries()[0].prefix.to_string(), "192.168.0.0/24");
    }

    #[test]
    fn test_withdraw_ignores_other_next_hop() {
        let mut rib = Rib::new();
        rib.announce(entry("10.0.0.0", 8, "192.168.0.2"));

        let prefix = Ipv4Network::new("10.0.0.0".parse().unwrap(), 8).unwrap();
        rib.withdraw("172.20.0.2".parse().unwrap(), vec![prefix]);
        assert_eq!(rib.len(), 1);
    }

    #[test]
    fn test_withdrawal_inversion() {
        let mut rib = Rib::new();
        let next_hop: Ipv4Addr = "192.168.0.2".parse().unwrap();
        let other: Ipv4Addr = "172.20.0.2".parse().unwrap();

        rib.announce(entry("10.0.0.0", 8, "192.168.0.2"));
        rib.announce(entry("172.16.0.0", 16, "172.20.0.2"));
        rib.withdraw(
            other,
            vec![Ipv4Network::new("172.16.0.0".parse().unwrap(), 16).unwrap()],
        );
        rib.withdraw(
            next_hop,
            vec![Ipv4Network::new("10.0.0.0".parse().unwrap(), 8).unwrap()],
        );
        assert!(rib.is_empty());
    }
}
