use std::cmp::Ordering;
use std::net::Ipv4Addr;

use itertools::Itertools;

use super::RouteEntry;

/// Longest-prefix match across the table, tie-broken by [`prefer`].
pub(super) fn best_route(entries: &[RouteEntry], dst: Ipv4Addr) -> Option<&RouteEntry> {
    entries
        .iter()
        .filter(|entry| entry.prefix.contains(dst))
        .max_set_by_key(|entry| entry.prefix.prefix())
        .into_iter()
        .reduce(|best, contender| match prefer(contender, best) {
            Ordering::Greater => contender,
            _ => best,
        })
}

/// The BGP decision ladder, applied strictly in order. Returns `Greater`
/// when `a` wins. Two fully identical entries compare `Equal`.
fn prefer(a: &RouteEntry, b: &RouteEntry) -> Ordering {
    // 1. Higher local preference
    match a.local_pref.cmp(&b.local_pref) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // 2. Locally originated routes win
    match a.self_origin.cmp(&b.self_origin) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // 3. Shorter AS path
    match b.as_path.len().cmp(&a.as_path.len()) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // 4. IGP > EGP > UNK
    match a.origin.cmp(&b.origin) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // 5. Lowest next hop
    u32::from(b.next_hop).cmp(&u32::from(a.next_hop))
}
