use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use super::RouteEntry;

/// Merge sibling routes until a full pass finds nothing to merge.
///
/// Entries are kept sorted by `(network, length)`; merges can cascade
/// across lengths (two /24 pairs collapse through /23s into a /22).
pub(super) fn to_fixed_point(entries: &mut Vec<RouteEntry>) {
    loop {
        entries.sort_by_key(|e| (u32::from(e.prefix.network()), e.prefix.prefix()));
        if !merge_pass(entries) {
            break;
        }
    }
}

fn merge_pass(entries: &mut Vec<RouteEntry>) -> bool {
    let mut merged = false;
    let mut i = 0;
    'scan: while i < entries.len() {
        // The sibling is usually the next entry, but equal prefixes from
        // other neighbors may sort in between
        for j in (i + 1)..entries.len() {
            if let Some(aggregate) = merge(&entries[i], &entries[j]) {
                entries[i] = aggregate;
                entries.remove(j);
                merged = true;
                continue 'scan;
            }
        }
        i += 1;
    }
    merged
}

/// Two routes merge iff they have the same nonzero length, identical
/// attributes, and are the two halves of the same super-prefix.
fn merge(a: &RouteEntry, b: &RouteEntry) -> Option<RouteEntry> {
    let length = a.prefix.prefix();
    if length == 0 || b.prefix.prefix() != length {
        return None;
    }
    if !a.same_attributes(b) {
        return None;
    }
    let left = u32::from(a.prefix.network());
    let right = u32::from(b.prefix.network());
    if left ^ right != 1 << (32 - length) {
        return None;
    }
    let network = Ipv4Addr::from(left & right);
    let prefix = Ipv4Network::new(network, length - 1).expect("merged length is in range");
    Some(RouteEntry {
        prefix,
        learned_at: a.learned_at.min(b.learned_at),
        ..a.clone()
    })
}
