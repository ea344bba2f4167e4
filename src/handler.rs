use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use log::{debug, error, info, trace, warn};

use crate::config::{NeighborConfig, Relation, RouterConfig};
use crate::message::{
    Advertisement, EmptyMsg, Envelope, OutboundEnvelope, OutboundPayload, Payload, PrefixSpec,
    TableEntry, UpdateParams,
};
use crate::rib::{Rib, RouteEntry};
use crate::utils::{peer_addr, prefix_from_parts, self_addr};

/// A frame ready for transmission to a neighbor's socket
#[derive(Debug)]
pub struct Outbound {
    pub to: Ipv4Addr,
    pub frame: Vec<u8>,
}

/// Configured neighbors, keyed by their link address. Fixed at startup.
#[derive(Debug)]
pub struct NeighborRegistry {
    neighbors: HashMap<Ipv4Addr, Arc<NeighborConfig>>,
}

impl NeighborRegistry {
    fn new(config: &RouterConfig) -> Self {
        NeighborRegistry {
            neighbors: config
                .neighbors
                .iter()
                .map(|n| (n.addr, Arc::clone(n)))
                .collect(),
        }
    }

    pub fn get(&self, addr: Ipv4Addr) -> Option<&Arc<NeighborConfig>> {
        self.neighbors.get(&addr)
    }

    /// The neighbor whose peer address a route's next hop points at
    pub fn for_next_hop(&self, next_hop: Ipv4Addr) -> Option<&Arc<NeighborConfig>> {
        self.neighbors
            .values()
            .find(|n| peer_addr(n.addr) == next_hop)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NeighborConfig>> {
        self.neighbors.values()
    }
}

/// The no-transit rule: routes learned from a customer go to everyone,
/// routes learned from a peer or provider only to customers.
pub fn export_allowed(source: Relation, target: Relation) -> bool {
    source.is_customer() || target.is_customer()
}

/// Single-state message reactor. Owns the RIB and the neighbor registry;
/// each handler runs to completion and returns the frames to emit.
pub struct Router {
    local_as: u32,
    neighbors: NeighborRegistry,
    rib: Rib,
}

impl Router {
    pub fn new(config: &RouterConfig) -> Self {
        Router {
            local_as: config.local_as,
            neighbors: NeighborRegistry::new(config),
            rib: Rib::new(),
        }
    }

    pub fn rib(&self) -> &Rib {
        &self.rib
    }

    /// Frames announcing ourselves on every link, sent once at startup
    pub fn handshake_frames(&self) -> Vec<Outbound> {
        self.neighbors
            .iter()
            .map(|n| Outbound {
                to: n.addr,
                frame: OutboundEnvelope::to_neighbor(
                    n.addr,
                    OutboundPayload::Handshake(EmptyMsg {}),
                )
                .to_frame(),
            })
            .collect()
    }

    /// Parse and dispatch one received datagram. Malformed frames and
    /// frames from unknown sources are dropped here.
    pub fn handle_frame(&mut self, source: Ipv4Addr, frame: &[u8]) -> Vec<Outbound> {
        let envelope: Envelope = match serde_json::from_slice(frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Dropping malformed frame from {}: {}", source, err);
                return Vec::new();
            }
        };
        let neighbor = match self.neighbors.get(source) {
            Some(neighbor) => Arc::clone(neighbor),
            None => {
                warn!(
                    "Dropping {} frame from unknown source {}",
                    envelope.payload.kind(),
                    source
                );
                return Vec::new();
            }
        };
        trace!("Received {} frame from {}", envelope.payload.kind(), neighbor);
        match envelope.payload {
            Payload::Handshake(_) => {
                debug!("Handshake from {}", neighbor);
                Vec::new()
            }
            Payload::Update(params) => self.handle_update(&neighbor, &params),
            Payload::Withdraw(prefixes) => self.handle_withdraw(&neighbor, prefixes),
            Payload::Data(_) => self.handle_data(&neighbor, envelope.src, envelope.dst, frame),
            Payload::Dump(_) => self.handle_dump(&neighbor, envelope.src),
            payload => {
                debug!("Ignoring {} frame from {}", payload.kind(), neighbor);
                Vec::new()
            }
        }
    }

    fn handle_update(&mut self, neighbor: &NeighborConfig, params: &UpdateParams) -> Vec<Outbound> {
        let next_hop = peer_addr(neighbor.addr);
        let entry = match RouteEntry::from_update(params, next_hop) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Dropping update from {}: {}", neighbor, err);
                return Vec::new();
            }
        };
        info!("Learned {} from {}", entry, neighbor);

        let mut as_path = Vec::with_capacity(entry.as_path.len() + 1);
        as_path.push(self.local_as);
        as_path.extend(&entry.as_path);
        let advertisement = Advertisement {
            network: entry.prefix.network(),
            netmask: entry.prefix.mask(),
            as_path,
        };

        self.rib.announce(entry);
        self.flood(neighbor, OutboundPayload::Update(advertisement))
    }

    fn handle_withdraw(
        &mut self,
        neighbor: &NeighborConfig,
        prefixes: Vec<PrefixSpec>,
    ) -> Vec<Outbound> {
        let mut withdrawn = Vec::with_capacity(prefixes.len());
        for spec in &prefixes {
            match prefix_from_parts(spec.network, spec.netmask) {
                Ok(prefix) => withdrawn.push(prefix),
                Err(err) => {
                    warn!("Dropping withdraw from {}: {}", neighbor, err);
                    return Vec::new();
                }
            }
        }
        info!("{} withdrew {} prefixes", neighbor, withdrawn.len());

        self.rib.withdraw(peer_addr(neighbor.addr), withdrawn);
        self.flood(neighbor, OutboundPayload::Withdraw(prefixes))
    }

    /// Route a data-plane packet by its envelope destination. The frame is
    /// forwarded untouched; we only pick the socket it leaves on.
    fn handle_data(
        &self,
        neighbor: &NeighborConfig,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        frame: &[u8],
    ) -> Vec<Outbound> {
        let route = match self.rib.best_route(dst) {
            Some(route) => route,
            None => {
                debug!("No route to {} for data from {}", dst, neighbor);
                let reply = OutboundEnvelope {
                    src: self_addr(neighbor.addr),
                    dst: src,
                    payload: OutboundPayload::NoRoute(EmptyMsg {}),
                };
                return vec![Outbound {
                    to: neighbor.addr,
                    frame: reply.to_frame(),
                }];
            }
        };
        let via = match self.neighbors.for_next_hop(route.next_hop) {
            Some(via) => via,
            None => {
                error!("{} resolves to no configured neighbor", route);
                return Vec::new();
            }
        };
        // Data-plane no-transit rule: someone on this path must pay us
        if neighbor.relation.is_customer() || via.relation.is_customer() {
            trace!("Forwarding data for {} via {}", dst, via);
            vec![Outbound {
                to: via.addr,
                frame: frame.to_vec(),
            }]
        } else {
            debug!(
                "Dropping data for {}: {} to {} has no customer endpoint",
                dst, neighbor.relation, via.relation
            );
            Vec::new()
        }
    }

    fn handle_dump(&self, neighbor: &NeighborConfig, requester: Ipv4Addr) -> Vec<Outbound> {
        let table: Vec<TableEntry> = self.rib.entries().iter().map(TableEntry::from).collect();
        debug!("Dumping {} routes for {}", table.len(), neighbor);
        let reply = OutboundEnvelope {
            src: self_addr(neighbor.addr),
            dst: requester,
            payload: OutboundPayload::Table(table),
        };
        vec![Outbound {
            to: neighbor.addr,
            frame: reply.to_frame(),
        }]
    }

    /// Re-advertise to every neighbor the export policy allows
    fn flood(&self, from: &NeighborConfig, payload: OutboundPayload) -> Vec<Outbound> {
        self.neighbors
            .iter()
            .filter(|n| n.addr != from.addr)
            .filter(|n| export_allowed(from.relation, n.relation))
            .map(|n| Outbound {
                to: n.addr,
                frame: OutboundEnvelope::to_neighbor(n.addr, payload.clone()).to_frame(),
            })
            .collect()
    }
}
