use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rib::RouteEntry;
use crate::utils::self_addr;

/// A received frame. Every message on the wire is a JSON object with
/// `src`, `dst`, `type` and `msg` fields; `type` picks the payload shape.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", content = "msg")]
pub enum Payload {
    #[serde(rename = "handshake")]
    Handshake(Value),
    #[serde(rename = "update")]
    Update(UpdateParams),
    #[serde(rename = "withdraw")]
    Withdraw(Vec<PrefixSpec>),
    // Data payloads are opaque, routing only looks at the envelope dst
    #[serde(rename = "data")]
    Data(Value),
    #[serde(rename = "dump")]
    Dump(Value),
    #[serde(rename = "table")]
    Table(Vec<TableEntry>),
    #[serde(rename = "no route")]
    NoRoute(Value),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Handshake(_) => "handshake",
            Payload::Update(_) => "update",
            Payload::Withdraw(_) => "withdraw",
            Payload::Data(_) => "data",
            Payload::Dump(_) => "dump",
            Payload::Table(_) => "table",
            Payload::NoRoute(_) => "no route",
        }
    }
}

/// A route announcement as received. Attributes are only carried on the
/// first hop; re-advertisements use [`Advertisement`] instead.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct UpdateParams {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    #[serde(rename = "localpref")]
    pub local_pref: u32,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    pub origin: Origin,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Origin {
    IGP,
    EGP,
    UNK,
}

impl Origin {
    fn preference(self) -> u8 {
        match self {
            Origin::IGP => 2,
            Origin::EGP => 1,
            Origin::UNK => 0,
        }
    }
}

impl Ord for Origin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.preference().cmp(&other.preference())
    }
}

impl PartialOrd for Origin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            Origin::IGP => "IGP",
            Origin::EGP => "EGP",
            Origin::UNK => "UNK",
        };
        write!(f, "{}", word)
    }
}

/// One `{network, netmask}` pair from a withdraw payload
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PrefixSpec {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// A RIB entry as presented in a `table` response
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TableEntry {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    // The next hop the entry resolves to
    pub peer: Ipv4Addr,
    #[serde(rename = "localpref")]
    pub local_pref: u32,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
    pub origin: Origin,
}

impl From<&RouteEntry> for TableEntry {
    fn from(entry: &RouteEntry) -> Self {
        TableEntry {
            network: entry.prefix.network(),
            netmask: entry.prefix.mask(),
            peer: entry.next_hop,
            local_pref: entry.local_pref,
            as_path: entry.as_path.clone(),
            self_origin: entry.self_origin,
            origin: entry.origin,
        }
    }
}

/// A re-advertised route. Attributes other than the AS path are not
/// transitive across AS boundaries and are stripped on the way out.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Advertisement {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EmptyMsg {}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "msg")]
pub enum OutboundPayload {
    #[serde(rename = "handshake")]
    Handshake(EmptyMsg),
    #[serde(rename = "update")]
    Update(Advertisement),
    #[serde(rename = "withdraw")]
    Withdraw(Vec<PrefixSpec>),
    #[serde(rename = "table")]
    Table(Vec<TableEntry>),
    #[serde(rename = "no route")]
    NoRoute(EmptyMsg),
}

/// A frame we build ourselves. `src` is always our self-address on the
/// link the frame leaves on.
#[derive(Clone, Debug, Serialize)]
pub struct OutboundEnvelope {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    #[serde(flatten)]
    pub payload: OutboundPayload,
}

impl OutboundEnvelope {
    /// Frame addressed to the neighbor itself (the usual case)
    pub fn to_neighbor(neighbor: Ipv4Addr, payload: OutboundPayload) -> Self {
        OutboundEnvelope {
            src: self_addr(neighbor),
            dst: neighbor,
            payload,
        }
    }

    pub fn to_frame(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("outbound envelope serializes")
    }
}
