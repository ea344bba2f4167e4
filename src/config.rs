use std::fmt;
use std::net::{AddrParseError, Ipv4Addr};
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;

use crate::utils::ParseError;

/// Commercial relationship with a neighbor, controls export policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Customer,
    Peer,
    Provider,
}

impl Relation {
    pub fn is_customer(self) -> bool {
        self == Relation::Customer
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Relation::*;
        let word = match self {
            Customer => "customer",
            Peer => "peer",
            Provider => "provider",
        };
        write!(f, "{}", word)
    }
}

impl FromStr for Relation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cust" | "customer" => Ok(Relation::Customer),
            "peer" => Ok(Relation::Peer),
            "prov" | "provider" => Ok(Relation::Provider),
            _ => Err(ParseError::new(format!("Unsupported relation: '{}'", s))),
        }
    }
}

/// One neighbor as given on the command line: `<port>-<addr>-<relation>`
///   e.g. `7834-192.168.0.2-cust`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborConfig {
    // UDP port the neighbor listens on
    pub port: u16,
    // The neighbor's address, also its identity in the registry
    pub addr: Ipv4Addr,
    pub relation: Relation,
}

impl FromStr for NeighborConfig {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (port, addr, relation) = match (parts.next(), parts.next(), parts.next()) {
            (Some(port), Some(addr), Some(relation)) => (port, addr, relation),
            _ => {
                return Err(ParseError::new(format!(
                    "Not a valid neighbor descriptor: '{}'",
                    s
                )))
            }
        };
        let port: u16 = port
            .parse()
            .map_err(|err: ParseIntError| ParseError::new(format!("{} '{}'", err, s)))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|err: AddrParseError| ParseError::new(format!("{} '{}'", err, s)))?;
        let relation = relation.parse()?;
        Ok(NeighborConfig {
            port,
            addr,
            relation,
        })
    }
}

impl fmt::Display for NeighborConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.addr, self.relation)
    }
}

#[derive(Debug)]
pub struct RouterConfig {
    pub local_as: u32,
    pub neighbors: Vec<Arc<NeighborConfig>>,
}

impl RouterConfig {
    pub fn new(local_as: u32, descriptors: &[String]) -> Result<Self, ParseError> {
        let neighbors = descriptors
            .iter()
            .map(|d| d.parse().map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouterConfig {
            local_as,
            neighbors,
        })
    }
}
