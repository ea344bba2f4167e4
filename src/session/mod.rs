use std::collections::HashMap;
use std::error;
use std::fmt;
use std::io;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use futures::future::select_all;
use log::{debug, info, trace};
use tokio::net::UdpSocket;

use crate::config::{NeighborConfig, Relation, RouterConfig};
use crate::handler::Outbound;
use crate::utils::elapsed_since;

// One UDP datagram
const MAX_FRAME: usize = 65_535;

#[derive(Debug)]
pub enum SessionError {
    /// Frame addressed to a neighbor with no session. [address]
    UnknownNeighbor(Ipv4Addr),
    /// Something happened in transport. [reason]
    TransportError(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Session Error: ")?;
        match self {
            SessionError::UnknownNeighbor(addr) => write!(f, "No session for {}", addr),
            SessionError::TransportError(reason) => write!(f, "Transport error [{}]", reason),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::TransportError(error.to_string())
    }
}

impl From<SessionError> for io::Error {
    fn from(error: SessionError) -> Self {
        io::Error::new(io::ErrorKind::Other, error.to_string())
    }
}

impl error::Error for SessionError {}

/// One neighbor's datagram socket, held for the process lifetime
pub struct Session {
    pub addr: Ipv4Addr,
    pub relation: Relation,
    socket: UdpSocket,
    connect_time: DateTime<Utc>,
    // Frames seen on this socket, for the status line
    frames_in: u64,
    frames_out: u64,
}

impl Session {
    /// Bind an ephemeral local port and point the socket at the
    /// neighbor's port
    pub async fn open(config: &NeighborConfig) -> Result<Self, SessionError> {
        let socket = UdpSocket::bind(("127.0.0.1", 0)).await?;
        socket.connect(("127.0.0.1", config.port)).await?;
        debug!(
            "Opened session with {} from {}",
            config,
            socket.local_addr()?
        );
        Ok(Session {
            addr: config.addr,
            relation: config.relation,
            socket,
            connect_time: Utc::now(),
            frames_in: 0,
            frames_out: 0,
        })
    }

    async fn recv(&self) -> Result<(Ipv4Addr, Vec<u8>), SessionError> {
        let mut buf = vec![0u8; MAX_FRAME];
        let len = self.socket.recv(&mut buf).await?;
        buf.truncate(len);
        Ok((self.addr, buf))
    }

    async fn send(&self, frame: &[u8]) -> Result<(), SessionError> {
        self.socket.send(frame).await?;
        Ok(())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Session {} ({}) uptime={} rx={} tx={}>",
            self.addr,
            self.relation,
            elapsed_since(self.connect_time),
            self.frames_in,
            self.frames_out,
        )
    }
}

/// All neighbor sessions; the reactor waits here for the next datagram
pub struct SessionManager {
    sessions: HashMap<Ipv4Addr, Session>,
}

impl SessionManager {
    pub async fn connect(config: &RouterConfig) -> Result<Self, SessionError> {
        let mut sessions = HashMap::with_capacity(config.neighbors.len());
        for neighbor in &config.neighbors {
            let session = Session::open(neighbor).await?;
            sessions.insert(session.addr, session);
        }
        info!("Opened {} neighbor sessions", sessions.len());
        Ok(SessionManager { sessions })
    }

    /// Wait until any neighbor socket is readable and read one datagram
    pub async fn recv_frame(&mut self) -> Result<(Ipv4Addr, Vec<u8>), SessionError> {
        let (result, ..) = {
            let pending: Vec<_> = self
                .sessions
                .values()
                .map(|session| Box::pin(session.recv()))
                .collect();
            select_all(pending).await
        };
        let (addr, frame) = result?;
        if let Some(session) = self.sessions.get_mut(&addr) {
            session.frames_in += 1;
            trace!("{} bytes from {}", frame.len(), session);
        }
        Ok((addr, frame))
    }

    pub async fn send(&mut self, outbound: &Outbound) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&outbound.to)
            .ok_or(SessionError::UnknownNeighbor(outbound.to))?;
        session.send(&outbound.frame).await?;
        session.frames_out += 1;
        trace!("{} bytes to {}", outbound.frame.len(), session);
        Ok(())
    }
}
