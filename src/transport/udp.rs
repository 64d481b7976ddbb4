//! UDP transport for DNS queries.
//!
//! Every datagram is answered in its own task, so a slow upstream lookup
//! for one client never holds up the others.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::resolver::Resolver;

use super::MAX_DNS_PACKET_SIZE;

/// UDP transport for the relay.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the UDP transport.
    ///
    /// Spawns the receive loop, which spawns a handler per datagram.
    pub fn start(self, resolver: Arc<Resolver>) -> JoinHandle<()> {
        tokio::spawn(run(self.socket, resolver))
    }
}

/// Receive loop.
async fn run(socket: Arc<UdpSocket>, resolver: Arc<Resolver>) {
    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "UDP recv error");
                continue;
            }
        };

        if len < 12 {
            continue;
        }

        let query = buf[..len].to_vec();
        tokio::spawn(handle_datagram(
            socket.clone(),
            resolver.clone(),
            query,
            src,
        ));
    }
}

/// Resolve one datagram and send the reply, if any.
async fn handle_datagram(
    socket: Arc<UdpSocket>,
    resolver: Arc<Resolver>,
    query: Vec<u8>,
    src: SocketAddr,
) {
    let Some(response) = resolver.handle_query(&query).await else {
        return;
    };

    if let Err(e) = socket.send_to(&response, src).await {
        error!(error = %e, client = %src, "UDP response error");
    } else {
        debug!(client = %src, len = response.len(), "sent reply");
    }
}
