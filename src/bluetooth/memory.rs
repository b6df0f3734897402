// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-process loopback transport for tests and demos.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use super::error::LinkError;
use super::transport::{LinkTransport, PeerAddress};

/// In-memory pipe capacity.
const PIPE_BUF: usize = 4096;

type Incoming = (DuplexStream, PeerAddress);

/// A private radio space: every endpoint created from the same hub can reach
/// every other by address.
#[derive(Default)]
pub struct MemoryHub {
    endpoints: Mutex<HashMap<PeerAddress, mpsc::UnboundedSender<Incoming>>>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create an endpoint with the given local address.
    pub fn endpoint(self: &Arc<Self>, addr: impl Into<PeerAddress>) -> MemoryTransport {
        MemoryTransport {
            addr: addr.into(),
            hub: self.clone(),
        }
    }

    /// Whether an endpoint currently has a live listener registered.
    pub fn is_bound(&self, addr: &PeerAddress) -> bool {
        self.endpoints
            .lock()
            .get(addr)
            .is_some_and(|tx| !tx.is_closed())
    }
}

/// One endpoint in a [`MemoryHub`].
pub struct MemoryTransport {
    addr: PeerAddress,
    hub: Arc<MemoryHub>,
}

impl MemoryTransport {
    pub fn local_address(&self) -> &PeerAddress {
        &self.addr
    }
}

/// Pending inbound connections for a bound endpoint. Dropping it releases
/// the address.
#[derive(Debug)]
pub struct MemoryListener {
    rx: mpsc::UnboundedReceiver<Incoming>,
}

#[async_trait]
impl LinkTransport for MemoryTransport {
    type Stream = DuplexStream;
    type Listener = MemoryListener;

    async fn bind(&self) -> Result<MemoryListener, LinkError> {
        let mut endpoints = self.hub.endpoints.lock();
        if endpoints
            .get(&self.addr)
            .is_some_and(|existing| !existing.is_closed())
        {
            return Err(LinkError::Bind(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("{} already has a listener", self.addr),
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        endpoints.insert(self.addr.clone(), tx);
        Ok(MemoryListener { rx })
    }

    async fn accept(
        &self,
        listener: &mut MemoryListener,
    ) -> Result<(DuplexStream, PeerAddress), LinkError> {
        listener.rx.recv().await.ok_or_else(|| {
            LinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "listener endpoint closed",
            ))
        })
    }

    async fn dial(&self, peer: &PeerAddress) -> Result<DuplexStream, LinkError> {
        let remote = self.hub.endpoints.lock().get(peer).cloned();
        let Some(remote) = remote else {
            return Err(LinkError::Dial {
                peer: peer.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "peer is not listening"),
            });
        };

        let (ours, theirs) = tokio::io::duplex(PIPE_BUF);
        remote
            .send((theirs, self.addr.clone()))
            .map_err(|_| LinkError::Dial {
                peer: peer.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "peer stopped listening"),
            })?;
        Ok(ours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_dial_without_listener_is_refused() {
        let hub = MemoryHub::new();
        let a = hub.endpoint("AA");

        let err = a.dial(&PeerAddress::new("BB")).await.unwrap_err();
        assert!(matches!(err, LinkError::Dial { .. }));
    }

    #[tokio::test]
    async fn test_double_bind_is_rejected() {
        let hub = MemoryHub::new();
        let a1 = hub.endpoint("AA");
        let a2 = hub.endpoint("AA");

        let _listener = a1.bind().await.unwrap();
        let err = a2.bind().await.unwrap_err();
        assert!(matches!(err, LinkError::Bind(_)));
    }

    #[tokio::test]
    async fn test_dropping_listener_releases_address() {
        let hub = MemoryHub::new();
        let a = hub.endpoint("AA");

        let listener = a.bind().await.unwrap();
        assert!(hub.is_bound(&PeerAddress::new("AA")));
        drop(listener);
        assert!(!hub.is_bound(&PeerAddress::new("AA")));
        // And a fresh bind succeeds.
        let _listener = a.bind().await.unwrap();
    }

    #[tokio::test]
    async fn test_connected_pipe_carries_bytes_both_ways() {
        let hub = MemoryHub::new();
        let a = hub.endpoint("AA");
        let b = hub.endpoint("BB");

        let mut listener = a.bind().await.unwrap();
        let mut dialed = b.dial(&PeerAddress::new("AA")).await.unwrap();
        let (mut accepted, remote) = a.accept(&mut listener).await.unwrap();
        assert_eq!(remote, PeerAddress::new("BB"));

        dialed.write_all(b"ping\n").await.unwrap();
        let mut buf = [0u8; 5];
        accepted.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping\n");

        accepted.write_all(b"pong\n").await.unwrap();
        dialed.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong\n");
    }
}
