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

//! Transport seam between the link core and the radio.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::LinkError;

/// Opaque identifier of a remote endpoint (hardware address).
///
/// Used as a dialing target and as an identity key; the core never interprets
/// its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

/// A bidirectional serial transport the link can listen on or dial over.
///
/// The production implementation is BlueZ RFCOMM
/// ([`RfcommTransport`](super::RfcommTransport)); tests and demos use the
/// in-process [`MemoryTransport`](super::MemoryTransport).
#[async_trait]
pub trait LinkTransport: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;
    type Listener: Send + 'static;

    /// Register a server-style endpoint under the fixed service identifier.
    async fn bind(&self) -> Result<Self::Listener, LinkError>;

    /// Block until one inbound peer connects.
    async fn accept(
        &self,
        listener: &mut Self::Listener,
    ) -> Result<(Self::Stream, PeerAddress), LinkError>;

    /// Open a socket to a specific known peer.
    async fn dial(&self, peer: &PeerAddress) -> Result<Self::Stream, LinkError>;

    /// One-way notification that an active device scan should stop because a
    /// connect attempt is about to start. Never blocks the dial.
    async fn stop_discovery(&self) {}
}
