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

//! One live link to a peer: read loop plus thread-safe write path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::error::LinkError;
use super::framer::LineFramer;
use super::protocol::{InboundMessage, OutboundMessage};
use super::transport::PeerAddress;

/// Read buffer size for the session read loop.
const READ_BUF_SIZE: usize = 1024;

/// Events emitted by the link core.
///
/// Delivered on a single mpsc channel, in the order they occurred. Inbound
/// messages from one session are never reordered. Consumers should hand
/// long-running work off rather than stall the channel.
#[derive(Debug)]
pub enum LinkEvent {
    /// A session was established (inbound accept or outbound dial).
    Connected { peer: Option<PeerAddress> },
    /// The live session died: peer hung up, I/O failure, or frame overflow.
    /// Emitted exactly once per session, and only for unexpected loss -
    /// deliberate supersession or shutdown is silent.
    Disconnected { peer: Option<PeerAddress> },
    /// One decoded inbound frame.
    Inbound(InboundMessage),
    /// A worker or session failed. Never fatal; listening or dialing again
    /// is always possible.
    Error(LinkError),
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A single live logical link.
///
/// Owned by the [`LinkManager`](super::LinkManager); collaborators get
/// short-lived `Arc` handles via `current_session()` and may only send
/// through them. Sending on a dead handle is an error, not a panic.
pub struct Session {
    peer: Option<PeerAddress>,
    writer: Mutex<BoxedWriter>,
    alive: AtomicBool,
    read_task: SyncMutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub(crate) fn new(peer: Option<PeerAddress>, writer: BoxedWriter) -> Arc<Self> {
        Arc::new(Self {
            peer,
            writer: Mutex::new(writer),
            alive: AtomicBool::new(true),
            read_task: SyncMutex::new(None),
        })
    }

    /// The remote endpoint, if known.
    pub fn peer(&self) -> Option<&PeerAddress> {
        self.peer.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Encode and send one outbound command.
    pub async fn send(&self, msg: &OutboundMessage) -> Result<(), LinkError> {
        self.send_raw(&msg.encode()).await
    }

    /// Send a pre-encoded payload.
    ///
    /// Safe to call concurrently with the read loop and from multiple tasks;
    /// writes are serialized on the write half only.
    pub async fn send_raw(&self, payload: &[u8]) -> Result<(), LinkError> {
        if !self.is_alive() {
            return Err(LinkError::NotConnected);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Flip the liveness flag; returns true for the first caller only, so
    /// death is reported exactly once.
    pub(crate) fn mark_dead(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn attach_read_task(&self, handle: JoinHandle<()>) {
        if !self.is_alive() {
            // Closed between install and attach; stop the loop now.
            handle.abort();
            return;
        }
        *self.read_task.lock() = Some(handle);
    }

    /// Close the session. Idempotent.
    ///
    /// Aborting the read task drops the read half, which unblocks and closes
    /// the inbound side immediately; the write half is shut down best-effort
    /// in the background. A deliberate close emits no event.
    pub(crate) fn close(self: &Arc<Self>) {
        self.mark_dead();
        if let Some(handle) = self.read_task.lock().take() {
            handle.abort();
        }
        let session = self.clone();
        tokio::spawn(async move {
            let mut writer = session.writer.lock().await;
            let _ = writer.shutdown().await;
        });
    }
}

/// Session read loop: read, frame, decode, emit - until EOF or failure.
///
/// Returns the failure that ended the loop, or `None` for a clean EOF (the
/// trailing partial frame, if any, is discarded either way).
pub(crate) async fn read_loop<R>(
    mut reader: R,
    mut framer: LineFramer,
    event_tx: mpsc::Sender<LinkEvent>,
) -> Option<LinkError>
where
    R: AsyncRead + Send + Unpin,
{
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                info!("connection closed by peer");
                return None;
            }
            Ok(n) => match framer.push(&buf[..n]) {
                Ok(frames) => {
                    for frame in frames {
                        debug!("frame received: {}", frame);
                        let msg = InboundMessage::decode(&frame);
                        if event_tx.send(LinkEvent::Inbound(msg)).await.is_err() {
                            // Nobody is listening anymore; stop quietly.
                            return None;
                        }
                    }
                }
                Err(e) => {
                    error!("framing error: {}", e);
                    return Some(e);
                }
            },
            Err(e) => {
                error!("read error: {}", e);
                return Some(LinkError::Io(e));
            }
        }
    }
}
