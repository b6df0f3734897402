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

//! Role arbitration and session lifecycle.
//!
//! The manager owns the only two pieces of mutable shared state in the core:
//! the current role worker (listener or dialer, never both) and the current
//! session (at most one). Lock order is fixed: worker slot before session
//! slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::dialer;
use super::error::LinkError;
use super::framer::LineFramer;
use super::listener;
use super::protocol::OutboundMessage;
use super::session::{self, LinkEvent, Session};
use super::transport::{LinkTransport, PeerAddress};

/// The link's authoritative state. Exactly one value holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Idle,
    Listening,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerKind {
    Listening,
    Dialing,
}

/// The one active role worker: an accept or connect task in flight.
struct RoleWorker {
    id: u64,
    kind: WorkerKind,
    /// Dial target; `None` for a listener.
    peer: Option<PeerAddress>,
    handle: JoinHandle<()>,
}

impl RoleWorker {
    /// Aborting the task drops its in-flight future, which closes whatever
    /// endpoint it was blocked on. A cancelled worker emits no event.
    fn cancel(self) {
        self.handle.abort();
    }
}

/// Arbitrates between the listening and dialing roles and owns the single
/// live [`Session`].
///
/// Public verbs return quickly; all blocking I/O runs on worker tasks.
/// Cancellation is not instantaneous: callers may assume no *new* state is
/// installed until the old occupant has been told to stop, not that it has
/// fully exited.
pub struct LinkManager<T: LinkTransport> {
    transport: Arc<T>,
    max_frame_bytes: usize,
    event_tx: mpsc::Sender<LinkEvent>,
    // Lock order: `worker` before `session`, always.
    worker: Mutex<Option<RoleWorker>>,
    session: Mutex<Option<Arc<Session>>>,
    role: RwLock<ConnectionRole>,
    next_worker_id: AtomicU64,
}

impl<T: LinkTransport> LinkManager<T> {
    pub fn new(
        transport: Arc<T>,
        max_frame_bytes: usize,
        event_tx: mpsc::Sender<LinkEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            max_frame_bytes,
            event_tx,
            worker: Mutex::new(None),
            session: Mutex::new(None),
            role: RwLock::new(ConnectionRole::Idle),
            next_worker_id: AtomicU64::new(1),
        })
    }

    /// Current authoritative state.
    pub fn role(&self) -> ConnectionRole {
        *self.role.read()
    }

    /// Become discoverable and wait for one inbound peer.
    ///
    /// Cancels an active dialer; a no-op while already listening.
    pub fn listen(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if matches!(worker.as_ref(), Some(w) if w.kind == WorkerKind::Listening) {
            debug!("already listening");
            return;
        }
        if let Some(old) = worker.take() {
            info!("cancelling dialer to listen");
            old.cancel();
        }

        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let handle = listener::spawn(
            self.transport.clone(),
            Arc::downgrade(self),
            self.event_tx.clone(),
            id,
        );
        *worker = Some(RoleWorker {
            id,
            kind: WorkerKind::Listening,
            peer: None,
            handle,
        });
        *self.role.write() = ConnectionRole::Listening;
    }

    /// Dial a specific known peer.
    ///
    /// Cancels an active listener; a no-op while already dialing the same
    /// peer. Dialing a different peer replaces the in-flight attempt.
    pub fn dial(self: &Arc<Self>, peer: PeerAddress) {
        let mut worker = self.worker.lock();
        if matches!(
            worker.as_ref(),
            Some(w) if w.kind == WorkerKind::Dialing && w.peer.as_ref() == Some(&peer)
        ) {
            debug!("already dialing {}", peer);
            return;
        }
        if let Some(old) = worker.take() {
            info!("cancelling {:?} worker to dial {}", old.kind, peer);
            old.cancel();
        }

        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let handle = dialer::spawn(
            self.transport.clone(),
            Arc::downgrade(self),
            self.event_tx.clone(),
            id,
            peer.clone(),
        );
        *worker = Some(RoleWorker {
            id,
            kind: WorkerKind::Dialing,
            peer: Some(peer),
            handle,
        });
        *self.role.write() = ConnectionRole::Connecting;
    }

    /// The live session, if connected. A short-lived handle: callers use it
    /// for one send and drop it, they never keep it across state changes.
    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.session
            .lock()
            .clone()
            .filter(|session| session.is_alive())
    }

    /// Encode and send one command through the live session.
    pub async fn send(&self, msg: &OutboundMessage) -> Result<(), LinkError> {
        let session = self.current_session().ok_or(LinkError::NotConnected)?;
        session.send(msg).await
    }

    /// Cancel any role worker and close any live session.
    pub fn shutdown(self: &Arc<Self>) {
        info!("link shutdown");
        {
            let mut worker = self.worker.lock();
            if let Some(old) = worker.take() {
                old.cancel();
            }
        }
        {
            let mut slot = self.session.lock();
            if let Some(old) = slot.take() {
                old.close();
            }
        }
        *self.role.write() = ConnectionRole::Idle;
    }

    /// Completion callback from a successful listener or dialer.
    ///
    /// `via_worker` identifies the caller so it is removed without aborting
    /// itself; a worker with any other id was installed by a concurrent
    /// replace and is cancelled.
    ///
    /// Synchronous: the worker task calling this can be aborted at any await
    /// point, so the install must not contain one. The `Connected` event is
    /// emitted from the read-loop task instead, which also keeps it ahead of
    /// the session's inbound events.
    pub(crate) fn on_connected(
        self: &Arc<Self>,
        stream: T::Stream,
        peer: Option<PeerAddress>,
        via_worker: u64,
    ) {
        {
            let mut worker = self.worker.lock();
            if let Some(active) = worker.take() {
                if active.id != via_worker {
                    active.cancel();
                }
            }
        }

        let (read_half, write_half) = tokio::io::split(stream);
        let new_session = Session::new(peer.clone(), Box::new(write_half));

        {
            let mut slot = self.session.lock();
            if let Some(old) = slot.take() {
                info!("closing superseded session");
                old.close();
            }
            *slot = Some(new_session.clone());
        }
        *self.role.write() = ConnectionRole::Connected;

        let framer = LineFramer::new(self.max_frame_bytes);
        let event_tx = self.event_tx.clone();
        let manager = Arc::downgrade(self);
        let session = new_session.clone();
        let connected_peer = peer.clone();
        let handle = tokio::spawn(async move {
            let _ = event_tx
                .send(LinkEvent::Connected {
                    peer: connected_peer,
                })
                .await;
            let failure = session::read_loop(read_half, framer, event_tx.clone()).await;
            // First reporter wins; a deliberate close already took the flag.
            if session.mark_dead() {
                if let Some(err) = failure {
                    let _ = event_tx.send(LinkEvent::Error(err)).await;
                }
                let _ = event_tx
                    .send(LinkEvent::Disconnected {
                        peer: session.peer().cloned(),
                    })
                    .await;
                if let Some(manager) = manager.upgrade() {
                    manager.forget_session(&session);
                }
            }
        });
        new_session.attach_read_task(handle);

        info!(
            "session established{}",
            peer.as_ref()
                .map(|p| format!(" with {}", p))
                .unwrap_or_default()
        );
    }

    /// Failure callback from a role worker. Ignored if a newer worker has
    /// already taken the slot.
    pub(crate) fn worker_failed(&self, worker_id: u64) {
        let mut worker = self.worker.lock();
        if matches!(worker.as_ref(), Some(w) if w.id == worker_id) {
            *worker = None;
            // Still connected if a prior session survived the failed attempt.
            let connected = self.session.lock().is_some();
            *self.role.write() = if connected {
                ConnectionRole::Connected
            } else {
                ConnectionRole::Idle
            };
        }
    }

    /// Called by the read-loop task when a session dies on its own.
    fn forget_session(&self, dead: &Arc<Session>) {
        let was_current = {
            let mut slot = self.session.lock();
            if matches!(slot.as_ref(), Some(cur) if Arc::ptr_eq(cur, dead)) {
                *slot = None;
                true
            } else {
                false
            }
        };

        if was_current {
            let worker = self.worker.lock();
            *self.role.write() = match worker.as_ref().map(|w| w.kind) {
                Some(WorkerKind::Listening) => ConnectionRole::Listening,
                Some(WorkerKind::Dialing) => ConnectionRole::Connecting,
                None => ConnectionRole::Idle,
            };
        }
    }
}
