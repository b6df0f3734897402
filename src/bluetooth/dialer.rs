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

//! Connect role worker: dial one specific peer, hand over.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::manager::LinkManager;
use super::session::LinkEvent;
use super::transport::{LinkTransport, PeerAddress};

/// Spawn the connect worker for `peer`.
///
/// Asks the transport to stop any device scan first - an active scan slows
/// the connection attempt down considerably. Failure is reported once and
/// never retried here; cancellation (task abort) drops the half-open socket
/// silently.
pub(crate) fn spawn<T: LinkTransport>(
    transport: Arc<T>,
    manager: Weak<LinkManager<T>>,
    event_tx: mpsc::Sender<LinkEvent>,
    worker_id: u64,
    peer: PeerAddress,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        transport.stop_discovery().await;

        info!("dialing {}", peer);
        match transport.dial(&peer).await {
            Ok(stream) => {
                if let Some(manager) = manager.upgrade() {
                    manager.on_connected(stream, Some(peer), worker_id);
                }
            }
            Err(e) => {
                warn!("dial failed: {}", e);
                let _ = event_tx.send(LinkEvent::Error(e)).await;
                if let Some(manager) = manager.upgrade() {
                    manager.worker_failed(worker_id);
                }
            }
        }
    })
}
