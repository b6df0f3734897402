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

//! Accept role worker: bind, wait for exactly one peer, hand over.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::manager::LinkManager;
use super::session::LinkEvent;
use super::transport::LinkTransport;

/// Spawn the accept worker.
///
/// Single-peer model: the bound endpoint is released as soon as one peer
/// connects. Cancellation (task abort) drops the endpoint without reporting
/// anything - only bind and accept failures become events.
pub(crate) fn spawn<T: LinkTransport>(
    transport: Arc<T>,
    manager: Weak<LinkManager<T>>,
    event_tx: mpsc::Sender<LinkEvent>,
    worker_id: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut endpoint = match transport.bind().await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!("bind failed: {}", e);
                let _ = event_tx.send(LinkEvent::Error(e)).await;
                if let Some(manager) = manager.upgrade() {
                    manager.worker_failed(worker_id);
                }
                return;
            }
        };

        info!("waiting for an inbound peer");
        match transport.accept(&mut endpoint).await {
            Ok((stream, peer)) => {
                // Release the endpoint before handing over; no further
                // inbound connections are accepted.
                drop(endpoint);
                info!("peer connected: {}", peer);
                if let Some(manager) = manager.upgrade() {
                    manager.on_connected(stream, Some(peer), worker_id);
                }
            }
            Err(e) => {
                warn!("accept failed: {}", e);
                let _ = event_tx.send(LinkEvent::Error(e)).await;
                if let Some(manager) = manager.upgrade() {
                    manager.worker_failed(worker_id);
                }
            }
        }
    })
}
