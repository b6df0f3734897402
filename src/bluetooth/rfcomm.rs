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

//! BlueZ RFCOMM transport.

use std::io;
use std::str::FromStr;

use async_trait::async_trait;
use bluer::rfcomm::{Listener, SocketAddr, Stream};
use bluer::{Adapter, AdapterEvent, Address};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::LinkError;
use super::transport::{LinkTransport, PeerAddress};

/// Standard SerialPortServiceClass UUID. Not registered with SDP by this
/// transport; both ends assume it together with the fixed channel.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Default RFCOMM channel.
pub const DEFAULT_CHANNEL: u8 = 1;

fn bt_io(err: bluer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// RFCOMM serial transport over the default BlueZ adapter.
pub struct RfcommTransport {
    _session: bluer::Session,
    adapter: Adapter,
    channel: u8,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl RfcommTransport {
    /// Open the default adapter and power it on.
    pub async fn new(channel: u8) -> Result<Self, LinkError> {
        let session = bluer::Session::new().await.map_err(bt_io)?;
        let adapter = session.default_adapter().await.map_err(bt_io)?;
        info!("using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await.map_err(bt_io)? {
            info!("powering on Bluetooth adapter");
            adapter.set_powered(true).await.map_err(bt_io)?;
        }

        Ok(Self {
            _session: session,
            adapter,
            channel,
            scan_task: Mutex::new(None),
        })
    }

    /// Set the advertised device name.
    pub async fn set_name(&self, name: &str) -> Result<(), LinkError> {
        self.adapter
            .set_alias(name.to_string())
            .await
            .map_err(bt_io)?;
        info!("Bluetooth name set to: {}", name);
        Ok(())
    }

    /// Make the adapter discoverable and pairable for inbound peers.
    pub async fn make_discoverable(&self) -> Result<(), LinkError> {
        self.adapter.set_discoverable(true).await.map_err(bt_io)?;
        self.adapter.set_pairable(true).await.map_err(bt_io)?;
        info!("adapter is discoverable and pairable");
        Ok(())
    }

    /// Local adapter address.
    pub async fn address(&self) -> Result<PeerAddress, LinkError> {
        let addr = self.adapter.address().await.map_err(bt_io)?;
        Ok(PeerAddress::new(addr.to_string()))
    }

    /// Start a background device scan, logging discovered addresses.
    ///
    /// The scan runs until [`LinkTransport::stop_discovery`] (called
    /// automatically before every dial) or a replacing scan aborts it.
    pub fn start_discovery(&self) {
        let adapter = self.adapter.clone();
        let task = tokio::spawn(async move {
            match adapter.discover_devices().await {
                Ok(events) => {
                    futures::pin_mut!(events);
                    while let Some(event) = events.next().await {
                        if let AdapterEvent::DeviceAdded(addr) = event {
                            debug!("device discovered: {}", addr);
                        }
                    }
                }
                Err(e) => warn!("device discovery failed: {}", e),
            }
        });

        let mut slot = self.scan_task.lock();
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
        info!("device discovery started");
    }

    /// Devices already paired with this adapter, for the discovery UI.
    pub async fn paired_devices(&self) -> Result<Vec<PairedDevice>, LinkError> {
        let mut devices = Vec::new();
        for addr in self.adapter.device_addresses().await.map_err(bt_io)? {
            let device = self.adapter.device(addr).map_err(bt_io)?;
            if device.is_paired().await.map_err(bt_io)? {
                let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
                devices.push(PairedDevice {
                    address: PeerAddress::new(addr.to_string()),
                    name,
                });
            }
        }
        Ok(devices)
    }
}

#[async_trait]
impl LinkTransport for RfcommTransport {
    type Stream = Stream;
    type Listener = Listener;

    async fn bind(&self) -> Result<Listener, LinkError> {
        let local = SocketAddr::new(Address::any(), self.channel);
        let listener = Listener::bind(local).await.map_err(LinkError::Bind)?;
        // Channel-only bind: no SDP record is published. Peers dial the
        // well-known channel directly; SPP_UUID is the service class both
        // ends assume.
        info!("RFCOMM listening on channel {}", self.channel);
        Ok(listener)
    }

    async fn accept(&self, listener: &mut Listener) -> Result<(Stream, PeerAddress), LinkError> {
        let (stream, remote) = listener.accept().await.map_err(LinkError::Io)?;
        Ok((stream, PeerAddress::new(remote.addr.to_string())))
    }

    async fn dial(&self, peer: &PeerAddress) -> Result<Stream, LinkError> {
        let addr = Address::from_str(peer.as_str()).map_err(|e| LinkError::Dial {
            peer: peer.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;

        let stream = Stream::connect(SocketAddr::new(addr, self.channel))
            .await
            .map_err(|source| LinkError::Dial {
                peer: peer.clone(),
                source,
            })?;
        Ok(stream)
    }

    async fn stop_discovery(&self) {
        let task = self.scan_task.lock().take();
        if let Some(task) = task {
            task.abort();
            info!("device discovery stopped before connect");
        } else {
            debug!("no active discovery to stop");
        }
    }
}

/// A device already paired with the local adapter.
#[derive(Debug, Clone)]
pub struct PairedDevice {
    pub address: PeerAddress,
    pub name: String,
}
