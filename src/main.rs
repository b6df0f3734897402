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

//! Console link monitor.
//!
//! Listens for (or dials) the robot, prints decoded telemetry, and turns
//! stdin lines into commands.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use botlink::bluetooth::{
    Direction, InboundMessage, LinkEvent, LinkManager, OutboundMessage, PeerAddress,
    RfcommTransport,
};
use botlink::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("botlink=info".parse().unwrap()),
        )
        .init();

    info!("Starting link monitor v{}...", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Configuration loaded");

    let transport = Arc::new(RfcommTransport::new(config.bluetooth.channel).await?);
    transport.set_name(&config.bluetooth.device_name).await?;
    transport.make_discoverable().await?;
    info!("local adapter address: {}", transport.address().await?);

    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<LinkEvent>(32);
    let manager = LinkManager::new(transport.clone(), config.link.max_frame_bytes, event_tx);

    manager.listen();
    info!("listening for the robot; type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                handle_event(event);
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !handle_command(&manager, &transport, line).await {
                    break;
                }
            }
        }
    }

    manager.shutdown();
    info!("bye");
    Ok(())
}

fn handle_event(event: LinkEvent) {
    match event {
        LinkEvent::Connected { peer } => {
            info!(
                "connected{}",
                peer.map(|p| format!(" to {}", p)).unwrap_or_default()
            );
        }
        LinkEvent::Disconnected { .. } => {
            warn!("connection lost; 'listen' or 'dial <addr>' to reconnect");
        }
        LinkEvent::Inbound(msg) => match msg {
            InboundMessage::Status { text, .. } => info!("robot status: {}", text),
            InboundMessage::TargetFound {
                obstacle_id,
                target_id,
                ..
            } => info!("target {} found on obstacle {}", target_id, obstacle_id),
            InboundMessage::Position { x, y, direction, .. } => {
                info!("robot at ({}, {}) facing {}", x, y, direction)
            }
            other => info!("robot says: {}", other.raw()),
        },
        LinkEvent::Error(e) => error!("link error: {}", e),
    }
}

/// Returns false when the monitor should exit.
async fn handle_command(
    manager: &Arc<LinkManager<RfcommTransport>>,
    transport: &Arc<RfcommTransport>,
    line: &str,
) -> bool {
    let mut parts = line.splitn(2, ' ');
    let verb = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default().trim();

    let sent = match verb {
        "help" => {
            println!("commands: listen | dial <addr> | scan | devices | start | f | r | tl | tr | quit");
            println!("anything else is sent to the robot verbatim");
            return true;
        }
        "quit" | "exit" => return false,
        "listen" => {
            manager.listen();
            return true;
        }
        "dial" => {
            if arg.is_empty() {
                warn!("usage: dial <addr>");
            } else {
                manager.dial(PeerAddress::new(arg));
            }
            return true;
        }
        "scan" => {
            transport.start_discovery();
            return true;
        }
        "devices" => {
            match transport.paired_devices().await {
                Ok(devices) if devices.is_empty() => println!("no paired devices"),
                Ok(devices) => {
                    for device in devices {
                        println!("{}  {}", device.address, device.name);
                    }
                }
                Err(e) => warn!("device listing failed: {}", e),
            }
            return true;
        }
        "start" => manager.send(&OutboundMessage::Start).await,
        _ => match Direction::parse(verb) {
            Some(direction) => manager.send(&OutboundMessage::Move(direction)).await,
            None => match manager.current_session() {
                Some(session) => session.send_raw(format!("{}\n", line).as_bytes()).await,
                None => Err(botlink::bluetooth::LinkError::NotConnected),
            },
        },
    };

    if let Err(e) = sent {
        warn!("not sent: {}", e);
    }
    true
}
