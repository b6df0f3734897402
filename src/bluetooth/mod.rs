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

//! Bluetooth link core.
//!
//! Connection lifecycle (listen/dial arbitration, single live session) and
//! the wire protocol between controller and robot.

mod dialer;
mod error;
mod framer;
mod listener;
mod manager;
mod memory;
mod protocol;
mod rfcomm;
mod session;
mod transport;

pub use error::LinkError;
pub use framer::{LineFramer, DEFAULT_MAX_FRAME_BYTES};
pub use manager::{ConnectionRole, LinkManager};
pub use memory::{MemoryHub, MemoryListener, MemoryTransport};
pub use protocol::{Direction, Facing, InboundMessage, Obstacle, OutboundMessage};
pub use rfcomm::{PairedDevice, RfcommTransport, DEFAULT_CHANNEL, SPP_UUID};
pub use session::{LinkEvent, Session};
pub use transport::{LinkTransport, PeerAddress};
