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

//! Controller-side link core for a grid-navigation robot.
//!
//! Sits between raw RFCOMM sockets and the application: arbitrates between
//! listening for an inbound peer and dialing a known one, owns at most one
//! live session, frames the byte stream on newlines, and classifies frames
//! into typed messages. Consumers receive decoded messages and connection
//! status on an event channel and submit outbound commands through the
//! current session handle.

pub mod bluetooth;
pub mod config;

pub use bluetooth::{
    ConnectionRole, Direction, Facing, InboundMessage, LinkError, LinkEvent, LinkManager,
    Obstacle, OutboundMessage, PeerAddress, Session,
};
pub use config::Config;
