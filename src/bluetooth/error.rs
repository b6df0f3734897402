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

//! Link error taxonomy.

use std::io;

use thiserror::Error;

use super::transport::PeerAddress;

/// Failures surfaced by the link core.
///
/// None of these are fatal to the process; the worst case is "no live
/// session", recoverable by listening or dialing again. Worker-task failures
/// are never propagated as panics - they arrive as
/// [`LinkEvent::Error`](super::LinkEvent::Error) on the event channel.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The listener could not register its endpoint.
    #[error("failed to bind listening endpoint: {0}")]
    Bind(#[source] io::Error),

    /// A connect attempt to a specific peer failed. Not retried.
    #[error("failed to reach peer {peer}: {source}")]
    Dial {
        peer: PeerAddress,
        #[source]
        source: io::Error,
    },

    /// Read or write failure on a live session.
    #[error("link i/o error: {0}")]
    Io(#[from] io::Error),

    /// The inbound stream produced too many bytes without a delimiter.
    #[error("inbound frame exceeded {limit} bytes without a delimiter")]
    FrameTooLong { limit: usize },

    /// An outbound submission was made with no live session.
    #[error("no live session")]
    NotConnected,
}
