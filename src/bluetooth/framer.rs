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

//! Newline framing of the inbound byte stream.

use tracing::warn;

use super::error::LinkError;

/// Default cap on a single buffered frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8192;

/// Splits an arbitrary-chunked byte stream into `\n`-delimited text frames.
///
/// Bytes after the last delimiter stay buffered until the next push, so the
/// emitted frame sequence is independent of how the stream was chunked. A
/// frame handed out is always delimiter-complete; a trailing partial frame at
/// EOF is simply never emitted.
pub struct LineFramer {
    buf: Vec<u8>,
    max_frame: usize,
}

impl LineFramer {
    /// Create a framer that tolerates at most `max_frame` undelimited bytes.
    pub fn new(max_frame: usize) -> Self {
        Self {
            buf: Vec::with_capacity(1024),
            max_frame,
        }
    }

    /// Append newly-read bytes and drain every complete frame.
    ///
    /// Frames are returned with the delimiter (and a lone trailing `\r`)
    /// stripped. If the remainder grows past the cap without a delimiter the
    /// buffer is discarded and [`LinkError::FrameTooLong`] is returned; the
    /// session treats that like an I/O failure.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, LinkError> {
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let mut frame: Vec<u8> = self.buf.drain(..=idx).collect();
            frame.pop();
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }
            frames.push(String::from_utf8_lossy(&frame).into_owned());
        }

        if self.buf.len() > self.max_frame {
            warn!(
                buffered = self.buf.len(),
                limit = self.max_frame,
                "discarding oversized partial frame"
            );
            self.buf.clear();
            return Err(LinkError::FrameTooLong {
                limit: self.max_frame,
            });
        }

        Ok(frames)
    }

    /// Bytes currently buffered waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any buffered partial frame.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut framer = LineFramer::default();
        let frames = framer.push(b"STATUS,finished\n").unwrap();
        assert_eq!(frames, vec!["STATUS,finished"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_two_frames_in_one_push() {
        let mut framer = LineFramer::default();
        let frames = framer.push(b"STATUS,ok\nROBOT,1,1,0\n").unwrap();
        assert_eq!(frames, vec!["STATUS,ok", "ROBOT,1,1,0"]);
    }

    #[test]
    fn test_partial_frame_is_retained() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"STATUS,run").unwrap().is_empty());
        assert_eq!(framer.pending(), 10);

        let frames = framer.push(b"ning\n").unwrap();
        assert_eq!(frames, vec!["STATUS,running"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut framer = LineFramer::default();
        let frames = framer.push(b"STATUS,ok\r\nnext\r\n").unwrap();
        assert_eq!(frames, vec!["STATUS,ok", "next"]);
    }

    #[test]
    fn test_empty_frames_are_preserved() {
        let mut framer = LineFramer::default();
        let frames = framer.push(b"\n\nx\n").unwrap();
        assert_eq!(frames, vec!["", "", "x"]);
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let stream = b"STATUS,ok\nROBOT,3,4,2\nTARGET,1,15\ntrailing";

        let mut whole = LineFramer::default();
        let expected = whole.push(stream).unwrap();

        // Deliver the same stream at every possible split point.
        for split in 0..stream.len() {
            let mut framer = LineFramer::default();
            let mut frames = framer.push(&stream[..split]).unwrap();
            frames.extend(framer.push(&stream[split..]).unwrap());
            assert_eq!(frames, expected, "split at {}", split);
            assert_eq!(framer.pending(), whole.pending());
        }

        // And byte by byte.
        let mut framer = LineFramer::default();
        let mut frames = Vec::new();
        for byte in stream {
            frames.extend(framer.push(&[*byte]).unwrap());
        }
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_overflow_without_delimiter() {
        let mut framer = LineFramer::new(16);
        let err = framer.push(&[b'x'; 32]).unwrap_err();
        assert!(matches!(err, LinkError::FrameTooLong { limit: 16 }));
        // Buffer is discarded so the framer is usable again.
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.push(b"ok\n").unwrap(), vec!["ok"]);
    }

    #[test]
    fn test_complete_frames_drain_before_overflow_check() {
        let mut framer = LineFramer::new(8);
        // A long but delimited frame passes; only the undelimited remainder
        // counts against the cap.
        let frames = framer.push(b"0123456789abcdef\nrest").unwrap();
        assert_eq!(frames, vec!["0123456789abcdef"]);
        assert_eq!(framer.pending(), 4);
    }
}
