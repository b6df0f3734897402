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

//! Wire message model and codec.
//!
//! Inbound frames are comma-separated text with a leading tag; outbound
//! commands are one-line JSON objects of the form `{"cat": ..., "value": ...}`.
//! No integrity check is applied in either direction (trusted peer).

use serde::Serialize;

/// Inbound frame tags recognized by the decoder.
const TAG_STATUS: &str = "STATUS";
const TAG_TARGET: &str = "TARGET";
const TAG_ROBOT: &str = "ROBOT";

/// Outbound command categories.
const CAT_CONTROL: &str = "control";
const CAT_OBSTACLES: &str = "obstacles";

/// A decoded message from the robot.
///
/// Every variant keeps the original frame text for diagnostics. Unrecognized
/// or malformed frames decode to [`InboundMessage::Plain`], so decoding is
/// total. The [`InboundMessage::Custom`] variant is never produced by
/// [`InboundMessage::decode`]; it exists so applications can introduce new
/// wire tags without reopening this set, and consumers must treat it with a
/// wildcard arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// `STATUS,<text>` - a status update, e.g. `running` or `finished`.
    Status { text: String, raw: String },
    /// `TARGET,<obstacle id>,<target id>` - image recognition result.
    TargetFound {
        obstacle_id: u32,
        target_id: u32,
        raw: String,
    },
    /// `ROBOT,<x>,<y>,<direction>` - current robot pose on the grid.
    Position {
        x: i32,
        y: i32,
        direction: i32,
        raw: String,
    },
    /// Catch-all for anything the decoder does not recognize.
    Plain { raw: String },
    /// Escape hatch for application-defined tags.
    Custom {
        tag: String,
        fields: Vec<String>,
        raw: String,
    },
}

impl InboundMessage {
    /// Decode one delimiter-complete frame.
    ///
    /// Total: any input yields some message. Malformed numeric fields fall
    /// back to [`InboundMessage::Plain`] instead of failing, so a misbehaving
    /// peer can never kill the read loop.
    pub fn decode(frame: &str) -> Self {
        let plain = || Self::Plain {
            raw: frame.to_string(),
        };

        let fields: Vec<&str> = frame.split(',').collect();
        if fields.len() < 2 {
            return plain();
        }

        match fields[0] {
            TAG_STATUS => Self::Status {
                text: fields[1..].join(","),
                raw: frame.to_string(),
            },
            TAG_TARGET if fields.len() == 3 => {
                match (fields[1].parse(), fields[2].parse()) {
                    (Ok(obstacle_id), Ok(target_id)) => Self::TargetFound {
                        obstacle_id,
                        target_id,
                        raw: frame.to_string(),
                    },
                    _ => plain(),
                }
            }
            TAG_ROBOT if fields.len() == 4 => {
                match (fields[1].parse(), fields[2].parse(), fields[3].parse()) {
                    (Ok(x), Ok(y), Ok(direction)) => Self::Position {
                        x,
                        y,
                        direction,
                        raw: frame.to_string(),
                    },
                    _ => plain(),
                }
            }
            _ => plain(),
        }
    }

    /// The original frame text.
    pub fn raw(&self) -> &str {
        match self {
            Self::Status { raw, .. }
            | Self::TargetFound { raw, .. }
            | Self::Position { raw, .. }
            | Self::Plain { raw }
            | Self::Custom { raw, .. } => raw,
        }
    }
}

/// A movement command for manual robot control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    TurnLeft,
    TurnRight,
}

impl Direction {
    /// Wire token understood by the robot.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Forward => "f",
            Self::Reverse => "r",
            Self::TurnLeft => "tl",
            Self::TurnRight => "tr",
        }
    }

    /// Parse a wire token.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "f" => Some(Self::Forward),
            "r" => Some(Self::Reverse),
            "tl" => Some(Self::TurnLeft),
            "tr" => Some(Self::TurnRight),
            _ => None,
        }
    }
}

/// Which side of an obstacle the target image is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Facing {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "W")]
    West,
}

/// One obstacle placed on the navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Obstacle {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub facing: Facing,
}

/// An outbound command to the robot.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Manual movement.
    Move(Direction),
    /// Start the navigation run.
    Start,
    /// The full obstacle layout for path planning.
    Obstacles(Vec<Obstacle>),
}

impl OutboundMessage {
    /// Encode to a newline-terminated wire frame.
    ///
    /// Total over all variants; there is no outbound decode.
    pub fn encode(&self) -> Vec<u8> {
        let frame = match self {
            Self::Move(direction) => serde_json::json!({
                "cat": CAT_CONTROL,
                "value": direction.token(),
            }),
            Self::Start => serde_json::json!({
                "cat": CAT_CONTROL,
                "value": "start",
            }),
            Self::Obstacles(entries) => serde_json::json!({
                "cat": CAT_OBSTACLES,
                "value": entries,
            }),
        };

        let mut bytes = frame.to_string().into_bytes();
        bytes.push(b'\n');
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status() {
        let msg = InboundMessage::decode("STATUS,finished");
        assert_eq!(
            msg,
            InboundMessage::Status {
                text: "finished".to_string(),
                raw: "STATUS,finished".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_status_keeps_embedded_commas() {
        let msg = InboundMessage::decode("STATUS,looking for target, slowly");
        match msg {
            InboundMessage::Status { text, .. } => {
                assert_eq!(text, "looking for target, slowly");
            }
            other => panic!("expected Status, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_target() {
        let msg = InboundMessage::decode("TARGET,5,23");
        assert_eq!(
            msg,
            InboundMessage::TargetFound {
                obstacle_id: 5,
                target_id: 23,
                raw: "TARGET,5,23".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_position() {
        let msg = InboundMessage::decode("ROBOT,3,4,2");
        assert_eq!(
            msg,
            InboundMessage::Position {
                x: 3,
                y: 4,
                direction: 2,
                raw: "ROBOT,3,4,2".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_plain_fallback() {
        let msg = InboundMessage::decode("hello world");
        assert_eq!(
            msg,
            InboundMessage::Plain {
                raw: "hello world".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_is_total() {
        // Malformed variants of known tags must fall back, never fail.
        for frame in [
            "",
            ",",
            "STATUS",
            "TARGET,abc,1",
            "TARGET,1",
            "TARGET,1,2,3",
            "ROBOT,1,2",
            "ROBOT,x,y,z",
            "UNKNOWN,1,2,3",
            "\u{fffd},\u{fffd}",
        ] {
            let msg = InboundMessage::decode(frame);
            assert_eq!(msg.raw(), frame);
            if frame.contains(',') {
                assert!(
                    matches!(msg, InboundMessage::Plain { .. }),
                    "expected Plain for {:?}, got {:?}",
                    frame,
                    msg
                );
            }
        }
    }

    #[test]
    fn test_encode_start() {
        let bytes = OutboundMessage::Start.encode();
        assert_eq!(*bytes.last().unwrap(), b'\n');

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cat"], "control");
        assert_eq!(value["value"], "start");
    }

    #[test]
    fn test_encode_move() {
        let bytes = OutboundMessage::Move(Direction::TurnLeft).encode();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cat"], "control");
        assert_eq!(value["value"], "tl");
    }

    #[test]
    fn test_encode_obstacles() {
        let msg = OutboundMessage::Obstacles(vec![
            Obstacle {
                id: 1,
                x: 4,
                y: 9,
                facing: Facing::North,
            },
            Obstacle {
                id: 2,
                x: 15,
                y: 0,
                facing: Facing::West,
            },
        ]);

        let bytes = msg.encode();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cat"], "obstacles");
        assert_eq!(value["value"][0]["id"], 1);
        assert_eq!(value["value"][0]["facing"], "N");
        assert_eq!(value["value"][1]["x"], 15);
        assert_eq!(value["value"][1]["facing"], "W");
    }

    #[test]
    fn test_direction_tokens_roundtrip() {
        for direction in [
            Direction::Forward,
            Direction::Reverse,
            Direction::TurnLeft,
            Direction::TurnRight,
        ] {
            assert_eq!(Direction::parse(direction.token()), Some(direction));
        }
        assert_eq!(Direction::parse("forward"), None);
    }
}
