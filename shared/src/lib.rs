//! # Shared Protocol Library
//!
//! This crate contains everything both sides of the robot guidance protocol
//! agree on: the wire literals exchanged between server and robot, the byte
//! budgets each client message must respect, the authentication keys, and the
//! grid primitives (`Position`, `Heading`) used to track a robot on the 2D
//! integer plane.
//!
//! ## Wire format
//!
//! Every message is a payload followed by the two-byte terminator
//! `\a\b` (0x07 0x08). Payloads are plain text on the server side; client
//! payloads are treated as raw bytes because usernames and secrets may carry
//! anything. The per-message payload caps in this crate exclude the
//! terminator.
//!
//! ## Authentication
//!
//! Both ends derive a 16-bit confirmation code from the username:
//! the truncating 16-bit sum of its raw bytes, multiplied by 1000 and offset
//! by a side-specific key, everything modulo 65536. See [`confirmation_hash`].
//!
//! ## Grid model
//!
//! The robot occupies integer coordinates with `y` growing upward. A
//! [`Heading`] is one of the four cardinal directions; rotations and the
//! direction-between-two-cells inference live here so that the server and any
//! simulated robot share one definition of the geometry.

use std::fmt;
use std::time::Duration;

/// Command ordering the robot one cell forward.
pub const SERVER_MOVE: &str = "102 MOVE";
/// Command rotating the robot 90° counterclockwise.
pub const SERVER_TURN_LEFT: &str = "103 TURN LEFT";
/// Command rotating the robot 90° clockwise.
pub const SERVER_TURN_RIGHT: &str = "104 TURN RIGHT";
/// Command asking the robot to pick up the message on its cell.
pub const SERVER_PICK_UP: &str = "105 GET MESSAGE";
/// Final command releasing the robot; no response is expected.
pub const SERVER_LOGOUT: &str = "106 LOGOUT";
/// Positive acknowledgement of a completed authentication.
pub const SERVER_OK: &str = "200 OK";
/// Sent when the client's confirmation code does not match.
pub const SERVER_LOGIN_FAILED: &str = "300 LOGIN FAILED";
/// Sent when a client message is malformed or over its byte budget.
pub const SERVER_SYNTAX_ERROR: &str = "301 SYNTAX ERROR";
/// Sent when the client violates the protocol state machine.
pub const SERVER_LOGIC_ERROR: &str = "302 LOGIC ERROR";

/// Marker opening a recharging pause.
pub const CLIENT_RECHARGING: &[u8] = b"RECHARGING";
/// Marker closing a recharging pause.
pub const CLIENT_FULL_POWER: &[u8] = b"FULL POWER";

/// First byte of the message terminator (`\a`).
pub const TERM_FIRST: u8 = 0x07;
/// Second byte of the message terminator (`\b`).
pub const TERM_SECOND: u8 = 0x08;

/// Key mixed into the hash the server announces.
pub const SERVER_KEY: u16 = 54621;
/// Key mixed into the hash the client must confirm with.
pub const CLIENT_KEY: u16 = 45328;

/// Payload cap for the username message.
pub const MAX_USERNAME_LEN: usize = 18;
/// Payload cap for the client confirmation code.
pub const MAX_CONFIRMATION_LEN: usize = 5;
/// Payload cap for a move/turn confirmation (`OK x y`).
pub const MAX_OK_LEN: usize = 10;
/// Payload cap for the recharging markers (`RECHARGING` / `FULL POWER`).
pub const MAX_FULL_POWER_LEN: usize = 10;
/// Payload cap for the picked-up secret message.
pub const MAX_SECRET_LEN: usize = 98;

/// Receive timeout applied to ordinary reads.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);
/// Extended receive timeout while waiting for `FULL POWER`.
pub const RECHARGING_TIMEOUT: Duration = Duration::from_secs(5);

/// Cell where the search for the secret begins; also the top-left corner of
/// the 5×5 patch swept when the secret is not found there.
pub const TARGET: Position = Position::new(-2, 2);

/// A cell on the 2D integer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in the given direction.
    pub fn stepped(self, heading: Heading) -> Self {
        let (dx, dy) = heading.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal direction a robot can face.
///
/// `Up` is the direction of growing `y`, `Right` of growing `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Up,
    Right,
    Down,
    Left,
}

impl Heading {
    /// Heading after a 90° counterclockwise rotation.
    pub fn turned_left(self) -> Self {
        match self {
            Heading::Up => Heading::Left,
            Heading::Left => Heading::Down,
            Heading::Down => Heading::Right,
            Heading::Right => Heading::Up,
        }
    }

    /// Heading after a 90° clockwise rotation.
    pub fn turned_right(self) -> Self {
        match self {
            Heading::Up => Heading::Right,
            Heading::Right => Heading::Down,
            Heading::Down => Heading::Left,
            Heading::Left => Heading::Up,
        }
    }

    /// Unit grid delta of one step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::Up => (0, 1),
            Heading::Right => (1, 0),
            Heading::Down => (0, -1),
            Heading::Left => (-1, 0),
        }
    }

    /// Direction of the motion from `from` to `to`, if the motion followed
    /// exactly one axis. Returns `None` when both coordinates changed (a
    /// diagonal jump no well-behaved robot performs) or when the positions
    /// are equal.
    pub fn between(from: Position, to: Position) -> Option<Self> {
        if from.x == to.x && from.y != to.y {
            Some(if to.y > from.y { Heading::Up } else { Heading::Down })
        } else if from.y == to.y && from.x != to.x {
            Some(if to.x > from.x { Heading::Right } else { Heading::Left })
        } else {
            None
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heading::Up => "up",
            Heading::Right => "right",
            Heading::Down => "down",
            Heading::Left => "left",
        };
        f.write_str(name)
    }
}

/// Confirmation code for a username under the given key.
///
/// The sum of the raw username bytes is accumulated in 16 bits, multiplied by
/// 1000 and offset by the key, with every operation truncating modulo 65536.
/// The function is pure; both sides evaluate it independently and compare
/// results.
pub fn confirmation_hash(key: u16, username: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    for &byte in username {
        sum = sum.wrapping_add(u16::from(byte));
    }
    sum.wrapping_mul(1000).wrapping_add(key)
}
