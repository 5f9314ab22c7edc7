//! Identity types, money, and the top-level wire envelope.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::game::{ClientRequest, ServerResponse};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's stable external identity.
///
/// The id comes from the identity source (a chat platform user id, an
/// account id, ...) and is opaque to the game. It serializes as a plain
/// string thanks to `#[serde(transparent)]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Wraps anything string-like as a `PlayerId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a single round.
///
/// Round ids double as the settlement idempotence key: the ledger applies
/// at most one balance change and one record per round id, so they must be
/// unique across process restarts. The round engine fills them with 128
/// random bits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub String);

impl RoundId {
    /// Wraps an already-generated id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A signed quantity of money in minor units (hundredths).
///
/// Balances, stakes, and profits are all `Amount`s. Integer minor units
/// keep ledger arithmetic exact: two concurrent settlements of `d1` and
/// `d2` always sum to exactly `d1 + d2`.
///
/// On the wire an `Amount` is the bare minor-unit integer, so `20.00` is
/// sent as `2000`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub i64);

impl Amount {
    /// Minor units per whole unit.
    pub const MINOR_PER_UNIT: i64 = 100;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Builds an amount from whole units: `from_units(20)` is `20.00`.
    pub const fn from_units(units: i64) -> Self {
        Self(units * Self::MINOR_PER_UNIT)
    }

    /// Builds an amount from minor units: `from_minor(2050)` is `20.50`.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw minor-unit count.
    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a real factor, rounding half away from zero to the
    /// nearest minor unit.
    ///
    /// Used to turn `stake × (multiplier − 1)` into a profit. The result
    /// depends only on the inputs, so the same round always produces the
    /// same profit.
    pub fn scale(self, factor: f64) -> Self {
        Self((self.0 as f64 * factor).round() as i64)
    }

    /// Adds, returning `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

// The operators saturate at the `i64` bounds. Balances and totals go
// through `checked_add` so overflow is reported instead.

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Prints `-20.00`, `36.01`, `0.05`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = Self::MINOR_PER_UNIT as u64;
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

// ---------------------------------------------------------------------------
// SystemMessage: connection plumbing
// ---------------------------------------------------------------------------

/// Connection-level messages handled by the server itself.
///
/// Internally tagged (`#[serde(tag = "type")]`), so a heartbeat looks like
/// `{ "type": "Heartbeat", "client_time": 1200 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server: first message on every connection. `token` is
    /// handed to the authenticator to resolve the player's identity.
    Handshake { version: u32, token: Option<String> },

    /// Server → Client: the player is registered and connected. Carries
    /// the current balance so the client can render it immediately.
    HandshakeAck {
        player_id: PlayerId,
        balance: Amount,
        server_time: u64,
    },

    /// Either direction: the connection is about to close.
    Disconnect { reason: String },

    /// Client → Server keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client keep-alive reply, echoing `client_time` for RTT.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Server → Client: the previous message was rejected. `code` follows
    /// HTTP conventions (400, 401, 402, 404, 409, 503).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// What an envelope carries.
///
/// Adjacently tagged, e.g.
/// `{ "type": "Request", "data": { "type": "Reveal", "cell": 4 } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Connection plumbing.
    System(SystemMessage),
    /// A game or ledger request from the client.
    Request(ClientRequest),
    /// The server's answer to a request.
    Response(ServerResponse),
}

/// Every message on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-side sequence number.
    pub seq: u64,
    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,
    pub payload: Payload,
}
