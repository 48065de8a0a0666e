//! Protocol surface shared with the transport layer.
//!
//! The core never frames or parses packets; it hands the transport a
//! [`Notification`] (a closed sum type, one variant per outbound action) and
//! receives already-routed inbound actions. `encode`/`decode` are the
//! serialization helpers the transport writers call when draining outboxes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entity::{EntityId, EntityKind, PlayerId, Position, SessionId, Statistic};

/// Wire action identifiers, shared with clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionKind {
    Unknown = 0,
    Error = 1,
    Identify = 2,
    Move = 3,
    Position = 4,
    Join = 5,
    Leave = 6,
    Spawn = 7,
    Shoot = 8,
    Death = 9,
    Create = 10,
    Start = 11,
    Stop = 12,
    Statistic = 13,
    NextWave = 14,
    GodMode = 15,
}

/// Which delivery channel a notification rides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Reliable,
    Unreliable,
}

/// Shared end-of-match result, sent identically to every player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Lose,
    Win,
}

/// One queued entity position, flushed in batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
}

/// Everything the server pushes to clients. One variant per action kind, so
/// each notifier supplies exactly the payload shape the action requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// Ack to the creator of a new session, carrying its id
    Created { session_id: SessionId },
    /// A player joined the recipient's session
    Joined { player_id: PlayerId },
    /// A player left the recipient's session
    Left { player_id: PlayerId },
    /// An entity appeared
    Spawned {
        id: EntityId,
        kind: EntityKind,
        position: Position,
    },
    /// An entity (or player character) is gone
    Died { id: EntityId, kind: EntityKind },
    /// Batched entity positions for this tick
    Positions(Vec<PositionUpdate>),
    /// A timed statistic switched on or off for a player
    Statistic {
        player_id: PlayerId,
        statistic: Statistic,
        active: bool,
    },
    /// The match started; every player's starting position
    Started { positions: Vec<(PlayerId, Position)> },
    /// The match ended with a shared outcome
    Stopped { outcome: MatchOutcome },
    /// The session advanced to the next wave
    NextWave,
}

impl Notification {
    pub fn action(&self) -> ActionKind {
        match self {
            Notification::Created { .. } => ActionKind::Create,
            Notification::Joined { .. } => ActionKind::Join,
            Notification::Left { .. } => ActionKind::Leave,
            Notification::Spawned { .. } => ActionKind::Spawn,
            Notification::Died { .. } => ActionKind::Death,
            Notification::Positions(_) => ActionKind::Position,
            Notification::Statistic { .. } => ActionKind::Statistic,
            Notification::Started { .. } => ActionKind::Start,
            Notification::Stopped { .. } => ActionKind::Stop,
            Notification::NextWave => ActionKind::NextWave,
        }
    }

    /// Position batches are churn, delivered unreliably; everything else is
    /// state the client must not miss.
    pub fn transport(&self) -> Transport {
        match self {
            Notification::Positions(_) => Transport::Unreliable,
            _ => Transport::Reliable,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Serialize a notification for the wire.
pub fn encode(notification: &Notification) -> Result<Vec<u8>, ProtocolError> {
    Ok(bincode::serde::encode_to_vec(
        notification,
        bincode::config::standard(),
    )?)
}

/// Deserialize a notification from the wire (used by test clients).
pub fn decode(bytes: &[u8]) -> Result<Notification, ProtocolError> {
    let (notification, _) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(notification)
}
