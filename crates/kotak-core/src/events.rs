//! Match events and their outbound envelopes.
//!
//! Every accepted state transition produces exactly one event. The hosting
//! layer publishes the corresponding [`EventEnvelope`] on a single channel
//! after the transition has committed; consumers fan each envelope out to
//! subscribers of its room without interpreting the payload.

use crate::game::{MatchSnapshot, MoveOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Routing key for lobby-wide events
pub const LOBBY_ROOM: &str = "lobby";

/// Routing key for one match's room
pub fn match_room(id: Uuid) -> String {
    format!("match:{}", id)
}

/// Events produced by accepted match transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A match was created and is waiting for an opponent
    MatchCreated { state: MatchSnapshot },
    /// The second seat was filled and play began
    MatchJoined { state: MatchSnapshot },
    /// A move was accepted and the match continues
    MovePlayed {
        match_id: Uuid,
        outcome: MoveOutcome,
    },
    /// A move was accepted and ended the match
    MatchFinished { state: MatchSnapshot },
}

impl MatchEvent {
    /// Wire name of the event kind
    pub fn name(&self) -> &'static str {
        match self {
            MatchEvent::MatchCreated { .. } => "match.created",
            MatchEvent::MatchJoined { .. } => "match.joined",
            MatchEvent::MovePlayed { .. } => "move.played",
            MatchEvent::MatchFinished { .. } => "match.finished",
        }
    }

    /// Room this event is routed to: creations go to the lobby, everything
    /// else to the match's own room.
    pub fn room(&self) -> String {
        match self {
            MatchEvent::MatchCreated { .. } => LOBBY_ROOM.to_string(),
            MatchEvent::MatchJoined { state } | MatchEvent::MatchFinished { state } => {
                match_room(state.id)
            }
            MatchEvent::MovePlayed { match_id, .. } => match_room(*match_id),
        }
    }

    /// Build the outbound notification record for this event.
    pub fn envelope(&self) -> EventEnvelope {
        let data = match self {
            MatchEvent::MatchCreated { state }
            | MatchEvent::MatchJoined { state }
            | MatchEvent::MatchFinished { state } => {
                serde_json::to_value(state).unwrap_or(Value::Null)
            }
            MatchEvent::MovePlayed { match_id, outcome } => serde_json::json!({
                "match_id": match_id,
                "edge": outcome.edge,
                "completed_cells": outcome.completed_cells,
                "next_turn": outcome.next_turn,
            }),
        };

        EventEnvelope {
            event: self.name().to_string(),
            data,
            room: self.room(),
        }
    }
}

/// Outbound notification record handed to the event bus: a name, a JSON
/// payload, and the room it is delivered to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    pub data: Value,
    pub room: String,
}
