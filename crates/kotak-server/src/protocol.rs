//! WebSocket protocol messages for the Kotak service.

use kotak_core::{MatchSnapshot, MoveOutcome, Orientation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new match; grid size defaults to 3
    CreateMatch { grid_size: Option<u8> },

    /// Join a waiting match by its share code
    JoinMatch { code: String },

    /// Fetch one match's current state
    GetMatch { match_id: Uuid },

    /// List matches still waiting for an opponent
    ListMatches,

    /// Submit a move
    PlayMove {
        match_id: Uuid,
        row: i32,
        col: i32,
        orientation: Orientation,
        #[serde(default)]
        idempotency_key: Option<String>,
    },

    /// Subscribe to a match's event room
    WatchMatch { match_id: Uuid },

    /// Unsubscribe from a match's event room
    UnwatchMatch { match_id: Uuid },

    /// Subscribe to lobby events
    JoinLobby,

    /// Unsubscribe from lobby events
    LeaveLobby,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Player identity assigned to this connection
    Welcome { player_id: Uuid },

    /// Current state of a match (response to create/join/get)
    MatchState { state: MatchSnapshot },

    /// Matches waiting for an opponent
    MatchList { matches: Vec<MatchSnapshot> },

    /// Accepted move result; idempotent replays return the stored outcome
    MoveResult { outcome: MoveOutcome },

    /// Delivery of a published event to a subscribed room
    Event {
        event: String,
        data: Value,
        room: String,
    },

    /// Request rejected
    Error { code: String, message: String },

    /// Pong response
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_move_wire_shape() {
        let json = r#"{
            "type": "PlayMove",
            "payload": {
                "match_id": "7f1dd351-67b8-4e12-9f93-2b6fca33ac1a",
                "row": 0,
                "col": 1,
                "orientation": "h"
            }
        }"#;

        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::PlayMove {
                row,
                col,
                orientation,
                idempotency_key,
                ..
            } => {
                assert_eq!((row, col), (0, 1));
                assert_eq!(orientation, Orientation::Horizontal);
                assert!(idempotency_key.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
