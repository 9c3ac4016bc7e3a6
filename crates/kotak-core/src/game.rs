//! Match state machine.
//!
//! `MatchState` is the authoritative record for one match: lifecycle status,
//! seats and scores, the board, whose turn it is, and the idempotency ledger
//! for retried moves. All mutation goes through [`MatchState::join`] and
//! [`MatchState::play_move`]; the hosting layer holds an exclusive guard on
//! the match across each call, so a match sees a strictly serial sequence of
//! operations while distinct matches proceed independently.

use crate::board::{Board, ClaimedCell, PlacedEdge};
use crate::events::MatchEvent;
use crate::grid::{CellCoord, EdgeCoord, Orientation};
use crate::player::{PlayerId, Seat, CREATOR_SEAT, JOINER_SEAT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Smallest supported grid size
pub const MIN_GRID_SIZE: u8 = 2;
/// Largest supported grid size
pub const MAX_GRID_SIZE: u8 = 10;
/// Grid size used when a match is created without one
pub const DEFAULT_GRID_SIZE: u8 = 3;

/// Lifecycle status of a match.
///
/// Transitions are monotonic: waiting -> playing -> finished, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// One seat filled, accepting a join
    Waiting,
    /// Both seats filled, accepting moves
    Playing,
    /// All cells owned; terminal and read-only
    Finished,
}

/// Rejection outcomes for match operations.
///
/// Every variant means the request was refused with no state change.
/// Lookup failures (`MatchNotFound`) belong to the registry layer, which
/// wraps this enum.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MatchError {
    /// Malformed request data, e.g. a grid size outside 2..=10
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Coordinate out of bounds for the stated orientation
    #[error("coordinate out of bounds for a size-{size} grid")]
    InvalidCoordinate { size: u8 },

    /// Match is not waiting, or both seats are already filled
    #[error("match is not joinable")]
    MatchNotJoinable,

    /// Move submitted while the match is not in progress
    #[error("match is not in progress")]
    MatchNotPlaying,

    /// Submitter is not the player on turn
    #[error("not your turn")]
    NotYourTurn,

    /// An edge already exists at that coordinate
    #[error("edge already taken")]
    EdgeTaken,
}

impl MatchError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "invalid_input",
            MatchError::InvalidCoordinate { .. } => "invalid_coordinate",
            MatchError::MatchNotJoinable => "match_not_joinable",
            MatchError::MatchNotPlaying => "match_not_playing",
            MatchError::NotYourTurn => "not_your_turn",
            MatchError::EdgeTaken => "edge_taken",
        }
    }
}

/// A proposed move as submitted by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub row: i32,
    pub col: i32,
    pub orientation: Orientation,
    /// Client-chosen retry key, unique within the match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl MoveRequest {
    /// The edge coordinate this request targets
    pub fn coord(&self) -> EdgeCoord {
        EdgeCoord::new(self.row, self.col, self.orientation)
    }
}

/// Result of an accepted move.
///
/// Also the value stored in the idempotency ledger, so a retried submission
/// replays exactly this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub edge: PlacedEdge,
    pub completed_cells: Vec<CellCoord>,
    /// Player to move next; None once the match is finished
    pub next_turn: Option<PlayerId>,
}

/// What [`MatchState::play_move`] hands back: the outcome plus at most one
/// event to publish. `event` is None exactly when the ledger replayed a
/// stored outcome.
#[derive(Debug, Clone)]
pub struct MoveReply {
    pub outcome: MoveOutcome,
    pub event: Option<MatchEvent>,
}

/// What [`MatchState::join`] hands back. `event` is None when the player was
/// already seated and the join was a no-op.
#[derive(Debug, Clone)]
pub struct JoinReply {
    pub state: MatchSnapshot,
    pub event: Option<MatchEvent>,
}

/// Serializable full view of a match, used for API responses and for the
/// `match.*` event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id: Uuid,
    /// Human-shareable join code
    pub code: String,
    pub grid_size: u8,
    pub status: MatchStatus,
    pub players: Vec<Seat>,
    pub current_turn: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    /// Recorded edges in submission order
    pub edges: Vec<PlacedEdge>,
    pub cells: Vec<ClaimedCell>,
}

/// The complete authoritative state of one match.
#[derive(Debug, Clone)]
pub struct MatchState {
    id: Uuid,
    code: String,
    status: MatchStatus,
    seats: Vec<Seat>,
    current_turn: Option<PlayerId>,
    winner: Option<PlayerId>,
    board: Board,
    /// Accepted moves so far; source of each edge's submission ordinal
    move_count: u32,
    /// Stored outcomes keyed by client idempotency key
    ledger: HashMap<String, MoveOutcome>,
}

impl MatchState {
    /// Create a match in `waiting` with the creator seated at 0 and on turn.
    ///
    /// The creator always starts; there is no randomized seat order.
    pub fn new(id: Uuid, code: String, grid_size: u8, creator: PlayerId) -> Result<Self, MatchError> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size) {
            return Err(MatchError::InvalidInput(format!(
                "grid size must be between {} and {}, got {}",
                MIN_GRID_SIZE, MAX_GRID_SIZE, grid_size
            )));
        }

        Ok(Self {
            id,
            code,
            status: MatchStatus::Waiting,
            seats: vec![Seat::new(creator, CREATOR_SEAT)],
            current_turn: Some(creator),
            winner: None,
            board: Board::new(grid_size),
            move_count: 0,
            ledger: HashMap::new(),
        })
    }

    /// Match identity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Join code shared with the opponent
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Grid size N
    pub fn grid_size(&self) -> u8 {
        self.board.size()
    }

    /// Current lifecycle status
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Player whose turn it is; None once finished
    pub fn current_turn(&self) -> Option<PlayerId> {
        self.current_turn
    }

    /// Winning player; None while unfinished or on a draw
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// The filled seats, creator first
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Whether the match has reached its terminal state
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// The event announcing this match's creation, routed to the lobby.
    pub fn created_event(&self) -> MatchEvent {
        MatchEvent::MatchCreated {
            state: self.snapshot(),
        }
    }

    /// Seat a player in the open slot.
    ///
    /// Joining a match you are already seated in is a no-op that returns the
    /// current state and emits nothing. The second distinct player to join
    /// flips the match to `playing`.
    pub fn join(&mut self, player: PlayerId) -> Result<JoinReply, MatchError> {
        if self.seat_of(player).is_some() {
            return Ok(JoinReply {
                state: self.snapshot(),
                event: None,
            });
        }

        if self.status != MatchStatus::Waiting || self.seats.len() >= 2 {
            return Err(MatchError::MatchNotJoinable);
        }

        self.seats.push(Seat::new(player, JOINER_SEAT));
        if self.seats.len() == 2 {
            self.status = MatchStatus::Playing;
        }

        Ok(JoinReply {
            state: self.snapshot(),
            event: Some(MatchEvent::MatchJoined {
                state: self.snapshot(),
            }),
        })
    }

    /// Apply one move submission.
    ///
    /// Pipeline: idempotency ledger -> validation -> record edge -> detect
    /// completions -> score and claim cells -> turn advance -> termination.
    /// Validation precedes all writes, and nothing after the first write can
    /// fail, so a rejected move leaves the match exactly as it was.
    pub fn play_move(&mut self, player: PlayerId, request: &MoveRequest) -> Result<MoveReply, MatchError> {
        // A retried key replays the stored outcome: no new edge, no scoring,
        // no turn change, no event.
        if let Some(key) = &request.idempotency_key {
            if let Some(stored) = self.ledger.get(key) {
                return Ok(MoveReply {
                    outcome: stored.clone(),
                    event: None,
                });
            }
        }

        let coord = request.coord();
        self.validate_move(player, &coord)?;

        let edge = PlacedEdge {
            coord,
            player,
            seq: self.move_count,
            idempotency_key: request.idempotency_key.clone(),
        };
        if !self.board.place_edge(edge.clone()) {
            // Unreachable after validation, but a lost insert is a conflict,
            // not a fault.
            return Err(MatchError::EdgeTaken);
        }
        self.move_count += 1;

        let completed = self.board.completions_with(&coord);
        for cell in &completed {
            self.board.claim_cell(*cell, player);
        }

        if completed.is_empty() {
            self.current_turn = self.opponent_of(player);
        } else {
            // Extra-turn rule: the mover keeps the turn, and owns every cell
            // this edge completed.
            if let Some(seat) = self.seat_of_mut(player) {
                seat.score += completed.len() as u32;
            }
        }

        if self.board.is_full() {
            self.finish();
        }

        let outcome = MoveOutcome {
            edge,
            completed_cells: completed,
            next_turn: self.current_turn,
        };
        if let Some(key) = &request.idempotency_key {
            self.ledger.insert(key.clone(), outcome.clone());
        }

        // A finishing move emits match.finished instead of move.played,
        // never both.
        let event = if self.is_finished() {
            MatchEvent::MatchFinished {
                state: self.snapshot(),
            }
        } else {
            MatchEvent::MovePlayed {
                match_id: self.id,
                outcome: outcome.clone(),
            }
        };

        Ok(MoveReply {
            outcome,
            event: Some(event),
        })
    }

    /// Serializable full view of the current state.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            id: self.id,
            code: self.code.clone(),
            grid_size: self.board.size(),
            status: self.status,
            players: self.seats.clone(),
            current_turn: self.current_turn,
            winner: self.winner,
            edges: self.board.edges_in_order(),
            cells: self.board.claimed_cells(),
        }
    }

    /// Validation order: status, then turn, then bounds, then uniqueness.
    /// Each check is cheaper and more informative than the next.
    fn validate_move(&self, player: PlayerId, coord: &EdgeCoord) -> Result<(), MatchError> {
        if self.status != MatchStatus::Playing {
            return Err(MatchError::MatchNotPlaying);
        }
        if self.current_turn != Some(player) {
            return Err(MatchError::NotYourTurn);
        }
        if !coord.in_bounds(self.board.size()) {
            return Err(MatchError::InvalidCoordinate {
                size: self.board.size(),
            });
        }
        if self.board.has_edge(coord) {
            return Err(MatchError::EdgeTaken);
        }
        Ok(())
    }

    /// Terminal transition: clear the turn and pick the winner by score.
    /// Equal scores are a draw and leave no winner.
    fn finish(&mut self) {
        self.status = MatchStatus::Finished;
        self.current_turn = None;
        self.winner = match (self.seats.first(), self.seats.get(1)) {
            (Some(a), Some(b)) if a.score > b.score => Some(a.player),
            (Some(a), Some(b)) if b.score > a.score => Some(b.player),
            _ => None,
        };
    }

    fn seat_of(&self, player: PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player == player)
    }

    fn seat_of_mut(&mut self, player: PlayerId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.player == player)
    }

    /// The seated player other than `player`
    fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        self.seats
            .iter()
            .find(|s| s.player != player)
            .map(|s| s.player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_match(size: u8) -> (MatchState, PlayerId, PlayerId) {
        let creator = Uuid::new_v4();
        let joiner = Uuid::new_v4();
        let mut state =
            MatchState::new(Uuid::new_v4(), "KOTAK1".to_string(), size, creator).unwrap();
        state.join(joiner).unwrap();
        (state, creator, joiner)
    }

    fn request(row: i32, col: i32, orientation: Orientation) -> MoveRequest {
        MoveRequest {
            row,
            col,
            orientation,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_new_match_waits_with_creator_on_turn() {
        let creator = Uuid::new_v4();
        let state = MatchState::new(Uuid::new_v4(), "AAAAAA".to_string(), 3, creator).unwrap();

        assert_eq!(state.status(), MatchStatus::Waiting);
        assert_eq!(state.current_turn(), Some(creator));
        assert_eq!(state.seats().len(), 1);
        assert_eq!(state.seats()[0].seat, CREATOR_SEAT);
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_grid_size_bounds_are_enforced() {
        let creator = Uuid::new_v4();
        for size in [MIN_GRID_SIZE, MAX_GRID_SIZE] {
            assert!(MatchState::new(Uuid::new_v4(), "AAAAAA".into(), size, creator).is_ok());
        }
        for size in [0, 1, 11] {
            assert!(matches!(
                MatchState::new(Uuid::new_v4(), "AAAAAA".into(), size, creator),
                Err(MatchError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_second_join_starts_play() {
        let (state, creator, _) = two_player_match(2);
        assert_eq!(state.status(), MatchStatus::Playing);
        assert_eq!(state.seats().len(), 2);
        assert_eq!(state.seats()[1].seat, JOINER_SEAT);
        assert_eq!(state.current_turn(), Some(creator));
    }

    #[test]
    fn test_join_is_idempotent_for_seated_player() {
        let (mut state, _, joiner) = two_player_match(2);

        let first = state.snapshot();
        let reply = state.join(joiner).unwrap();

        assert!(reply.event.is_none());
        assert_eq!(reply.state, first);
        assert_eq!(state.seats().len(), 2);
    }

    #[test]
    fn test_third_player_cannot_join() {
        let (mut state, _, _) = two_player_match(2);
        assert_eq!(
            state.join(Uuid::new_v4()).unwrap_err(),
            MatchError::MatchNotJoinable
        );
    }

    #[test]
    fn test_move_rejected_while_waiting() {
        let creator = Uuid::new_v4();
        let mut state = MatchState::new(Uuid::new_v4(), "AAAAAA".into(), 2, creator).unwrap();

        let err = state
            .play_move(creator, &request(0, 0, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::MatchNotPlaying);
    }

    #[test]
    fn test_status_is_checked_before_turn() {
        // A non-seated, non-turn player against a waiting match still sees
        // MatchNotPlaying: status outranks turn ownership.
        let creator = Uuid::new_v4();
        let mut state = MatchState::new(Uuid::new_v4(), "AAAAAA".into(), 2, creator).unwrap();

        let err = state
            .play_move(Uuid::new_v4(), &request(0, 0, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::MatchNotPlaying);
    }

    #[test]
    fn test_turn_is_checked_before_coordinates() {
        let (mut state, _, joiner) = two_player_match(2);

        // Out of bounds AND out of turn: turn ownership wins
        let err = state
            .play_move(joiner, &request(99, 99, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::NotYourTurn);
    }

    #[test]
    fn test_out_of_bounds_coordinates_are_rejected() {
        let (mut state, creator, _) = two_player_match(2);

        for (row, col, orientation) in [
            (3, 0, Orientation::Horizontal),
            (0, 2, Orientation::Horizontal),
            (2, 0, Orientation::Vertical),
            (0, 3, Orientation::Vertical),
            (-1, 0, Orientation::Horizontal),
        ] {
            let err = state
                .play_move(creator, &request(row, col, orientation))
                .unwrap_err();
            assert_eq!(err, MatchError::InvalidCoordinate { size: 2 });
        }
    }

    #[test]
    fn test_duplicate_edge_is_rejected_without_state_change() {
        let (mut state, creator, joiner) = two_player_match(2);

        state
            .play_move(creator, &request(0, 0, Orientation::Horizontal))
            .unwrap();
        let before = state.snapshot();

        let err = state
            .play_move(joiner, &request(0, 0, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::EdgeTaken);
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_plain_move_passes_the_turn() {
        let (mut state, creator, joiner) = two_player_match(2);

        let reply = state
            .play_move(creator, &request(0, 0, Orientation::Horizontal))
            .unwrap();

        assert!(reply.outcome.completed_cells.is_empty());
        assert_eq!(reply.outcome.next_turn, Some(joiner));
        assert_eq!(state.current_turn(), Some(joiner));
        assert!(matches!(
            reply.event,
            Some(MatchEvent::MovePlayed { .. })
        ));
    }

    #[test]
    fn test_completing_a_cell_scores_and_keeps_the_turn() {
        let (mut state, creator, joiner) = two_player_match(2);

        // Alternate three edges around cell (0,0) without completing it
        state
            .play_move(creator, &request(0, 0, Orientation::Horizontal))
            .unwrap();
        state
            .play_move(joiner, &request(1, 0, Orientation::Horizontal))
            .unwrap();
        state
            .play_move(creator, &request(0, 0, Orientation::Vertical))
            .unwrap();

        // Joiner closes the cell and stays on turn
        let reply = state
            .play_move(joiner, &request(0, 1, Orientation::Vertical))
            .unwrap();

        assert_eq!(reply.outcome.completed_cells, vec![CellCoord::new(0, 0)]);
        assert_eq!(reply.outcome.next_turn, Some(joiner));
        assert_eq!(state.current_turn(), Some(joiner));

        let joiner_seat = state.seats().iter().find(|s| s.player == joiner).unwrap();
        assert_eq!(joiner_seat.score, 1);
    }

    #[test]
    fn test_idempotent_replay_returns_stored_outcome_unchanged() {
        let (mut state, creator, _) = two_player_match(2);

        let keyed = MoveRequest {
            row: 0,
            col: 0,
            orientation: Orientation::Horizontal,
            idempotency_key: Some("retry-1".to_string()),
        };

        let first = state.play_move(creator, &keyed).unwrap();
        let snapshot_after_first = state.snapshot();

        let replay = state.play_move(creator, &keyed).unwrap();

        // Byte-identical result, no event, no state change
        assert_eq!(replay.outcome, first.outcome);
        assert_eq!(
            serde_json::to_string(&replay.outcome).unwrap(),
            serde_json::to_string(&first.outcome).unwrap()
        );
        assert!(replay.event.is_none());
        assert_eq!(state.snapshot(), snapshot_after_first);
    }

    #[test]
    fn test_replay_wins_over_edge_taken() {
        // The ledger is consulted before validation, so a retried move
        // replays even though its edge would now fail as taken.
        let (mut state, creator, _) = two_player_match(2);

        let keyed = MoveRequest {
            row: 0,
            col: 0,
            orientation: Orientation::Horizontal,
            idempotency_key: Some("retry-1".to_string()),
        };
        let first = state.play_move(creator, &keyed).unwrap();

        let replay = state.play_move(creator, &keyed).unwrap();
        assert_eq!(replay.outcome, first.outcome);
    }

    #[test]
    fn test_unkeyed_duplicate_falls_back_to_edge_uniqueness() {
        let (mut state, creator, joiner) = two_player_match(2);

        state
            .play_move(creator, &request(0, 0, Orientation::Horizontal))
            .unwrap();
        // Same coordinate, no key: plain conflict
        let err = state
            .play_move(joiner, &request(0, 0, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::EdgeTaken);
    }

    #[test]
    fn test_finished_match_rejects_joins_and_moves() {
        let (mut state, creator, joiner) = two_player_match(2);

        // Drive the match to completion by always moving as the player on turn
        let mut edges: Vec<EdgeCoord> = Vec::new();
        for row in 0..=2 {
            for col in 0..2 {
                edges.push(EdgeCoord::horizontal(row, col));
            }
        }
        for row in 0..2 {
            for col in 0..=2 {
                edges.push(EdgeCoord::vertical(row, col));
            }
        }
        for coord in edges {
            let player = state.current_turn().unwrap();
            state
                .play_move(player, &request(coord.row, coord.col, coord.orientation))
                .unwrap();
        }

        assert!(state.is_finished());
        assert_eq!(state.current_turn(), None);
        assert_eq!(
            state.join(Uuid::new_v4()).unwrap_err(),
            MatchError::MatchNotJoinable
        );
        let err = state
            .play_move(creator, &request(0, 0, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::MatchNotPlaying);
        let err = state
            .play_move(joiner, &request(0, 0, Orientation::Horizontal))
            .unwrap_err();
        assert_eq!(err, MatchError::MatchNotPlaying);
    }
}
