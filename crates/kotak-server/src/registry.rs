//! Match registry: lookup, join codes, and the per-match serialized pipeline.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kotak_core::{
    MatchError, MatchEvent, MatchSnapshot, MatchState, MatchStatus, MoveOutcome, MoveRequest,
    PlayerId, DEFAULT_GRID_SIZE,
};
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

/// Join-code alphabet: uppercase letters and digits
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Join-code length
const CODE_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("match not found")]
    MatchNotFound,

    #[error(transparent)]
    Rule(#[from] MatchError),
}

impl RegistryError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::MatchNotFound => "match_not_found",
            RegistryError::Rule(e) => e.code(),
        }
    }
}

/// All live matches.
///
/// `DashMap::get_mut` hands out an exclusive guard per match; every operation
/// holds that guard across its whole pipeline, so operations on one match are
/// strictly serialized while distinct matches proceed in parallel. Events are
/// returned to the caller and published only after the guard is released.
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchState>,
    /// join code -> match id
    codes: DashMap<String, Uuid>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
            codes: DashMap::new(),
        }
    }

    /// Create a match for `creator`. Returns the initial snapshot and the
    /// `match.created` event for the lobby.
    pub fn create(
        &self,
        creator: PlayerId,
        grid_size: Option<u8>,
    ) -> Result<(MatchSnapshot, MatchEvent), RegistryError> {
        let size = grid_size.unwrap_or(DEFAULT_GRID_SIZE);
        let id = Uuid::new_v4();
        let code = self.reserve_code(id);

        let state = match MatchState::new(id, code.clone(), size, creator) {
            Ok(state) => state,
            Err(e) => {
                self.codes.remove(&code);
                return Err(e.into());
            }
        };

        let snapshot = state.snapshot();
        let event = state.created_event();
        self.matches.insert(id, state);

        Ok((snapshot, event))
    }

    /// Join a match by share code. `event` is None when the player was
    /// already seated and nothing changed.
    pub fn join(
        &self,
        code: &str,
        player: PlayerId,
    ) -> Result<(MatchSnapshot, Option<MatchEvent>), RegistryError> {
        let code = code.trim().to_ascii_uppercase();
        let id = *self.codes.get(&code).ok_or(RegistryError::MatchNotFound)?;

        let mut entry = self
            .matches
            .get_mut(&id)
            .ok_or(RegistryError::MatchNotFound)?;
        let reply = entry.join(player)?;
        Ok((reply.state, reply.event))
    }

    /// Run one move submission through the match's pipeline.
    pub fn play_move(
        &self,
        match_id: Uuid,
        player: PlayerId,
        request: &MoveRequest,
    ) -> Result<(MoveOutcome, Option<MatchEvent>), RegistryError> {
        let mut entry = self
            .matches
            .get_mut(&match_id)
            .ok_or(RegistryError::MatchNotFound)?;
        let reply = entry.play_move(player, request)?;
        Ok((reply.outcome, reply.event))
    }

    /// Snapshot of one match.
    pub fn get(&self, match_id: Uuid) -> Result<MatchSnapshot, RegistryError> {
        self.matches
            .get(&match_id)
            .map(|m| m.snapshot())
            .ok_or(RegistryError::MatchNotFound)
    }

    /// Matches still waiting for an opponent, for the lobby browser.
    pub fn waiting(&self) -> Vec<MatchSnapshot> {
        self.matches
            .iter()
            .filter(|m| m.status() == MatchStatus::Waiting)
            .map(|m| m.snapshot())
            .collect()
    }

    /// Generate an unused join code and reserve it for `id`. The entry API
    /// makes the reservation atomic under concurrent creates.
    fn reserve_code(&self, id: Uuid) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..CODE_LENGTH)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();

            if let Entry::Vacant(slot) = self.codes.entry(code.clone()) {
                slot.insert(id);
                return code;
            }
        }
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
