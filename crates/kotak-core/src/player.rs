//! Player identity and seats within a match.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque player identity, issued by the identity layer upstream of the
/// engine. The engine never inspects it.
pub type PlayerId = Uuid;

/// Seat index held by the match creator
pub const CREATOR_SEAT: u8 = 0;
/// Seat index held by the joining player
pub const JOINER_SEAT: u8 = 1;

/// One player's seat in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player: PlayerId,
    /// 0 for the creator, 1 for the joiner
    pub seat: u8,
    /// Cells owned so far; never decreases
    pub score: u32,
}

impl Seat {
    /// A fresh seat with no score
    pub fn new(player: PlayerId, seat: u8) -> Self {
        Self {
            player,
            seat,
            score: 0,
        }
    }
}
