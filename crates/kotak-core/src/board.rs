//! Per-match board storage: placed edges and claimed cells.
//!
//! A `Board` is owned by exactly one match and mutated only from inside that
//! match's serialized pipeline, so plain maps are enough to carry the two
//! uniqueness invariants: one record per edge coordinate, one owner per cell.

use crate::grid::{CellCoord, EdgeCoord};
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// One recorded edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedEdge {
    #[serde(flatten)]
    pub coord: EdgeCoord,
    /// Player who drew the edge
    pub player: PlayerId,
    /// Submission ordinal within the match; the first accepted edge is 0
    pub seq: u32,
    /// Client-supplied retry key, if the submission carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// One claimed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedCell {
    #[serde(flatten)]
    pub coord: CellCoord,
    /// Player whose edge completed the cell
    pub owner: PlayerId,
}

/// Edge and cell storage for a single match.
#[derive(Debug, Clone)]
pub struct Board {
    size: u8,
    edges: HashMap<EdgeCoord, PlacedEdge>,
    cells: HashMap<CellCoord, PlayerId>,
}

impl Board {
    /// An empty board of the given size
    pub fn new(size: u8) -> Self {
        Self {
            size,
            edges: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    /// Grid size N
    pub fn size(&self) -> u8 {
        self.size
    }

    /// N squared: the cell count at which the match terminates
    pub fn total_cells(&self) -> usize {
        usize::from(self.size) * usize::from(self.size)
    }

    /// Number of edges recorded so far
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of cells claimed so far
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether an edge is already recorded at this coordinate
    pub fn has_edge(&self, coord: &EdgeCoord) -> bool {
        self.edges.contains_key(coord)
    }

    /// Whether every cell has been claimed
    pub fn is_full(&self) -> bool {
        self.cells.len() == self.total_cells()
    }

    /// Record an edge. Returns false and leaves the board untouched if the
    /// coordinate is already occupied; an existing record is never replaced.
    pub fn place_edge(&mut self, edge: PlacedEdge) -> bool {
        match self.edges.entry(edge.coord) {
            Entry::Vacant(slot) => {
                slot.insert(edge);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Cells newly completed by `new_edge`.
    ///
    /// The new edge is an explicit argument and is treated as present whether
    /// or not it has been recorded yet, so the check does not depend on
    /// insertion order. Only the 0-2 cells bordering the edge can change, and
    /// a cell that is already claimed is never returned again.
    pub fn completions_with(&self, new_edge: &EdgeCoord) -> Vec<CellCoord> {
        let has_edge = |e: &EdgeCoord| e == new_edge || self.edges.contains_key(e);

        new_edge
            .bordering_cells(self.size)
            .into_iter()
            .filter(|cell| !self.cells.contains_key(cell))
            .filter(|cell| cell.bounding_edges().iter().all(&has_edge))
            .collect()
    }

    /// Claim a completed cell for its owner. Returns false if the cell was
    /// already claimed; ownership is never reassigned.
    pub fn claim_cell(&mut self, cell: CellCoord, owner: PlayerId) -> bool {
        match self.cells.entry(cell) {
            Entry::Vacant(slot) => {
                slot.insert(owner);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// All recorded edges in submission order
    pub fn edges_in_order(&self) -> Vec<PlacedEdge> {
        let mut edges: Vec<PlacedEdge> = self.edges.values().cloned().collect();
        edges.sort_by_key(|e| e.seq);
        edges
    }

    /// All claimed cells, ordered by coordinate for stable output
    pub fn claimed_cells(&self) -> Vec<ClaimedCell> {
        let mut cells: Vec<ClaimedCell> = self
            .cells
            .iter()
            .map(|(coord, owner)| ClaimedCell {
                coord: *coord,
                owner: *owner,
            })
            .collect();
        cells.sort_by_key(|c| c.coord);
        cells
    }
}
