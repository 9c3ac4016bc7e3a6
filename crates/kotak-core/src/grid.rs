//! Grid geometry for the dots and boxes board.
//!
//! A board of size N is an N x N arrangement of unit cells drawn on a lattice
//! of (N+1) x (N+1) dots. This module provides the two coordinate types the
//! rest of the engine is built on:
//! - `EdgeCoord`: one drawable line segment between two adjacent dots
//! - `CellCoord`: one unit square, claimed when all four of its edges exist
//!
//! Edges are addressed by the dot at their top-left end plus an orientation,
//! which gives every segment exactly one coordinate.

use serde::{Deserialize, Serialize};

/// Orientation of an edge segment.
///
/// Serialized as `"h"` / `"v"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Connects a dot to its right-hand neighbor
    #[serde(rename = "h")]
    Horizontal,
    /// Connects a dot to the dot below it
    #[serde(rename = "v")]
    Vertical,
}

/// Coordinate of one drawable edge.
///
/// For a board of size N:
/// - a horizontal edge `(r, c)` is valid iff `0 <= r <= N` and `0 <= c < N`
/// - a vertical edge `(r, c)` is valid iff `0 <= r < N` and `0 <= c <= N`
///
/// Coordinates are signed so that malformed client input is representable
/// and can be rejected by a bounds check instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeCoord {
    pub row: i32,
    pub col: i32,
    pub orientation: Orientation,
}

impl EdgeCoord {
    /// Create a new edge coordinate
    pub const fn new(row: i32, col: i32, orientation: Orientation) -> Self {
        Self {
            row,
            col,
            orientation,
        }
    }

    /// Horizontal edge at (row, col)
    pub const fn horizontal(row: i32, col: i32) -> Self {
        Self::new(row, col, Orientation::Horizontal)
    }

    /// Vertical edge at (row, col)
    pub const fn vertical(row: i32, col: i32) -> Self {
        Self::new(row, col, Orientation::Vertical)
    }

    /// Whether this edge lies on a board of the given size.
    pub fn in_bounds(&self, size: u8) -> bool {
        let n = i32::from(size);
        match self.orientation {
            Orientation::Horizontal => {
                (0..=n).contains(&self.row) && (0..n).contains(&self.col)
            }
            Orientation::Vertical => (0..n).contains(&self.row) && (0..=n).contains(&self.col),
        }
    }

    /// The cells this edge borders: two for an interior edge, one on the rim.
    ///
    /// A horizontal edge at (r, c) sits between cell (r, c) below it and cell
    /// (r-1, c) above it; a vertical edge at (r, c) sits between cell (r, c)
    /// to its right and cell (r, c-1) to its left.
    pub fn bordering_cells(&self, size: u8) -> Vec<CellCoord> {
        let n = i32::from(size);
        let mut cells = Vec::with_capacity(2);
        match self.orientation {
            Orientation::Horizontal => {
                if self.row < n {
                    cells.push(CellCoord::new(self.row, self.col));
                }
                if self.row > 0 {
                    cells.push(CellCoord::new(self.row - 1, self.col));
                }
            }
            Orientation::Vertical => {
                if self.col < n {
                    cells.push(CellCoord::new(self.row, self.col));
                }
                if self.col > 0 {
                    cells.push(CellCoord::new(self.row, self.col - 1));
                }
            }
        }
        cells
    }
}

/// Coordinate of one unit cell (square) on the board.
///
/// Valid cells satisfy `0 <= row < N` and `0 <= col < N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: i32,
    pub col: i32,
}

impl CellCoord {
    /// Create a new cell coordinate
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Whether this cell lies on a board of the given size.
    pub fn in_bounds(&self, size: u8) -> bool {
        let n = i32::from(size);
        (0..n).contains(&self.row) && (0..n).contains(&self.col)
    }

    /// The four edges that bound this cell: top, bottom, left, right.
    pub fn bounding_edges(&self) -> [EdgeCoord; 4] {
        [
            EdgeCoord::horizontal(self.row, self.col),
            EdgeCoord::horizontal(self.row + 1, self.col),
            EdgeCoord::vertical(self.row, self.col),
            EdgeCoord::vertical(self.row, self.col + 1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_edge_bounds() {
        // Size 2: rows 0..=2, cols 0..2
        assert!(EdgeCoord::horizontal(0, 0).in_bounds(2));
        assert!(EdgeCoord::horizontal(2, 1).in_bounds(2));
        assert!(!EdgeCoord::horizontal(3, 0).in_bounds(2));
        assert!(!EdgeCoord::horizontal(0, 2).in_bounds(2));
        assert!(!EdgeCoord::horizontal(-1, 0).in_bounds(2));
    }

    #[test]
    fn test_vertical_edge_bounds() {
        // Size 2: rows 0..2, cols 0..=2
        assert!(EdgeCoord::vertical(0, 0).in_bounds(2));
        assert!(EdgeCoord::vertical(1, 2).in_bounds(2));
        assert!(!EdgeCoord::vertical(2, 0).in_bounds(2));
        assert!(!EdgeCoord::vertical(0, 3).in_bounds(2));
        assert!(!EdgeCoord::vertical(0, -1).in_bounds(2));
    }

    #[test]
    fn test_interior_edge_borders_two_cells() {
        let cells = EdgeCoord::horizontal(1, 0).bordering_cells(2);
        assert_eq!(cells, vec![CellCoord::new(1, 0), CellCoord::new(0, 0)]);

        let cells = EdgeCoord::vertical(0, 1).bordering_cells(2);
        assert_eq!(cells, vec![CellCoord::new(0, 1), CellCoord::new(0, 0)]);
    }

    #[test]
    fn test_rim_edge_borders_one_cell() {
        // Top rim
        assert_eq!(
            EdgeCoord::horizontal(0, 1).bordering_cells(2),
            vec![CellCoord::new(0, 1)]
        );
        // Bottom rim
        assert_eq!(
            EdgeCoord::horizontal(2, 0).bordering_cells(2),
            vec![CellCoord::new(1, 0)]
        );
        // Left rim
        assert_eq!(
            EdgeCoord::vertical(1, 0).bordering_cells(2),
            vec![CellCoord::new(1, 0)]
        );
        // Right rim
        assert_eq!(
            EdgeCoord::vertical(0, 2).bordering_cells(2),
            vec![CellCoord::new(0, 1)]
        );
    }

    #[test]
    fn test_bounding_edges_close_the_cell() {
        let cell = CellCoord::new(1, 1);
        let edges = cell.bounding_edges();

        assert_eq!(edges.len(), 4);
        // Every bounding edge borders the cell back
        for edge in &edges {
            assert!(edge.bordering_cells(3).contains(&cell));
        }
    }

    #[test]
    fn test_orientation_wire_format() {
        assert_eq!(
            serde_json::to_string(&Orientation::Horizontal).unwrap(),
            "\"h\""
        );
        assert_eq!(
            serde_json::from_str::<Orientation>("\"v\"").unwrap(),
            Orientation::Vertical
        );
    }
}
