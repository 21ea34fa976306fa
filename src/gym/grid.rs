use strum::{EnumIter, FromRepr, VariantArray};

/// Moves on a 4-connected grid, indexed clockwise from up
#[derive(FromRepr, EnumIter, VariantArray, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Move {
    /// The move for an action index
    ///
    /// **Panics** if `action` is not in `0..4`
    pub fn from_action(action: usize) -> Self {
        Self::from_repr(action).unwrap_or_else(|| panic!("Invalid action: {}", action))
    }

    /// The move 90 degrees counter-clockwise
    pub fn left_of(self) -> Self {
        Self::from_action((self as usize + 3) % 4)
    }

    /// The move 90 degrees clockwise
    pub fn right_of(self) -> Self {
        Self::from_action((self as usize + 1) % 4)
    }
}

/// Geometry of a square grid whose cells are numbered row by row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    size: usize,
}

impl Grid {
    /// A `size × size` grid
    ///
    /// **Panics** if `size` is less than 2
    pub fn new(size: usize) -> Self {
        assert!(size >= 2, "Grid size must be at least 2");
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> usize {
        self.size * self.size
    }

    /// `(row, col)` of a cell
    pub fn coords(&self, cell: usize) -> (usize, usize) {
        (cell / self.size, cell % self.size)
    }

    /// The cell reached by moving from `cell`, staying in place at the border
    pub fn neighbor(&self, cell: usize, mv: Move) -> usize {
        let (row, col) = self.coords(cell);
        let (row, col) = match mv {
            Move::Up => (row.saturating_sub(1), col),
            Move::Right => (row, (col + 1).min(self.size - 1)),
            Move::Down => ((row + 1).min(self.size - 1), col),
            Move::Left => (row, col.saturating_sub(1)),
        };
        row * self.size + col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_moves_clamp_at_border() {
        let grid = Grid::new(4);
        assert_eq!(grid.neighbor(0, Move::Up), 0);
        assert_eq!(grid.neighbor(0, Move::Left), 0);
        assert_eq!(grid.neighbor(0, Move::Right), 1);
        assert_eq!(grid.neighbor(0, Move::Down), 4);
        assert_eq!(grid.neighbor(15, Move::Down), 15);
        assert_eq!(grid.neighbor(15, Move::Right), 15);
        assert_eq!(grid.coords(6), (1, 2));
        assert_eq!((grid.size(), grid.cells()), (4, 16));
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn single_cell_grid_panics() {
        Grid::new(1);
    }

    #[test]
    fn orthogonal_moves() {
        assert_eq!(Move::Right.left_of(), Move::Up);
        assert_eq!(Move::Right.right_of(), Move::Down);
        assert_eq!(Move::Up.left_of(), Move::Left);
    }
}
