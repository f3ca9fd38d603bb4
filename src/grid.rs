use itertools::iproduct;

use crate::math::Cell;

/// Weights of the 3x3 trail diffusion filter, row-major: corners 1/16, edges
/// 1/8, center 1/4. The weights sum to one, so diffusion conserves mass away
/// from the grid boundary.
pub const DIFFUSION_KERNEL: [f32; 9] = [
    1.0 / 16.0,
    1.0 / 8.0,
    1.0 / 16.0,
    1.0 / 8.0,
    1.0 / 4.0,
    1.0 / 8.0,
    1.0 / 16.0,
    1.0 / 8.0,
    1.0 / 16.0,
];

/// A bounded 2D grid with two fields per cell: a boolean occupancy flag (at
/// most one agent body per cell) and a non-negative trail concentration.
#[derive(Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    occupancy: Vec<bool>,
    trail: Vec<f32>,

    // Scratch space for the diffusion pass.
    buf: Vec<f32>,
}

impl Grid {
    /// Create a new grid with every cell empty and no trail.
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            occupancy: vec![false; width * height],
            trail: vec![0.0; width * height],
            buf: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether a cell lies inside the grid.
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && (cell.x as usize) < self.width && cell.y >= 0 && (cell.y as usize) < self.height
    }

    /// Index into the field vectors. The cell must be in bounds.
    fn index(&self, cell: Cell) -> usize {
        debug_assert!(self.in_bounds(cell));
        cell.y as usize * self.width + cell.x as usize
    }

    /// Whether a cell holds an agent body. The cell must be in bounds;
    /// callers check first.
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.occupancy[self.index(cell)]
    }

    pub fn is_empty(&self, cell: Cell) -> bool {
        !self.is_occupied(cell)
    }

    /// Claim a cell for an agent body. Succeeds only if the cell is in
    /// bounds and empty; otherwise nothing changes.
    pub fn place(&mut self, cell: Cell) -> bool {
        if self.in_bounds(cell) && self.is_empty(cell) {
            let idx = self.index(cell);
            self.occupancy[idx] = true;
            true
        } else {
            false
        }
    }

    /// Move an agent body from one cell to another. Succeeds only if `from`
    /// is in bounds and occupied and `to` is in bounds and empty; otherwise
    /// nothing changes. Callers never observe a half-finished move.
    pub fn relocate(&mut self, from: Cell, to: Cell) -> bool {
        let valid = self.in_bounds(from)
            && self.is_occupied(from)
            && self.in_bounds(to)
            && self.is_empty(to);
        if valid {
            let from_idx = self.index(from);
            let to_idx = self.index(to);
            self.occupancy[from_idx] = false;
            self.occupancy[to_idx] = true;
        }
        valid
    }

    /// Trail concentration at a cell. Reading outside the grid senses empty
    /// space rather than failing.
    pub fn trail_at(&self, cell: Cell) -> f32 {
        if self.in_bounds(cell) {
            self.trail[self.index(cell)]
        } else {
            0.0
        }
    }

    /// Add trail at a cell. Deposits outside the grid, and deposits whose
    /// sum would not stay finite, are dropped.
    pub fn deposit(&mut self, cell: Cell, amount: f32) {
        if !self.in_bounds(cell) {
            return;
        }
        let idx = self.index(cell);
        let sum = self.trail[idx] + amount;
        if sum.is_finite() {
            self.trail[idx] = sum;
        }
    }

    /// Multiply every trail cell by a decay factor.
    pub fn evaporate(&mut self, decay: f32) {
        for value in self.trail.iter_mut() {
            *value *= decay;
        }
    }

    /// Convolve the trail field with a 3x3 kernel. Contributions from
    /// outside the grid are dropped, not wrapped or renormalized, so edge
    /// and corner cells bleed mass off the boundary every pass. The result
    /// replaces the old field only after every cell has been computed.
    pub fn diffuse(&mut self, kernel: &[f32; 9]) {
        let (w, h) = (self.width as i32, self.height as i32);
        for (y, x) in iproduct!(0..h, 0..w) {
            let mut acc = 0.0;
            for (ky, kx) in iproduct!(0..3i32, 0..3i32) {
                let nx = x + kx - 1;
                let ny = y + ky - 1;
                if nx >= 0 && nx < w && ny >= 0 && ny < h {
                    let idx = ny as usize * self.width + nx as usize;
                    acc += self.trail[idx] * kernel[(ky * 3 + kx) as usize];
                }
            }
            self.buf[y as usize * self.width + x as usize] = acc;
        }
        std::mem::swap(&mut self.trail, &mut self.buf);
    }

    /// Number of cells currently holding an agent body.
    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().filter(|&&occupied| occupied).count()
    }

    /// Total trail mass over the whole field.
    pub fn trail_mass(&self) -> f32 {
        self.trail.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_bounds() {
        let grid = Grid::new(4, 3);
        assert!(grid.in_bounds(Cell::new(0, 0)));
        assert!(grid.in_bounds(Cell::new(3, 2)));
        assert!(!grid.in_bounds(Cell::new(4, 0)));
        assert!(!grid.in_bounds(Cell::new(0, 3)));
        assert!(!grid.in_bounds(Cell::new(-1, 1)));
    }

    #[test]
    fn test_place() {
        let mut grid = Grid::new(4, 4);
        let cell = Cell::new(1, 2);
        assert!(grid.place(cell));
        assert!(grid.is_occupied(cell));
        // A second claim on the same cell fails and changes nothing.
        assert!(!grid.place(cell));
        assert!(!grid.place(Cell::new(7, 7)));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn test_relocate() {
        let mut grid = Grid::new(4, 4);
        let a = Cell::new(0, 0);
        let b = Cell::new(1, 0);
        grid.place(a);
        grid.place(b);

        // Destination occupied.
        assert!(!grid.relocate(a, b));
        assert!(grid.is_occupied(a));

        // Destination out of bounds.
        assert!(!grid.relocate(a, Cell::new(-1, 0)));
        assert!(grid.is_occupied(a));

        // Source empty.
        assert!(!grid.relocate(Cell::new(2, 2), Cell::new(3, 3)));

        // Valid move.
        assert!(grid.relocate(b, Cell::new(2, 0)));
        assert!(grid.is_empty(b));
        assert!(grid.is_occupied(Cell::new(2, 0)));
        assert_eq!(grid.occupied_count(), 2);
    }

    #[test]
    fn test_trail_out_of_bounds_reads_zero() {
        let grid = Grid::new(4, 4);
        assert_eq!(grid.trail_at(Cell::new(-1, 0)), 0.0);
        assert_eq!(grid.trail_at(Cell::new(0, 17)), 0.0);
    }

    #[test]
    fn test_deposit() {
        let mut grid = Grid::new(4, 4);
        let cell = Cell::new(2, 2);
        grid.deposit(cell, 5.0);
        grid.deposit(cell, 1.5);
        assert_eq!(grid.trail_at(cell), 6.5);

        // Out of bounds is a no-op, not an error.
        grid.deposit(Cell::new(9, 9), 5.0);
        assert_eq!(grid.trail_mass(), 6.5);
    }

    #[test]
    fn test_deposit_overflow_dropped() {
        let mut grid = Grid::new(2, 2);
        let cell = Cell::new(0, 0);
        grid.deposit(cell, f32::MAX);
        grid.deposit(cell, f32::MAX);
        assert_eq!(grid.trail_at(cell), f32::MAX);
        assert!(grid.trail_at(cell).is_finite());
    }

    #[test]
    fn test_evaporate() {
        let mut grid = Grid::new(3, 3);
        grid.deposit(Cell::new(0, 0), 4.0);
        grid.deposit(Cell::new(2, 1), 1.0);
        grid.evaporate(0.5);
        assert_eq!(grid.trail_at(Cell::new(0, 0)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(2, 1)), 0.5);

        // A decay factor of one is the identity.
        grid.evaporate(1.0);
        assert_eq!(grid.trail_at(Cell::new(0, 0)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(2, 1)), 0.5);
    }

    #[test]
    fn test_diffuse_identity_kernel() {
        let mut kernel = [0.0; 9];
        kernel[4] = 1.0;

        let mut grid = Grid::new(4, 4);
        grid.deposit(Cell::new(1, 2), 3.0);
        grid.deposit(Cell::new(3, 0), 7.0);
        grid.diffuse(&kernel);
        assert_eq!(grid.trail_at(Cell::new(1, 2)), 3.0);
        assert_eq!(grid.trail_at(Cell::new(3, 0)), 7.0);
        assert_eq!(grid.trail_mass(), 10.0);
    }

    #[test]
    fn test_diffuse_spreads_to_neighbors() {
        let mut grid = Grid::new(5, 5);
        grid.deposit(Cell::new(2, 2), 16.0);
        grid.diffuse(&DIFFUSION_KERNEL);

        assert_eq!(grid.trail_at(Cell::new(2, 2)), 4.0);
        assert_eq!(grid.trail_at(Cell::new(1, 2)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(3, 2)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(2, 1)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(2, 3)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(1, 1)), 1.0);
        assert_eq!(grid.trail_at(Cell::new(3, 3)), 1.0);
        // Interior deposits keep their mass.
        assert!((grid.trail_mass() - 16.0).abs() < 1e-4);
    }

    #[test]
    fn test_diffuse_clips_at_corner() {
        let mut grid = Grid::new(5, 5);
        grid.deposit(Cell::new(0, 0), 16.0);
        grid.diffuse(&DIFFUSION_KERNEL);

        // Only the in-grid quadrant of the kernel survives: the center, two
        // edge neighbors and one diagonal, 9/16 of the mass in total.
        assert_eq!(grid.trail_at(Cell::new(0, 0)), 4.0);
        assert_eq!(grid.trail_at(Cell::new(1, 0)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(0, 1)), 2.0);
        assert_eq!(grid.trail_at(Cell::new(1, 1)), 1.0);
        assert!((grid.trail_mass() - 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_diffuse_uniform_field_loses_mass_only_at_edges() {
        let mut grid = Grid::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                grid.deposit(Cell::new(x, y), 1.0);
            }
        }
        grid.diffuse(&DIFFUSION_KERNEL);

        for y in 1..5 {
            for x in 1..5 {
                assert!((grid.trail_at(Cell::new(x, y)) - 1.0).abs() < 1e-5);
            }
        }
        assert!(grid.trail_at(Cell::new(0, 0)) < 1.0);
        assert!(grid.trail_at(Cell::new(5, 0)) < 1.0);
        assert!(grid.trail_at(Cell::new(0, 3)) < 1.0);
    }
}
