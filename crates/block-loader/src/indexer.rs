//! Partitioning the reference grid into a lattice of blocks.

use raster_io::PixelWindow;

use crate::types::{BlockCoordinate, BlockSpec, ReferenceGrid};

/// Number of block rows and columns needed to cover `grid`.
///
/// Edge blocks may extend past the grid; no pixel is left uncovered.
pub fn lattice_dimensions(grid: &ReferenceGrid, spec: &BlockSpec) -> (usize, usize) {
    let rows = (grid.height + spec.block_height() - 1) / spec.block_height();
    let cols = (grid.width + spec.block_width() - 1) / spec.block_width();
    (rows, cols)
}

/// The block lattice over a reference grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockIndexer {
    grid_width: usize,
    grid_height: usize,
    spec: BlockSpec,
    rows: usize,
    cols: usize,
}

impl BlockIndexer {
    pub fn new(grid: &ReferenceGrid, spec: BlockSpec) -> Self {
        let (rows, cols) = lattice_dimensions(grid, &spec);
        Self {
            grid_width: grid.width,
            grid_height: grid.height,
            spec,
            rows,
            cols,
        }
    }

    pub fn spec(&self) -> BlockSpec {
        self.spec
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Blocks per time step.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, coord: BlockCoordinate) -> bool {
        coord.row_index < self.rows && coord.col_index < self.cols
    }

    /// Reference-grid pixels covered by the block, clipped to the grid.
    ///
    /// The nominal block rectangle starts at
    /// `(col_index * block_width, row_index * block_height)`; edge blocks
    /// return only the part inside the grid.
    pub fn pixel_rect_for(&self, coord: BlockCoordinate) -> Option<PixelWindow> {
        if !self.contains(coord) {
            return None;
        }
        let col_off = coord.col_index * self.spec.block_width();
        let row_off = coord.row_index * self.spec.block_height();
        let width = self.spec.block_width().min(self.grid_width - col_off);
        let height = self.spec.block_height().min(self.grid_height - row_off);
        Some(PixelWindow::new(col_off, row_off, width, height))
    }

    /// Coordinate of the `index`-th block in row-major order.
    pub fn coordinate_at(&self, index: usize) -> Option<BlockCoordinate> {
        (index < self.len()).then(|| BlockCoordinate::new(index / self.cols, index % self.cols))
    }

    /// Row-major position of `coord`.
    pub fn index_of(&self, coord: BlockCoordinate) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.row_index * self.cols + coord.col_index)
    }

    /// All coordinates in row-major order.
    pub fn coordinates(&self) -> impl Iterator<Item = BlockCoordinate> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| BlockCoordinate::new(row, col)))
    }
}
