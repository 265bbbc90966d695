use crate::error::{MapError, Result};
use crate::find::{MapStorage, MapTrait, NodeReference};
use crate::util::{self, MapHeader};
use log::{debug, trace};
use std::fmt::Display;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Offsets of the 4-connected neighbors, in the order they are enumerated:
/// row+1, row-1, col+1, col-1. Search tie-breaking depends on this order.
const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A grid coordinate. Serializes as the pair `[row, col]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "[isize; 2]", into = "[isize; 2]")]
pub struct Cell {
    pub row: isize,
    pub col: isize,
}

impl Cell {
    pub fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }

    /// Number of 4-connected steps between two cells on an empty grid
    pub fn manhattan(&self, other: &Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl From<[isize; 2]> for Cell {
    fn from([row, col]: [isize; 2]) -> Self {
        Self { row, col }
    }
}

impl From<Cell> for [isize; 2] {
    fn from(cell: Cell) -> Self {
        [cell.row, cell.col]
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl NodeReference for Cell {}

/// A labeled occupancy grid built from a map description.
///
/// Cells are stored row-major, `height` rows of `width` columns. The grid never changes after
/// construction, so it can be shared between any number of searches.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    xmin: f64,
    ymin: f64,
    width: usize,
    height: usize,
    resolution: f64,
    free_value: i64,
    occ_value: i64,
    inflation_radius: usize,
    cells: Vec<i64>,
}

impl OccupancyGrid {
    /// Load a map description from a file and inflate obstacles by `collision_radius`
    pub fn load(path: impl AsRef<Path>, collision_radius: f64) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file), collision_radius)
    }

    /// Parse an in-memory map description
    pub fn parse(text: &str, collision_radius: f64) -> Result<Self> {
        Self::from_reader(text.as_bytes(), collision_radius)
    }

    pub fn from_reader<R: BufRead>(reader: R, collision_radius: f64) -> Result<Self> {
        let (header, values) = util::read_map(reader)?;
        Self::from_labels(header, values, collision_radius)
    }

    /// Build the grid from a parsed header and exactly `width * height` labels.
    pub fn from_labels(header: MapHeader, values: Vec<i64>, collision_radius: f64) -> Result<Self> {
        let MapHeader {
            xmin,
            ymin,
            width,
            height,
            resolution,
        } = header;
        if Some(values.len()) != width.checked_mul(height) {
            return Err(MapError::Format(format!(
                "{} labels do not fill a {}x{} grid",
                values.len(),
                width,
                height
            )));
        }

        let (free_value, occ_value) = util::resolve_labels(&values);
        let inflation_radius = inflation_radius(collision_radius, resolution);

        let cells = if inflation_radius > 0 {
            inflate(&values, width, height, inflation_radius, occ_value)
        } else {
            values
        };

        let grid = Self {
            xmin,
            ymin,
            width,
            height,
            resolution,
            free_value,
            occ_value,
            inflation_radius,
            cells,
        };

        debug!(
            "loaded {}x{} grid: free={} occupied={} inflation={} cells",
            width, height, free_value, occ_value, inflation_radius
        );
        trace!("\n{}", grid);

        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Metric position of the grid corner `(xmin, ymin)`
    pub fn origin(&self) -> (f64, f64) {
        (self.xmin, self.ymin)
    }

    pub fn free_value(&self) -> i64 {
        self.free_value
    }

    pub fn occ_value(&self) -> i64 {
        self.occ_value
    }

    pub fn inflation_radius(&self) -> usize {
        self.inflation_radius
    }

    /// The stored label of a cell, or None outside the grid
    pub fn label(&self, cell: Cell) -> Option<i64> {
        self.index(cell).map(|idx| self.cells[idx])
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.height as isize).contains(&cell.row) && (0..self.width as isize).contains(&cell.col)
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.label(cell) == Some(self.free_value)
    }

    /// The free 4-connected neighbors of `cell`, see [`NEIGHBOR_OFFSETS`] for the order
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |(dr, dc)| Cell::new(cell.row + dr, cell.col + dc))
            .filter(move |n| self.is_free(*n))
    }

    /// Metric center of the cell at (row, col)
    pub fn cell_to_metric(&self, row: isize, col: isize) -> (f64, f64) {
        let x = self.xmin + (col as f64 + 0.5) * self.resolution;
        let y = self.ymin + (row as f64 + 0.5) * self.resolution;
        (x, y)
    }

    /// The cell containing the metric point. The result may lie outside the grid.
    pub fn metric_to_cell(&self, x: f64, y: f64) -> Cell {
        let col = ((x - self.xmin) / self.resolution).floor() as isize;
        let row = ((y - self.ymin) / self.resolution).floor() as isize;
        Cell::new(row, col)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.row as usize * self.width + cell.col as usize)
        } else {
            None
        }
    }
}

/// Number of cells covered by a physical collision radius, rounding half to even
fn inflation_radius(collision_radius: f64, resolution: f64) -> usize {
    (collision_radius.max(0.0) / resolution).round_ties_even() as usize
}

/// Grow every occupied cell into a square of half-size `radius`.
///
/// Only cells occupied in `cells` spread, cells marked by this pass do not.
fn inflate(cells: &[i64], width: usize, height: usize, radius: usize, occ_value: i64) -> Vec<i64> {
    let mut inflated = cells.to_vec();

    for row in 0..height {
        for col in 0..width {
            if cells[row * width + col] != occ_value {
                continue;
            }

            let rows = row.saturating_sub(radius)..=row.saturating_add(radius).min(height - 1);
            for r in rows {
                let cols = col.saturating_sub(radius)..=col.saturating_add(radius).min(width - 1);
                for c in cols {
                    inflated[r * width + c] = occ_value;
                }
            }
        }
    }

    inflated
}

impl Display for OccupancyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.width.max(1)).take(self.height) {
            for label in row {
                write!(f, "{}", if *label == self.free_value { " " } else { "X" })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// A MapStorage holding one value per grid cell, row-major in a single vec
#[derive(Debug)]
pub struct CellStorage<T> {
    rows: usize,
    columns: usize,
    values: Vec<T>,
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Cell;

    fn is_valid(&self, node: Self::Reference) -> bool {
        (0..self.rows as isize).contains(&node.row) && (0..self.columns as isize).contains(&node.col)
    }

    fn get(&self, node: Self::Reference) -> T {
        self.values[node.row as usize * self.columns + node.col as usize]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.values[node.row as usize * self.columns + node.col as usize]
    }
}

impl MapTrait for OccupancyGrid {
    type Reference = Cell;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_free(&self, node: Self::Reference) -> bool {
        OccupancyGrid::is_free(self, node)
    }

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference> {
        self.neighbors(node)
    }

    fn estimate(&self, from: Self::Reference, to: Self::Reference) -> usize {
        from.manhattan(&to)
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage {
            rows: self.height,
            columns: self.width,
            values: vec![Default::default(); self.width * self.height],
        }
    }
}
