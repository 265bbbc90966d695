//! Route planning on 2D occupancy grids.
//!
//! A map description is loaded into an [`OccupancyGrid`], with obstacles grown by a collision
//! radius, and searched with breadth-first, depth-first or A* search. Each search returns the
//! route and the order in which cells were explored.

pub mod error;
mod find;
pub mod grid;
pub mod plan;
pub mod util;

pub use error::MapError;
pub use find::*;
pub use grid::{Cell, CellStorage, OccupancyGrid};
pub use plan::{write_plan_file, PlanFile, DEFAULT_PLAN_FILE};
