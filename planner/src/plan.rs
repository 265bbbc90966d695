//! The planning result handed to the visualization tool.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::find::SearchResult;
use crate::grid::Cell;

/// File the command line client writes to unless told otherwise
pub const DEFAULT_PLAN_FILE: &str = "out.planner";

/// Field names and the `[row, col]` pair shape are read by the visualization tool as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    pub start: Cell,
    pub goal: Cell,
    pub path: Vec<Cell>,
    pub visited: Vec<Cell>,
}

impl PlanFile {
    pub fn new(start: Cell, goal: Cell, result: SearchResult<Cell>) -> Self {
        Self {
            start,
            goal,
            path: result.path,
            visited: result.visited,
        }
    }
}

/// Write the plan as JSON, replacing any existing file
pub fn write_plan_file(path: impl AsRef<Path>, plan: &PlanFile) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("could not create plan file {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, plan)?;
    writer.flush()?;

    Ok(())
}
