use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use planner::{find_path, write_plan_file, Algorithm, Cell, OccupancyGrid, PlanFile};

/// Plan a route between two cells of an occupancy grid map
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the map file
    #[arg(short, long)]
    map: PathBuf,

    /// Start cell (row col)
    #[arg(long, num_args = 2, value_names = ["I", "J"], allow_negative_numbers = true, required = true)]
    start: Vec<isize>,

    /// Goal cell (row col)
    #[arg(long, num_args = 2, value_names = ["I", "J"], allow_negative_numbers = true, required = true)]
    goal: Vec<isize>,

    /// Search algorithm
    #[arg(long, value_enum, default_value_t = Algorithm::Bfs)]
    algo: Algorithm,

    /// Collision radius in map units, obstacles are grown by it
    #[arg(short = 'r', long, default_value_t = 0.0)]
    collision_radius: f64,

    /// Where to write the plan
    #[arg(short, long, default_value = planner::DEFAULT_PLAN_FILE)]
    output: PathBuf,
}

fn to_cell(pair: &[isize]) -> Cell {
    Cell::new(pair[0], pair[1])
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let map = OccupancyGrid::load(&args.map, args.collision_radius)
        .with_context(|| format!("failed to load map {}", args.map.display()))?;
    let (start, goal) = (to_cell(&args.start), to_cell(&args.goal));

    let result = find_path(&map, start, goal, args.algo);
    let length = result.len();

    write_plan_file(&args.output, &PlanFile::new(start, goal, result))?;

    println!(
        "[{}] path length: {} -> {}",
        args.algo.to_string().to_uppercase(),
        length,
        args.output.display()
    );

    Ok(())
}
