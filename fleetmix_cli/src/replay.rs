use std::path::PathBuf;

use clap::Args;
use fleetmix_optimizer::{
    json::types::{FromProblem, JsonRankedFleet},
    solver::{solver::Solver, solver_params::SolverParams},
};
use tracing::{info, warn};

use crate::{
    file_utils::{read_problem, write_file},
    tables,
};

#[derive(Args)]
pub struct ReplayArgs {
    /// The fleet problem, with its current fleet and recorded vehicles
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Write the evaluation as JSON
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Write the replayed driving book as JSON
    #[arg(long)]
    driving_book: Option<PathBuf>,
}

pub fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let problem = read_problem(&args.input)?;
    let solver = Solver::new(problem, SolverParams::default());

    let Some(current) = solver.evaluate_current_fleet()? else {
        warn!("The problem has no current fleet to replay");
        return Ok(());
    };

    let problem = solver.problem();
    println!(
        "{}",
        tables::fleets_table(problem, [(String::from("current"), &current)])
    );

    if let Some(out) = &args.out {
        let json = JsonRankedFleet::from_problem(&current, problem);
        write_file(out, serde_json::to_string_pretty(&json)?)?;
    }

    if let Some(path) = &args.driving_book {
        let book = solver.current_fleet_driving_book()?;
        info!(
            "Driving book: {} trips, {} unassigned",
            book.len(),
            book.unassigned().count()
        );
        write_file(path, serde_json::to_string_pretty(&book)?)?;
    }

    Ok(())
}
