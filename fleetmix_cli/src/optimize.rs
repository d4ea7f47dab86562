use std::path::PathBuf;

use clap::Args;
use fleetmix_optimizer::{
    json::types::{FromProblem, JsonFleetReport},
    solver::{
        solver::{Solver, SolverOutcome},
        solver_params::{SolverParams, Termination},
    },
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::{
    file_utils::{read_problem, write_file},
    parsers, tables,
};

#[derive(Args)]
pub struct OptimizeArgs {
    /// The fleet problem to optimize
    #[arg(short = 'i', long)]
    input: PathBuf,

    #[arg(short, long, value_parser=parsers::parse_duration, default_value = "2m")]
    timeout: jiff::SignedDuration,

    #[arg(long, short = 'n')]
    iterations: Option<usize>,

    /// Iterations without improvement before a run stops
    #[arg(long)]
    stagnation: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Write the report as JSON
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Write the driving book of the best fleet as JSON
    #[arg(long)]
    driving_book: Option<PathBuf>,
}

pub fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let problem = read_problem(&args.input)?;
    info!(
        "Loaded {} trips over {:.1} days and {} archetypes",
        problem.trips().len(),
        problem.trips().period_days(),
        problem.archetypes_len()
    );

    let defaults = SolverParams::default();
    let terminations = vec![
        Termination::Duration(args.timeout),
        Termination::Iterations(args.iterations.unwrap_or(500)),
        Termination::IterationsWithoutImprovement(args.stagnation.unwrap_or(50)),
    ];

    let mut solver = Solver::new(
        problem,
        SolverParams {
            terminations,
            seed: args.seed.unwrap_or(defaults.seed),
            ..defaults
        },
    );

    let bar = ProgressBar::new(1000);
    bar.set_style(ProgressStyle::default_bar().template("[{bar:40}] {percent}% ({elapsed})")?);
    let progress_bar = bar.clone();
    solver.on_progress(move |fraction| {
        progress_bar.set_position((fraction * 1000.0) as u64);
    });

    let outcome = solver.solve()?;
    bar.finish_and_clear();

    let problem = solver.problem();
    match &outcome {
        SolverOutcome::Solved(report) | SolverOutcome::GoalsUnmet(report) => {
            if matches!(outcome, SolverOutcome::GoalsUnmet(_)) {
                info!("No fleet meets every goal, showing the closest ones");
            }

            let rows = report
                .fleets
                .iter()
                .enumerate()
                .map(|(rank, fleet)| (format!("#{}", rank + 1), fleet))
                .chain(
                    report
                        .current_fleet
                        .iter()
                        .map(|fleet| (String::from("current"), fleet)),
                );
            println!("{}", tables::fleets_table(problem, rows));

            if let Some(error) = &report.current_fleet_error {
                warn!("The current fleet could not be replayed: {}", error);
            }

            let statistics = solver.statistics();
            info!(
                "{} evaluations ({} cached) over {} iterations",
                statistics.evaluations,
                statistics.cache_hits,
                statistics.total_iterations()
            );

            if let Some(path) = &args.driving_book
                && let Some(best) = report.best()
            {
                let book = solver.driving_book(&best.solution);
                info!(
                    "Driving book: {} trips, {} unassigned",
                    book.len(),
                    book.unassigned().count()
                );
                write_file(path, serde_json::to_string_pretty(&book)?)?;
            }
        }
        SolverOutcome::Infeasible(reason) => info!("Infeasible: {:?}", reason),
        SolverOutcome::Aborted => info!("Search aborted"),
    }

    if let Some(out) = &args.out {
        let json = JsonFleetReport::from_problem(&outcome, problem);
        write_file(out, serde_json::to_string_pretty(&json)?)?;
    }

    Ok(())
}
