use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context;
use fleetmix_optimizer::{json::types::JsonFleetProblem, problem::fleet_problem::FleetProblem};

pub fn read_problem(path: &PathBuf) -> anyhow::Result<FleetProblem> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let content: JsonFleetProblem = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Cannot parse {}", path.display()))?;

    Ok(content.build_problem()?)
}

/// Writes `contents`, creating the parent folders first.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, contents)
}
