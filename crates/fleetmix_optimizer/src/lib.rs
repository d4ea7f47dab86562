pub mod error;
pub mod problem;
pub mod simulation;
pub mod solver;
mod utils;

pub mod json;

#[cfg(test)]
pub(crate) mod test_utils;
