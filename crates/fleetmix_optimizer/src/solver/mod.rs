pub mod accepted_solution;
pub mod driving_book;
pub mod least_viable;
pub mod neighborhood;
pub mod objective;
pub mod ranking;
pub mod score;
pub mod solver;
pub mod solver_params;
pub mod statistics;
pub mod tabu_list;
pub mod tabu_search;
