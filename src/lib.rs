//! SUKP Solver Library
//!
//! Heuristics for the Set-Union Knapsack Problem (SUKP): choose a subset of
//! items maximizing total profit, where each item requires a set of
//! resources and the weight of the union of required resources must not
//! exceed the capacity. A resource shared by several chosen items is paid
//! once.
//!
//! # Features
//!
//! - Marginal-cost evaluation with a reference-counted resource cover
//! - Construction heuristics (random multi-restart, greedy ratio, GRASP)
//! - Flip/swap local search with best- or first-improvement
//! - Simulated annealing with initial-temperature calibration
//! - Experiment pipeline with CSV export and summary statistics
//!
//! # Example
//!
//! ```no_run
//! use sukp_solver::instance::SukpInstance;
//! use sukp_solver::heuristics::construction::{construct_grasp, ConstructionHeuristic, GreedyRatioConstruction};
//! use sukp_solver::heuristics::local_search::{local_search, ImprovementPolicy};
//! use sukp_solver::heuristics::annealing::simulated_annealing;
//!
//! // Load instance
//! let instance = SukpInstance::from_file("sukp_85_100.txt").unwrap();
//!
//! // Construct an initial selection
//! let greedy = GreedyRatioConstruction::new().construct(&instance);
//! let (_, grasp) = construct_grasp(&instance, 200, 8, Some(42));
//!
//! // Improve it
//! let local = local_search(&instance, &grasp, ImprovementPolicy::Best);
//! let (value, _) = simulated_annealing(&instance, &local, None, 0.95, 300, 1e-3, 12, Some(42));
//!
//! println!("greedy {} / annealed {}", greedy.value, value);
//! ```

pub mod instance;
pub mod solution;
pub mod evaluation;
pub mod heuristics;
pub mod config;
pub mod benchmark;

pub use instance::{InstanceError, SukpInstance};
pub use solution::{Move, Selection, Solution};
