//! Heuristics module for the SUKP.
//!
//! This module exports the construction, local search and annealing
//! heuristics, and the random generator they share.

pub mod construction;
pub mod local_search;
pub mod annealing;

pub use construction::*;
pub use local_search::*;
pub use annealing::*;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Build the generator owned by one heuristic run.
///
/// With a seed the run is reproducible. Without one the generator is seeded
/// from OS entropy; the drawn seed is logged so the run can be replayed.
pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    let seed = seed.unwrap_or_else(|| {
        let drawn = rand::thread_rng().gen::<u64>();
        log::debug!("No seed supplied, using entropy seed {}", drawn);
        drawn
    });
    ChaCha8Rng::seed_from_u64(seed)
}
