//! Simulated annealing for the SUKP.
//!
//! A run keeps a current and a best-known selection. Each iteration draws a
//! random feasible neighbor (flip with probability `flip_probability`, swap
//! otherwise) and accepts it with the Metropolis rule for maximization.
//! Temperature follows a geometric schedule: `iterations_per_temp`
//! iterations at `T`, then `T <- T * cooling_rate`, until `T <= final_temp`.
//!
//! When no initial temperature is given, one is calibrated: starting from a
//! low temperature, probe rounds are run and the temperature is multiplied by
//! `beta` until the share of accepted moves reaches `gamma`.

use crate::evaluation::{self, ResourceCover};
use crate::heuristics::local_search::LocalSearch;
use crate::heuristics::make_rng;
use crate::instance::SukpInstance;
use crate::solution::{Move, Selection, Solution};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of the initial-temperature calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureCalibration {
    /// Temperature of the first probe round
    pub seed_temp: f64,
    /// Target share of accepted moves
    pub gamma: f64,
    /// Temperature multiplier between probe rounds
    pub beta: f64,
    /// Maximum number of probe rounds
    pub max_levels: usize,
    /// Cap on the iterations of one probe round
    pub max_probe_iterations: usize,
    /// Neighbor trials per probe iteration
    pub max_neighbor_trials: usize,
    /// Temperature returned when no round reaches `gamma`
    pub fallback_temp: f64,
}

impl Default for TemperatureCalibration {
    fn default() -> Self {
        TemperatureCalibration {
            seed_temp: 1.0,
            gamma: 0.95,
            beta: 2.0,
            max_levels: 50,
            max_probe_iterations: 200,
            max_neighbor_trials: 5,
            fallback_temp: 100.0,
        }
    }
}

/// Counters collected during an annealing run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnealingStats {
    /// Starting temperature, supplied or calibrated
    pub initial_temp: f64,
    /// Number of temperature levels visited
    pub temperature_levels: usize,
    /// Total iterations, skipped ones included
    pub iterations: usize,
    /// Iterations whose neighbor was accepted
    pub accepted: usize,
    /// Iterations without a feasible neighbor
    pub skipped: usize,
    /// Number of times the best-known value improved
    pub improvements: usize,
}

/// Result of an annealing run: the best-known selection, never the final one
#[derive(Debug, Clone)]
pub struct AnnealingOutcome {
    pub value: u64,
    pub selection: Selection,
    pub stats: AnnealingStats,
}

/// Draw a random feasible neighbor of `current`.
///
/// Up to `max_trials` draws are made. A flip picks a uniform item: a selected
/// item is removed (always feasible), an unselected one is added if its
/// marginal cost fits. A swap picks a uniform selected item and a uniform
/// unselected candidate and is kept if the resulting weight fits. An empty
/// selection always flips. Returns `None` when every draw was infeasible.
pub fn random_neighbor<R: Rng + ?Sized>(
    instance: &SukpInstance,
    current: &Selection,
    cover: &ResourceCover,
    flip_probability: f64,
    max_trials: usize,
    rng: &mut R,
) -> Option<Move> {
    let m = instance.num_items();
    if m == 0 {
        return None;
    }

    for _ in 0..max_trials {
        let flip = current.is_empty() || flip_probability >= 1.0 || rng.gen::<f64>() < flip_probability;

        if flip {
            let p = rng.gen_range(0..m);
            if current.contains(p) {
                return Some(Move::Remove(p));
            }
            if cover.fits(instance, p) {
                return Some(Move::Add(p));
            }
        } else {
            let Some(out) = current.nth(rng.gen_range(0..current.len())) else {
                continue;
            };
            let into = rng.gen_range(0..m);
            if !current.contains(into) && cover.swap_fits(instance, out, into) {
                return Some(Move::Swap { out, into });
            }
        }
    }

    None
}

/// Metropolis rule for maximization: improvements always pass, a loss of
/// `-delta` passes with probability `exp(delta / T)`
#[inline]
fn metropolis_accepts<R: Rng + ?Sized>(delta: i64, temperature: f64, rng: &mut R) -> bool {
    delta > 0 || rng.gen::<f64>() < (delta as f64 / temperature).exp()
}

/// Calibrate an initial temperature from `initial`.
///
/// Each probe round restarts from `initial` and runs
/// `min(probe_iterations, max_probe_iterations)` flip-only Metropolis steps.
/// The first temperature whose acceptance share reaches `gamma` is returned;
/// after `max_levels` rounds the fallback temperature is used.
pub fn calibrate_initial_temperature<R: Rng + ?Sized>(
    instance: &SukpInstance,
    initial: &Selection,
    probe_iterations: usize,
    calibration: &TemperatureCalibration,
    rng: &mut R,
) -> f64 {
    let probe = probe_iterations.min(calibration.max_probe_iterations);
    let initial_cover = ResourceCover::from_selection(instance, initial);
    let mut temperature = calibration.seed_temp;

    for level in 0..calibration.max_levels {
        let mut current = initial.clone();
        let mut cover = initial_cover.clone();
        let mut accepted = 0usize;

        for _ in 0..probe {
            let Some(mv) = random_neighbor(
                instance,
                &current,
                &cover,
                1.0,
                calibration.max_neighbor_trials,
                rng,
            ) else {
                continue;
            };

            if metropolis_accepts(mv.value_delta(instance), temperature, rng) {
                current = mv.apply(&current);
                cover.apply_move(instance, mv);
                accepted += 1;
            }
        }

        log::debug!(
            "Calibration level {}: T = {:.4}, accepted {}/{}",
            level,
            temperature,
            accepted,
            probe
        );
        if accepted as f64 >= calibration.gamma * probe as f64 {
            return temperature;
        }
        temperature *= calibration.beta;
    }

    log::warn!(
        "Temperature calibration did not reach {:.2} acceptance in {} levels, using {}",
        calibration.gamma,
        calibration.max_levels,
        calibration.fallback_temp
    );
    calibration.fallback_temp
}

/// Simulated Annealing
///
/// Metaheuristic that accepts worse selections with decreasing probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedAnnealing {
    /// Initial temperature; calibrated when `None`
    pub initial_temp: Option<f64>,
    /// Geometric cooling factor (alpha), in (0, 1)
    pub cooling_rate: f64,
    /// Iterations per temperature (SAmax)
    pub iterations_per_temp: usize,
    /// Stop once the temperature is at or below this value
    pub final_temp: f64,
    /// Draws allowed to find a feasible neighbor
    pub max_neighbor_trials: usize,
    /// Probability of a flip move rather than a swap
    pub flip_probability: f64,
    /// Random seed; entropy-seeded when `None`
    pub seed: Option<u64>,
    pub calibration: TemperatureCalibration,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        SimulatedAnnealing {
            initial_temp: None,
            cooling_rate: 0.97,
            iterations_per_temp: 400,
            final_temp: 1e-3,
            max_neighbor_trials: 10,
            flip_probability: 0.6,
            seed: None,
            calibration: TemperatureCalibration::default(),
        }
    }

    pub fn with_params(
        initial_temp: Option<f64>,
        final_temp: f64,
        cooling_rate: f64,
        iterations_per_temp: usize,
        max_neighbor_trials: usize,
    ) -> Self {
        SimulatedAnnealing {
            initial_temp,
            final_temp,
            cooling_rate,
            iterations_per_temp,
            max_neighbor_trials,
            ..Self::new()
        }
    }

    /// Short schedule: hot start, fast cooling
    pub fn fast() -> Self {
        Self::with_params(Some(80.0), 1e-3, 0.90, 120, 8)
    }

    /// Longer schedule: hotter start, slow cooling, more iterations
    pub fn quality() -> Self {
        Self::with_params(Some(120.0), 1e-3, 0.95, 300, 12)
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Check that the schedule terminates and the probabilities make sense
    pub fn validate(&self) -> Result<(), String> {
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(format!("cooling rate {} is not in (0, 1)", self.cooling_rate));
        }
        if !(self.final_temp.is_finite() && self.final_temp > 0.0) {
            return Err(format!("final temperature {} must be positive", self.final_temp));
        }
        if let Some(t0) = self.initial_temp {
            if !(t0.is_finite() && t0 > 0.0) {
                return Err(format!("initial temperature {} must be positive", t0));
            }
        }
        if !(0.0..=1.0).contains(&self.flip_probability) {
            return Err(format!("flip probability {} is not in [0, 1]", self.flip_probability));
        }
        Ok(())
    }

    /// Anneal from `initial` and return the best-known selection
    pub fn run(&self, instance: &SukpInstance, initial: &Selection) -> AnnealingOutcome {
        let mut rng = make_rng(self.seed);

        let mut current = initial.clone();
        let mut cover = ResourceCover::from_selection(instance, &current);
        let mut current_value = evaluation::value(instance, &current);
        let mut best = current.clone();
        let mut best_value = current_value;
        let mut stats = AnnealingStats::default();

        if let Err(reason) = self.validate() {
            log::warn!("Simulated annealing skipped: {}", reason);
            return AnnealingOutcome { value: best_value, selection: best, stats };
        }
        if cover.weight() > instance.capacity {
            log::warn!(
                "Simulated annealing started from an infeasible selection (weight {} > {})",
                cover.weight(),
                instance.capacity
            );
        }

        let initial_temp = match self.initial_temp {
            Some(t0) => t0,
            None => calibrate_initial_temperature(
                instance,
                initial,
                self.iterations_per_temp,
                &self.calibration,
                &mut rng,
            ),
        };
        stats.initial_temp = initial_temp;

        let mut temperature = initial_temp;
        while temperature > self.final_temp {
            for _ in 0..self.iterations_per_temp {
                stats.iterations += 1;

                let Some(mv) = random_neighbor(
                    instance,
                    &current,
                    &cover,
                    self.flip_probability,
                    self.max_neighbor_trials,
                    &mut rng,
                ) else {
                    stats.skipped += 1;
                    continue;
                };

                let delta = mv.value_delta(instance);
                if !metropolis_accepts(delta, temperature, &mut rng) {
                    continue;
                }

                current = mv.apply(&current);
                cover.apply_move(instance, mv);
                current_value = (current_value as i64 + delta) as u64;
                stats.accepted += 1;

                if current_value > best_value {
                    best = current.clone();
                    best_value = current_value;
                    stats.improvements += 1;
                    log::trace!("New best {} at T = {:.4}", best_value, temperature);
                }
            }

            temperature *= self.cooling_rate;
            stats.temperature_levels += 1;
        }

        log::debug!(
            "SA: T0 = {:.4}, {} levels, {} iterations, {} accepted, {} skipped, best {}",
            stats.initial_temp,
            stats.temperature_levels,
            stats.iterations,
            stats.accepted,
            stats.skipped,
            best_value
        );

        AnnealingOutcome { value: best_value, selection: best, stats }
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for SimulatedAnnealing {
    fn improve(&self, instance: &SukpInstance, solution: &mut Solution) -> bool {
        let start = std::time::Instant::now();
        let before = solution.value;

        let outcome = self.run(instance, &solution.selection);

        solution.selection = outcome.selection;
        solution.iterations = Some(outcome.stats.iterations);
        solution.validate(instance);
        solution.computation_time += start.elapsed().as_secs_f64();

        solution.value > before
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}

/// Anneal from `initial` with a geometric schedule; `initial_temp: None`
/// calibrates the starting temperature. Returns the best-known value and
/// selection.
#[allow(clippy::too_many_arguments)]
pub fn simulated_annealing(
    instance: &SukpInstance,
    initial: &Selection,
    initial_temp: Option<f64>,
    cooling_rate: f64,
    iterations_per_temp: usize,
    final_temp: f64,
    max_neighbor_trials: usize,
    seed: Option<u64>,
) -> (u64, Selection) {
    let sa = SimulatedAnnealing::with_params(
        initial_temp,
        final_temp,
        cooling_rate,
        iterations_per_temp,
        max_neighbor_trials,
    )
    .with_seed(seed);
    let outcome = sa.run(instance, initial);
    (outcome.value, outcome.selection)
}
