//! Benchmarking and experimentation module for the SUKP.
//!
//! Runs the heuristic pipeline on instances, keeps one record per algorithm
//! run, and aggregates, exports and reports those records.

use crate::config::SolverConfig;
use crate::heuristics::construction::*;
use crate::heuristics::local_search::*;
use crate::instance::SukpInstance;
use crate::solution::{Selection, Solution};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Sequential run identifier, assigned when recorded
    pub run_id: usize,
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Number of items
    pub num_items: usize,
    /// Number of resources
    pub num_resources: usize,
    /// Instance capacity
    pub capacity: u64,
    /// Total profit of the selection
    pub value: u64,
    /// Weight of the required resources
    pub weight: u64,
    /// Whether solution is feasible
    pub feasible: bool,
    /// Number of chosen items
    pub selected: usize,
    /// Computation time in seconds
    pub time: f64,
    /// Seed of the replicate
    pub seed: u64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Chosen items as a 0/1 string
    pub items: String,
    /// Required resources as a 0/1 string
    pub resources: String,
    /// RFC 3339 time of the run
    pub timestamp: String,
}

impl AlgorithmResult {
    pub fn from_solution(instance: &SukpInstance, solution: &Solution, seed: u64) -> Self {
        AlgorithmResult {
            run_id: 0,
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            num_items: instance.num_items(),
            num_resources: instance.num_resources(),
            capacity: instance.capacity,
            value: solution.value,
            weight: solution.weight,
            feasible: solution.feasible,
            selected: solution.num_items(),
            time: solution.computation_time,
            seed,
            iterations: solution.iterations,
            items: solution.items_bitstring(instance),
            resources: solution.resources_bitstring(instance),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of recorded runs
    pub num_runs: usize,
    /// Number of feasible solutions
    pub num_feasible: usize,
    /// Average value
    pub avg_value: f64,
    /// Best value
    pub best_value: u64,
    /// Worst value
    pub worst_value: u64,
    /// Sample standard deviation of value
    pub std_value: f64,
    /// Average time
    pub avg_time: f64,
    /// Total time
    pub total_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of replicates per instance
    pub num_runs: usize,
    /// Seed of the first replicate; replicate `r` uses `base_seed + r`
    pub base_seed: u64,
    /// Run replicates in parallel
    pub parallel: bool,
    /// Heuristic parameters
    pub solver: SolverConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            base_seed: 0,
            parallel: true,
            solver: SolverConfig::default(),
        }
    }
}

/// Mean and sample standard deviation (0 for fewer than two values)
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    use statrs::statistics::Statistics;

    let mean = values.iter().mean();
    let std = if values.len() > 1 { values.iter().std_dev() } else { 0.0 };
    (mean, std)
}

/// Rerun a local search from `start` under a pipeline label
fn improve_from(instance: &SukpInstance, start: &Selection, search: &dyn LocalSearch, label: &str) -> Solution {
    let mut solution = Solution::from_selection(instance, start.clone(), label);
    search.improve(instance, &mut solution);
    solution.algorithm = label.to_string();
    solution
}

/// One pass of the experiment pipeline with a single seed.
///
/// RANDOM, GREEDY and GRASP build from scratch; LOCAL_BEST, LOCAL_FIRST,
/// SA_FAST and SA_QUALITY all start from the GRASP selection.
pub fn pipeline(instance: &SukpInstance, seed: u64, solver: &SolverConfig) -> Vec<Solution> {
    let mut solutions = Vec::with_capacity(7);

    let mut random = RandomRestartConstruction::with_params(solver.random_restarts, Some(seed)).construct(instance);
    random.algorithm = "RANDOM".to_string();
    solutions.push(random);

    let mut greedy = GreedyRatioConstruction::new().construct(instance);
    greedy.algorithm = "GREEDY".to_string();
    solutions.push(greedy);

    let mut grasp = GraspConstruction::with_params(solver.grasp_iters, solver.rcl_size, Some(seed)).construct(instance);
    grasp.algorithm = "GRASP".to_string();
    let start = grasp.selection.clone();
    solutions.push(grasp);

    let searches: Vec<(&str, Box<dyn LocalSearch + Send + Sync>)> = vec![
        ("LOCAL_BEST", Box::new(FlipSwapDescent::new())),
        ("LOCAL_FIRST", Box::new(FlipSwapDescent::first_improvement())),
        ("SA_FAST", Box::new(solver.sa_fast.clone().with_seed(Some(seed)))),
        ("SA_QUALITY", Box::new(solver.sa_quality.clone().with_seed(Some(seed)))),
    ];

    for (label, search) in &searches {
        solutions.push(improve_from(instance, &start, search.as_ref(), label));
    }

    solutions
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the pipeline once on an instance and record every algorithm
    pub fn run_pipeline(&mut self, instance: &SukpInstance, seed: u64) {
        let solutions = pipeline(instance, seed, &self.config.solver);
        for solution in &solutions {
            self.record_result(AlgorithmResult::from_solution(instance, solution, seed));
        }
    }

    /// Run `num_runs` independent replicates on an instance.
    ///
    /// Each replicate owns its seed and generators, so parallel and
    /// sequential runs record the same selections, in seed order.
    pub fn run_replicates(&mut self, instance: &SukpInstance) {
        log::info!("Running {} replicates on instance: {}", self.config.num_runs, instance.name);

        let seeds: Vec<u64> = (0..self.config.num_runs as u64)
            .map(|r| self.config.base_seed + r)
            .collect();
        let solver = &self.config.solver;

        let replicates: Vec<(u64, Vec<Solution>)> = if self.config.parallel {
            seeds
                .par_iter()
                .map(|&seed| (seed, pipeline(instance, seed, solver)))
                .collect()
        } else {
            seeds
                .iter()
                .map(|&seed| (seed, pipeline(instance, seed, solver)))
                .collect()
        };

        for (seed, solutions) in replicates {
            for solution in &solutions {
                self.record_result(AlgorithmResult::from_solution(instance, solution, seed));
            }
        }
    }

    /// Run replicates on multiple instances
    pub fn run_on_instances(&mut self, instances: &[SukpInstance]) {
        for instance in instances {
            self.run_replicates(instance);
        }
    }

    /// Record a result
    fn record_result(&mut self, mut result: AlgorithmResult) {
        result.run_id = self.results.len() + 1;
        log::debug!(
            "run {} {} on {}: value {} weight {}/{}",
            result.run_id,
            result.algorithm,
            result.instance,
            result.value,
            result.weight,
            result.capacity
        );
        self.results.push(result);
    }

    /// Compute statistics for each algorithm, best average value first
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: BTreeMap<&str, Vec<&AlgorithmResult>> = BTreeMap::new();

        for result in &self.results {
            stats_map.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics = Vec::new();

        for (algo, results) in stats_map {
            let feasible_results: Vec<_> = results.iter().filter(|r| r.feasible).collect();

            if feasible_results.is_empty() {
                continue;
            }

            let values: Vec<f64> = feasible_results.iter().map(|r| r.value as f64).collect();
            let times: Vec<f64> = feasible_results.iter().map(|r| r.time).collect();

            let (avg_value, std_value) = mean_and_std(&values);
            let (avg_time, _) = mean_and_std(&times);

            statistics.push(AlgorithmStatistics {
                algorithm: algo.to_string(),
                num_runs: results.len(),
                num_feasible: feasible_results.len(),
                avg_value,
                best_value: feasible_results.iter().map(|r| r.value).max().unwrap_or(0),
                worst_value: feasible_results.iter().map(|r| r.value).min().unwrap_or(0),
                std_value,
                avg_time,
                total_time: times.iter().sum(),
            });
        }

        statistics.sort_by(|a, b| b.avg_value.total_cmp(&a.avg_value));

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        SUKP Benchmark Report\n");
        report.push_str("========================================\n\n");

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<15} {:>10} {:>12} {:>10} {:>10} {:>10} {:>10}\n",
            "Algorithm", "Feasible", "Avg Value", "Best", "Worst", "Std", "Avg Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in &stats {
            report.push_str(&format!(
                "{:<15} {:>10} {:>12.2} {:>10} {:>10} {:>10.2} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_feasible, stat.num_runs),
                stat.avg_value,
                stat.best_value,
                stat.worst_value,
                stat.std_value,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");

        let mut instance_best: BTreeMap<&str, &AlgorithmResult> = BTreeMap::new();

        for result in self.results.iter().filter(|r| r.feasible) {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.value > entry.value {
                *entry = result;
            }
        }

        for (instance, best) in &instance_best {
            report.push_str(&format!(
                "  {}: {} (weight {}/{}, {})\n",
                instance, best.value, best.weight, best.capacity, best.algorithm
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }
}

/// Load every `*.txt` instance of a directory, sorted by item count.
///
/// Files that fail to parse are logged and skipped.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<SukpInstance> {
    let dir = dir.as_ref();
    let mut instances = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read instance directory {}: {}", dir.display(), e);
            return instances;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "txt").unwrap_or(false) {
            match SukpInstance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by(|a, b| a.num_items().cmp(&b.num_items()).then_with(|| a.name.cmp(&b.name)));

    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::annealing::SimulatedAnnealing;

    fn create_test_instance() -> SukpInstance {
        SukpInstance::new(
            "bench",
            9,
            vec![6, 4, 7, 3, 5],
            vec![4, 3, 5, 2],
            vec![vec![0], vec![0, 1], vec![2], vec![1, 3], vec![2, 3]],
        )
        .unwrap()
    }

    fn small_config(parallel: bool) -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 3,
            base_seed: 10,
            parallel,
            solver: SolverConfig {
                random_restarts: 20,
                grasp_iters: 20,
                rcl_size: 3,
                sa_fast: SimulatedAnnealing::with_params(Some(10.0), 0.1, 0.8, 20, 5),
                sa_quality: SimulatedAnnealing::with_params(Some(20.0), 0.1, 0.9, 30, 5),
                ..Default::default()
            },
        }
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sukp-solver-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert_eq!(config.solver.rcl_size, 8);
    }

    #[test]
    fn test_pipeline_order_and_feasibility() {
        let instance = create_test_instance();
        let solutions = pipeline(&instance, 1, &small_config(false).solver);

        let names: Vec<&str> = solutions.iter().map(|s| s.algorithm.as_str()).collect();
        assert_eq!(
            names,
            ["RANDOM", "GREEDY", "GRASP", "LOCAL_BEST", "LOCAL_FIRST", "SA_FAST", "SA_QUALITY"]
        );
        assert!(solutions.iter().all(|s| s.feasible && s.weight <= instance.capacity));

        let grasp = solutions[2].value;
        assert!(solutions[3..].iter().all(|s| s.value >= grasp));
    }

    #[test]
    fn test_records_carry_run_ids_and_bitstrings() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config(false));
        benchmark.run_pipeline(&instance, 4);

        let results = benchmark.results();
        assert_eq!(results.len(), 7);
        assert_eq!(results.iter().map(|r| r.run_id).collect::<Vec<_>>(), (1..=7).collect::<Vec<_>>());
        for r in results {
            assert_eq!(r.items.len(), 5);
            assert_eq!(r.resources.len(), 4);
            assert_eq!(r.items.matches('1').count(), r.selected);
            assert_eq!(r.seed, 4);
        }
    }

    #[test]
    fn test_parallel_replicates_match_sequential() {
        let instance = create_test_instance();

        let mut sequential = Benchmark::new(small_config(false));
        sequential.run_replicates(&instance);
        let mut parallel = Benchmark::new(small_config(true));
        parallel.run_replicates(&instance);

        let key = |r: &AlgorithmResult| (r.run_id, r.algorithm.clone(), r.seed, r.value, r.items.clone());
        assert_eq!(sequential.results().len(), 21);
        assert_eq!(
            sequential.results().iter().map(key).collect::<Vec<_>>(),
            parallel.results().iter().map(key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_statistics_and_report() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config(false));
        benchmark.run_replicates(&instance);

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 7);
        for window in stats.windows(2) {
            assert!(window[0].avg_value >= window[1].avg_value);
        }
        let greedy = stats.iter().find(|s| s.algorithm == "GREEDY").unwrap();
        // Deterministic: every replicate gives the same value.
        assert_eq!(greedy.best_value, greedy.worst_value);
        assert_eq!(greedy.std_value, 0.0);
        assert_eq!(greedy.num_runs, 3);

        let report = benchmark.generate_report();
        assert!(report.contains("SA_QUALITY"));
        assert!(report.contains("bench:"));
    }

    #[test]
    fn test_csv_export() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config(false));
        benchmark.run_pipeline(&instance, 0);

        let dir = scratch_dir("csv");
        let results_path = dir.join("results.csv");
        let stats_path = dir.join("stats.csv");
        benchmark.export_to_csv(&results_path).unwrap();
        benchmark.export_statistics_csv(&stats_path).unwrap();

        let mut reader = csv::Reader::from_path(&results_path).unwrap();
        let rows: Vec<AlgorithmResult> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[1].algorithm, "GREEDY");

        let stats_text = std::fs::read_to_string(&stats_path).unwrap();
        assert!(stats_text.starts_with("algorithm,num_runs"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_instances_from_dir() {
        let dir = scratch_dir("load");
        std::fs::write(dir.join("big.txt"), "3 2 4 5\n10 10 10\n5 5\n0 0\n1 1\n2 0\n2 1\n").unwrap();
        std::fs::write(dir.join("tiny.txt"), "1 1 1 3\n7\n2\n0 0\n").unwrap();
        std::fs::write(dir.join("broken.txt"), "2 1 1\n").unwrap();
        std::fs::write(dir.join("notes.md"), "not an instance").unwrap();

        let instances = load_instances_from_dir(&dir);
        let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["tiny", "big"]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
