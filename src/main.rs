//! SUKP Solver - Command Line Interface
//!
//! Heuristic solver for the Set-Union Knapsack Problem.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use sukp_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use sukp_solver::config::SolverConfig;
use sukp_solver::heuristics::construction::*;
use sukp_solver::heuristics::local_search::*;
use sukp_solver::instance::SukpInstance;
use sukp_solver::solution::Solution;

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sukp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Heuristic solver for the Set-Union Knapsack Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance with one algorithm
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "sa-quality")]
        algorithm: Algorithm,

        /// Random seed (entropy-seeded when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON file with heuristic parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Improvement policy for local search
        #[arg(long, value_enum)]
        policy: Option<Policy>,

        /// Initial annealing temperature, overriding the preset schedules
        #[arg(long)]
        initial_temp: Option<f64>,

        /// Calibrate the initial annealing temperature instead of using the preset
        #[arg(long)]
        calibrate: bool,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of replicates per instance
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Seed of the first replicate
        #[arg(long, default_value = "0")]
        base_seed: u64,

        /// JSON file with heuristic parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run replicates one after another
        #[arg(long)]
        sequential: bool,

        /// Maximum number of items
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Compare algorithms on an instance
    Compare {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "10")]
        runs: usize,

        /// JSON file with heuristic parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Random multi-restart construction
    Random,
    /// Greedy by profit / marginal cost
    Greedy,
    /// GRASP construction
    Grasp,
    /// Best of random, greedy and GRASP
    MultiStart,
    /// GRASP followed by flip/swap descent
    Local,
    /// GRASP followed by the short annealing schedule
    SaFast,
    /// GRASP followed by the long annealing schedule
    SaQuality,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Policy {
    /// Best improvement
    Best,
    /// First improvement
    First,
}

impl From<Policy> for ImprovementPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Best => ImprovementPolicy::Best,
            Policy::First => ImprovementPolicy::First,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            algorithm,
            seed,
            config,
            policy,
            initial_temp,
            calibrate,
            output,
            verbose,
        } => {
            let mut solver = load_config(config.as_deref());
            if let Some(policy) = policy {
                solver.policy = policy.into();
            }
            if calibrate || initial_temp.is_some() {
                solver.sa_fast.initial_temp = initial_temp;
                solver.sa_quality.initial_temp = initial_temp;
            }
            solve_instance(&instance, algorithm, seed, &solver, output, verbose);
        }

        Commands::Benchmark {
            dir,
            output,
            runs,
            base_seed,
            config,
            sequential,
            max_items,
        } => {
            let solver = load_config(config.as_deref());
            run_benchmark(&dir, &output, runs, base_seed, solver, !sequential, max_items);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }

        Commands::Compare {
            instance,
            runs,
            config,
            output,
        } => {
            let solver = load_config(config.as_deref());
            compare_algorithms(&instance, runs, solver, output);
        }
    }
}

fn exit_with(context: &str, error: &dyn std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn load_config(path: Option<&Path>) -> SolverConfig {
    match path {
        Some(path) => SolverConfig::from_file(path).unwrap_or_else(|e| exit_with("Error loading configuration", &e)),
        None => SolverConfig::default(),
    }
}

fn load_instance(path: &Path) -> SukpInstance {
    SukpInstance::from_file(path).unwrap_or_else(|e| exit_with("Error loading instance", &e))
}

fn grasp_start(instance: &SukpInstance, seed: Option<u64>, solver: &SolverConfig) -> Solution {
    GraspConstruction::with_params(solver.grasp_iters, solver.rcl_size, seed).construct(instance)
}

fn solve_instance(
    path: &Path,
    algorithm: Algorithm,
    seed: Option<u64>,
    solver: &SolverConfig,
    output: Option<PathBuf>,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let instance = load_instance(path);

    if verbose {
        println!("{}", instance.statistics());
    }

    println!("Solving with {:?} algorithm...", algorithm);
    let start = Instant::now();

    let solution = match algorithm {
        Algorithm::Random => RandomRestartConstruction::with_params(solver.random_restarts, seed).construct(&instance),

        Algorithm::Greedy => GreedyRatioConstruction::new().construct(&instance),

        Algorithm::Grasp => grasp_start(&instance, seed, solver),

        Algorithm::MultiStart => {
            let mut multi = MultiStartConstruction::new();
            multi.add_heuristic(RandomRestartConstruction::with_params(solver.random_restarts, seed));
            multi.add_heuristic(GreedyRatioConstruction::new());
            multi.add_heuristic(GraspConstruction::with_params(solver.grasp_iters, solver.rcl_size, seed));
            multi.construct(&instance)
        }

        Algorithm::Local => {
            let mut sol = grasp_start(&instance, seed, solver);
            let descent = FlipSwapDescent { policy: solver.policy };
            descent.improve(&instance, &mut sol);
            sol.algorithm = descent.name().to_string();
            sol
        }

        Algorithm::SaFast | Algorithm::SaQuality => {
            let mut sol = grasp_start(&instance, seed, solver);
            let schedule = if algorithm == Algorithm::SaFast {
                &solver.sa_fast
            } else {
                &solver.sa_quality
            };
            let sa = schedule.clone().with_seed(seed);
            sa.improve(&instance, &mut sol);
            sol.algorithm = sa.name().to_string();
            sol
        }
    };

    let elapsed = start.elapsed();

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Value: {}", solution.value);
    println!("Weight: {} / {}", solution.weight, instance.capacity);
    println!("Items: {}", solution.num_items());
    println!("Feasible: {}", solution.feasible);
    println!("Time: {:.4}s", elapsed.as_secs_f64());
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\nChosen items:       {}", solution.items_bitstring(&instance));
        println!("Required resources: {}", solution.resources_bitstring(&instance));
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&solution).unwrap_or_else(|e| exit_with("Error encoding solution", &e));
        if let Err(e) = std::fs::write(&out_path, json) {
            exit_with("Failed to write output", &e);
        }
        println!("\nSolution saved to {:?}", out_path);
    }
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    runs: usize,
    base_seed: u64,
    solver: SolverConfig,
    parallel: bool,
    max_items: Option<usize>,
) {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir);

    if let Some(max) = max_items {
        instances.retain(|i| i.num_items() <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return;
    }

    if let Err(e) = std::fs::create_dir_all(output) {
        exit_with("Failed to create output directory", &e);
    }

    let config = BenchmarkConfig {
        num_runs: runs,
        base_seed,
        parallel,
        solver,
    };

    let mut benchmark = Benchmark::new(config);

    let progress = ProgressBar::new(instances.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for instance in &instances {
        progress.set_message(format!("{} (m={}, n={})", instance.name, instance.num_items(), instance.num_resources()));
        benchmark.run_replicates(instance);
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let results_path = output.join("results.csv");
    if let Err(e) = benchmark.export_to_csv(&results_path) {
        exit_with("Failed to export results", &e);
    }
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    if let Err(e) = benchmark.export_statistics_csv(&stats_path) {
        exit_with("Failed to export statistics", &e);
    }
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    if let Err(e) = std::fs::write(&report_path, &report) {
        exit_with("Failed to save report", &e);
    }
    println!("Report saved to {:?}", report_path);
}

fn analyze_instance(path: &Path) {
    let instance = load_instance(path);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let m = instance.num_items();
    if m == 0 {
        return;
    }

    let standalone: Vec<u64> = (0..m).map(|p| instance.standalone_weight(p)).collect();
    let ratios: Vec<f64> = (0..m)
        .filter(|&p| standalone[p] > 0)
        .map(|p| instance.profit(p) as f64 / standalone[p] as f64)
        .collect();

    let mut sharing = vec![0usize; instance.num_resources()];
    for p in 0..m {
        for &d in instance.requires(p) {
            sharing[d] += 1;
        }
    }

    println!("\nStandalone weight per item:");
    println!("  Min: {}", standalone.iter().min().copied().unwrap_or(0));
    println!("  Max: {}", standalone.iter().max().copied().unwrap_or(0));
    println!(
        "  Average: {:.2}",
        standalone.iter().sum::<u64>() as f64 / m as f64
    );
    println!("  Free items (no requirement): {}", m - ratios.len());

    if !ratios.is_empty() {
        let best = ratios.iter().cloned().fold(0.0, f64::max);
        let avg = ratios.iter().sum::<f64>() / ratios.len() as f64;
        println!("\nProfit / standalone weight:");
        println!("  Average: {:.3}", avg);
        println!("  Best: {:.3}", best);
    }

    if !sharing.is_empty() {
        let shared = sharing.iter().filter(|&&c| c > 1).count();
        println!("\nResource sharing:");
        println!("  Resources required by several items: {}", shared);
        println!("  Unused resources: {}", sharing.iter().filter(|&&c| c == 0).count());
        println!("  Most shared resource: {} items", sharing.iter().max().copied().unwrap_or(0));
    }

    let greedy = GreedyRatioConstruction::new().construct(&instance);
    println!("\nGreedy reference: value {} (weight {}/{})", greedy.value, greedy.weight, instance.capacity);
}

fn compare_algorithms(path: &Path, runs: usize, solver: SolverConfig, output: Option<PathBuf>) {
    let instance = load_instance(path);

    println!(
        "Comparing algorithms on {} (m={}, n={})...\n",
        instance.name,
        instance.num_items(),
        instance.num_resources()
    );

    let mut benchmark = Benchmark::new(BenchmarkConfig {
        num_runs: runs,
        base_seed: 0,
        parallel: true,
        solver,
    });
    benchmark.run_replicates(&instance);

    println!("========== Summary ==========");
    println!(
        "{:<15} {:>10} {:>10} {:>10} {:>10}",
        "Algorithm", "Best", "Average", "Worst", "Avg Time"
    );
    println!("{}", "-".repeat(60));

    for stat in benchmark.compute_statistics() {
        println!(
            "{:<15} {:>10} {:>10.2} {:>10} {:>10.4}",
            stat.algorithm, stat.best_value, stat.avg_value, stat.worst_value, stat.avg_time
        );
    }

    if let Some(out_path) = output {
        if let Err(e) = benchmark.export_to_csv(&out_path) {
            exit_with("Failed to write CSV", &e);
        }
        println!("\nResults exported to {:?}", out_path);
    }
}
