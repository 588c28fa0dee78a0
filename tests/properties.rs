//! Properties every heuristic must satisfy, checked on seeded random
//! instances small enough to solve exhaustively.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use sukp_solver::evaluation::{self, ResourceCover};
use sukp_solver::heuristics::annealing::{simulated_annealing, SimulatedAnnealing};
use sukp_solver::heuristics::construction::{construct_grasp, construct_greedy, construct_random};
use sukp_solver::heuristics::local_search::{is_local_optimum, local_search, ImprovementPolicy};
use sukp_solver::{Selection, SukpInstance};

const POLICIES: [ImprovementPolicy; 2] = [ImprovementPolicy::Best, ImprovementPolicy::First];

fn random_instance(seed: u64) -> SukpInstance {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let m = rng.gen_range(1..=10);
    let n = rng.gen_range(1..=8);

    let profits: Vec<u64> = (0..m).map(|_| rng.gen_range(1..=30)).collect();
    let weights: Vec<u64> = (0..n).map(|_| rng.gen_range(1..=20)).collect();
    let requires: Vec<Vec<usize>> = (0..m)
        .map(|_| (0..n).filter(|_| rng.gen_bool(0.3)).collect())
        .collect();
    let capacity = rng.gen_range(0..=weights.iter().sum::<u64>());

    SukpInstance::new(&format!("random_{}", seed), capacity, profits, weights, requires).unwrap()
}

fn all_selections(instance: &SukpInstance) -> impl Iterator<Item = Selection> + '_ {
    let m = instance.num_items();
    (0u32..1 << m).map(move |mask| (0..m).filter(|p| mask & (1 << p) != 0).collect())
}

fn exhaustive_optimum(instance: &SukpInstance) -> u64 {
    all_selections(instance)
        .filter(|s| evaluation::is_feasible(instance, s))
        .map(|s| evaluation::value(instance, &s))
        .max()
        .unwrap_or(0)
}

/// Whether some flip or swap neighbor is feasible and strictly better,
/// using full recomputation only
fn has_improving_neighbor(instance: &SukpInstance, selection: &Selection) -> bool {
    let value = evaluation::value(instance, selection);
    let m = instance.num_items();

    let mut neighbors: Vec<Selection> = Vec::new();
    for p in 0..m {
        if selection.contains(p) {
            neighbors.push(selection.without_item(p));
            for q in (0..m).filter(|&q| !selection.contains(q)) {
                neighbors.push(selection.with_swap(p, q));
            }
        } else {
            neighbors.push(selection.with_item(p));
        }
    }

    neighbors
        .iter()
        .any(|s| evaluation::is_feasible(instance, s) && evaluation::value(instance, s) > value)
}

fn scenario_instance() -> SukpInstance {
    SukpInstance::new(
        "scenario",
        5,
        vec![10, 10, 10],
        vec![5, 5],
        vec![vec![0], vec![1], vec![0, 1]],
    )
    .unwrap()
}

#[test]
fn every_heuristic_returns_a_feasible_selection() {
    for seed in 0..40 {
        let instance = random_instance(seed);
        let optimum = exhaustive_optimum(&instance);

        let (random_value, random) = construct_random(&instance, 10, Some(seed));
        let (greedy_value, greedy) = construct_greedy(&instance);
        let (grasp_value, grasp) = construct_grasp(&instance, 10, 3, Some(seed));

        for (value, selection) in [(random_value, &random), (greedy_value, &greedy), (grasp_value, &grasp)] {
            assert!(evaluation::is_feasible(&instance, selection), "seed {}", seed);
            assert_eq!(evaluation::value(&instance, selection), value);
            assert!(value <= optimum);
        }

        for policy in POLICIES {
            let improved = local_search(&instance, &grasp, policy);
            assert!(evaluation::is_feasible(&instance, &improved), "seed {}", seed);
        }

        let (sa_value, annealed) = simulated_annealing(&instance, &grasp, Some(10.0), 0.8, 30, 0.05, 5, Some(seed));
        assert!(evaluation::is_feasible(&instance, &annealed), "seed {}", seed);
        assert_eq!(evaluation::value(&instance, &annealed), sa_value);
        assert!(sa_value <= optimum);
    }
}

#[test]
fn marginal_cost_is_the_weight_difference() {
    for seed in 0..20 {
        let instance = random_instance(seed);
        for selection in all_selections(&instance).step_by(3) {
            let resources = evaluation::required_resources(&instance, &selection);
            let cover = ResourceCover::from_selection(&instance, &selection);
            let base = evaluation::weight(&instance, &selection);

            for p in (0..instance.num_items()).filter(|&p| !selection.contains(p)) {
                let expected = evaluation::weight(&instance, &selection.with_item(p)) - base;
                assert_eq!(evaluation::marginal_cost(&instance, p, &resources), expected);
                assert_eq!(cover.marginal_cost(&instance, p), expected);
            }
        }
    }
}

#[test]
fn local_search_never_decreases_value_and_stops_at_a_local_optimum() {
    for seed in 0..40 {
        let instance = random_instance(seed);
        let (start_value, start) = construct_random(&instance, 1, Some(seed));

        for policy in POLICIES {
            let result = local_search(&instance, &start, policy);

            assert!(evaluation::value(&instance, &result) >= start_value, "seed {}", seed);
            assert!(is_local_optimum(&instance, &result), "seed {}", seed);
            assert!(!has_improving_neighbor(&instance, &result), "seed {} {:?}", seed, policy);
        }
    }
}

#[test]
fn annealing_best_is_never_below_the_initial_value() {
    for seed in 0..20 {
        let instance = random_instance(seed);
        let (start_value, start) = construct_greedy(&instance);

        let fast = SimulatedAnnealing::fast().with_seed(Some(seed)).run(&instance, &start);
        assert!(fast.value >= start_value, "seed {}", seed);
        assert!(evaluation::is_feasible(&instance, &fast.selection), "seed {}", seed);
        assert_eq!(evaluation::value(&instance, &fast.selection), fast.value);
        assert!(fast.stats.improvements <= fast.stats.accepted);
        if fast.stats.improvements == 0 {
            assert_eq!(fast.value, start_value, "seed {}", seed);
            assert_eq!(fast.selection, start, "seed {}", seed);
        } else {
            assert!(fast.value > start_value, "seed {}", seed);
        }

        let (calibrated, _) = simulated_annealing(&instance, &start, None, 0.7, 20, 0.01, 4, Some(seed));
        assert!(calibrated >= start_value, "seed {}", seed);
    }
}

#[test]
fn annealing_keeps_a_better_start_it_cannot_beat() {
    // Start at the exhaustive optimum: the run may wander but must return it.
    for seed in 0..20 {
        let instance = random_instance(200 + seed);
        let optimum = exhaustive_optimum(&instance);
        let start = all_selections(&instance)
            .find(|s| evaluation::is_feasible(&instance, s) && evaluation::value(&instance, s) == optimum)
            .unwrap();

        let outcome = SimulatedAnnealing::quality().with_seed(Some(seed)).run(&instance, &start);
        assert_eq!(outcome.value, optimum, "seed {}", seed);
        assert_eq!(outcome.stats.improvements, 0, "seed {}", seed);
        assert_eq!(outcome.selection, start, "seed {}", seed);
    }
}

#[test]
fn grasp_with_unit_rcl_is_the_greedy_construction() {
    for seed in 0..40 {
        let instance = random_instance(seed);
        let greedy = construct_greedy(&instance);
        for iters in [1, 5] {
            assert_eq!(construct_grasp(&instance, iters, 1, Some(seed)), greedy, "seed {}", seed);
        }
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    for seed in 0..10 {
        let instance = random_instance(100 + seed);

        assert_eq!(
            construct_random(&instance, 20, Some(seed)),
            construct_random(&instance, 20, Some(seed))
        );
        assert_eq!(
            construct_grasp(&instance, 20, 3, Some(seed)),
            construct_grasp(&instance, 20, 3, Some(seed))
        );

        let (_, start) = construct_greedy(&instance);
        let run = || simulated_annealing(&instance, &start, None, 0.8, 25, 0.01, 6, Some(seed));
        assert_eq!(run(), run());
    }
}

#[test]
fn three_item_scenario_reaches_the_optimum() {
    let instance = scenario_instance();
    assert_eq!(exhaustive_optimum(&instance), 10);

    let alone_2: Selection = [2].into_iter().collect();
    let both: Selection = [0, 1].into_iter().collect();
    assert!(!evaluation::is_feasible(&instance, &alone_2));
    assert!(!evaluation::is_feasible(&instance, &both));
    assert_eq!(evaluation::value(&instance, &both), 20);

    let one_of_first_two = |s: &Selection| s.len() == 1 && (s.contains(0) || s.contains(1));

    let (value, greedy) = construct_greedy(&instance);
    assert_eq!(value, 10);
    assert!(one_of_first_two(&greedy));

    for seed in 0..5 {
        let (value, grasp) = construct_grasp(&instance, 10, 8, Some(seed));
        assert_eq!(value, 10);
        assert!(one_of_first_two(&grasp));
        assert_eq!(evaluation::weight(&instance, &grasp), 5);
    }
}

#[test]
fn swap_out_of_a_shared_resource_frees_nothing() {
    // Items 0 and 1 both require resource 0; item 2 requires resource 1.
    let instance = SukpInstance::new(
        "shared",
        10,
        vec![3, 4, 6],
        vec![5, 2],
        vec![vec![0], vec![0], vec![1]],
    )
    .unwrap();
    let selection: Selection = [0, 1].into_iter().collect();
    let cover = ResourceCover::from_selection(&instance, &selection);

    assert_eq!(cover.freed_weight(&instance, 0), 0);
    // Adding resource 1 costs 2; removing item 0 frees nothing.
    assert_eq!(cover.swap_delta(&instance, 0, 2), 2);
    assert_eq!(evaluation::swap_delta(&instance, &selection, 0, 2), 2);
    assert_eq!(
        evaluation::weight(&instance, &selection.with_swap(0, 2)),
        evaluation::weight(&instance, &selection) + 2
    );
}
