//! Construction heuristics for the SUKP.
//!
//! All strategies grow a selection from empty, admitting an item only when its
//! marginal cost fits the remaining budget, so every result is feasible. When
//! nothing fits (capacity 0, or every item too heavy) the result is the empty
//! selection with value 0.

use crate::evaluation::ResourceCover;
use crate::heuristics::make_rng;
use crate::instance::SukpInstance;
use crate::solution::{Selection, Solution};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &SukpInstance) -> Solution;
    fn name(&self) -> &str;
}

/// Selection under construction with its resource cover
struct PartialSelection<'a> {
    instance: &'a SukpInstance,
    selection: Selection,
    cover: ResourceCover,
}

impl<'a> PartialSelection<'a> {
    fn new(instance: &'a SukpInstance) -> Self {
        PartialSelection {
            instance,
            selection: Selection::new(),
            cover: ResourceCover::new(instance),
        }
    }

    #[inline]
    fn marginal_cost(&self, item: usize) -> u64 {
        self.cover.marginal_cost(self.instance, item)
    }

    #[inline]
    fn affordable(&self, cost: u64) -> bool {
        self.cover
            .weight()
            .checked_add(cost)
            .map_or(false, |w| w <= self.instance.capacity)
    }

    fn admit(&mut self, item: usize) {
        self.selection.insert(item);
        self.cover.add(self.instance, item);
    }

    fn finish(self) -> (u64, Selection) {
        let value = crate::evaluation::value(self.instance, &self.selection);
        (value, self.selection)
    }
}

/// An affordable candidate scored by profit per unit of marginal cost
#[derive(Debug, Clone, Copy)]
struct Candidate {
    item: usize,
    cost: u64,
    score: f64,
}

/// Score every unchosen affordable item, in ascending item order
fn affordable_candidates(partial: &PartialSelection<'_>, remaining: &[usize]) -> Vec<Candidate> {
    remaining
        .iter()
        .filter_map(|&item| {
            let cost = partial.marginal_cost(item);
            if !partial.affordable(cost) {
                return None;
            }
            let score = if cost == 0 {
                f64::INFINITY
            } else {
                partial.instance.profit(item) as f64 / cost as f64
            };
            Some(Candidate { item, cost, score })
        })
        .collect()
}

/// One greedy pass admitting items in the given order whenever they fit
fn admit_in_order(instance: &SukpInstance, order: &[usize]) -> (u64, Selection) {
    let mut partial = PartialSelection::new(instance);
    for &item in order {
        let cost = partial.marginal_cost(item);
        if partial.affordable(cost) {
            partial.admit(item);
        }
    }
    partial.finish()
}

/// Randomized multi-restart construction.
///
/// Each restart scans a fresh uniform permutation of the items and admits
/// every item that still fits; the best value over all restarts is kept.
pub fn construct_random(instance: &SukpInstance, restarts: usize, seed: Option<u64>) -> (u64, Selection) {
    let mut rng = make_rng(seed);
    random_restarts(instance, restarts, &mut rng)
}

fn random_restarts(instance: &SukpInstance, restarts: usize, rng: &mut ChaCha8Rng) -> (u64, Selection) {
    let mut best = (0, Selection::new());

    for _ in 0..restarts {
        let mut order: Vec<usize> = (0..instance.num_items()).collect();
        order.shuffle(rng);

        let (value, selection) = admit_in_order(instance, &order);
        if value > best.0 {
            best = (value, selection);
        }
    }

    best
}

/// Deterministic greedy construction by profit / marginal cost.
///
/// An item whose requirements are already covered costs nothing and is
/// admitted at once; otherwise the affordable item with the highest ratio is
/// admitted, ties going to the lowest index.
pub fn construct_greedy(instance: &SukpInstance) -> (u64, Selection) {
    let mut partial = PartialSelection::new(instance);
    let mut remaining: Vec<usize> = (0..instance.num_items()).collect();

    loop {
        let mut best: Option<(usize, f64)> = None;

        for (pos, &item) in remaining.iter().enumerate() {
            let cost = partial.marginal_cost(item);
            if cost == 0 {
                best = Some((pos, f64::INFINITY));
                break;
            }
            if partial.affordable(cost) {
                let score = instance.profit(item) as f64 / cost as f64;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((pos, score));
                }
            }
        }

        match best {
            Some((pos, _)) => {
                let item = remaining.remove(pos);
                partial.admit(item);
            }
            None => break,
        }
    }

    partial.finish()
}

/// GRASP construction with a restricted candidate list.
///
/// At every step the affordable candidates are ranked by ratio and one of the
/// best `rcl_size` is drawn uniformly. A free candidate (marginal cost 0) is
/// taken alone, without a draw. The construction stops when no candidate is
/// affordable; it is repeated `iters` times and the best value is kept.
pub fn construct_grasp(
    instance: &SukpInstance,
    iters: usize,
    rcl_size: usize,
    seed: Option<u64>,
) -> (u64, Selection) {
    let mut rng = make_rng(seed);
    let mut best = (0, Selection::new());

    for _ in 0..iters {
        let (value, selection) = grasp_pass(instance, rcl_size, &mut rng);
        if value > best.0 {
            best = (value, selection);
        }
    }

    best
}

fn grasp_pass(instance: &SukpInstance, rcl_size: usize, rng: &mut ChaCha8Rng) -> (u64, Selection) {
    let mut partial = PartialSelection::new(instance);
    let mut remaining: Vec<usize> = (0..instance.num_items()).collect();

    loop {
        let mut candidates = affordable_candidates(&partial, &remaining);
        if candidates.is_empty() {
            break;
        }

        let chosen = rcl_pick(&mut candidates, rcl_size, rng);
        remaining.retain(|&p| p != chosen);
        partial.admit(chosen);
    }

    partial.finish()
}

/// Draw the next GRASP item from non-empty `candidates` (ascending item order).
///
/// The lowest-index free candidate is returned without a draw; otherwise one
/// of the best `min(rcl_size, len)` by score is drawn uniformly.
fn rcl_pick(candidates: &mut [Candidate], rcl_size: usize, rng: &mut ChaCha8Rng) -> usize {
    if let Some(free) = candidates.iter().find(|c| c.cost == 0) {
        return free.item;
    }
    // Stable sort: equal scores keep ascending item order.
    candidates.sort_by_key(|c| std::cmp::Reverse(OrderedFloat(c.score)));
    let rcl_len = rcl_size.clamp(1, candidates.len());
    candidates[rng.gen_range(0..rcl_len)].item
}

fn timed_solution(
    instance: &SukpInstance,
    start: std::time::Instant,
    (value, selection): (u64, Selection),
    algorithm: &str,
    iterations: Option<usize>,
) -> Solution {
    let mut solution = Solution::from_selection(instance, selection, algorithm);
    solution.computation_time = start.elapsed().as_secs_f64();
    solution.iterations = iterations;
    debug_assert_eq!(solution.value, value);
    log::debug!(
        "{}: value {} weight {}/{} ({} items)",
        algorithm,
        solution.value,
        solution.weight,
        instance.capacity,
        solution.num_items()
    );
    solution
}

/// Randomized multi-restart construction
pub struct RandomRestartConstruction {
    pub restarts: usize,
    pub seed: Option<u64>,
}

impl RandomRestartConstruction {
    pub fn new() -> Self {
        RandomRestartConstruction {
            restarts: 200,
            seed: None,
        }
    }

    pub fn with_params(restarts: usize, seed: Option<u64>) -> Self {
        RandomRestartConstruction { restarts, seed }
    }
}

impl Default for RandomRestartConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for RandomRestartConstruction {
    fn construct(&self, instance: &SukpInstance) -> Solution {
        let start = std::time::Instant::now();
        let result = construct_random(instance, self.restarts, self.seed);
        timed_solution(instance, start, result, self.name(), Some(self.restarts))
    }

    fn name(&self) -> &str {
        "Random"
    }
}

/// Deterministic greedy construction by profit / marginal cost
#[derive(Default)]
pub struct GreedyRatioConstruction;

impl GreedyRatioConstruction {
    pub fn new() -> Self {
        GreedyRatioConstruction
    }
}

impl ConstructionHeuristic for GreedyRatioConstruction {
    fn construct(&self, instance: &SukpInstance) -> Solution {
        let start = std::time::Instant::now();
        let result = construct_greedy(instance);
        timed_solution(instance, start, result, self.name(), None)
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}

/// GRASP construction with a restricted candidate list
pub struct GraspConstruction {
    pub iters: usize,
    pub rcl_size: usize,
    pub seed: Option<u64>,
}

impl GraspConstruction {
    pub fn new() -> Self {
        GraspConstruction {
            iters: 200,
            rcl_size: 8,
            seed: None,
        }
    }

    pub fn with_params(iters: usize, rcl_size: usize, seed: Option<u64>) -> Self {
        GraspConstruction { iters, rcl_size, seed }
    }
}

impl Default for GraspConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for GraspConstruction {
    fn construct(&self, instance: &SukpInstance) -> Solution {
        let start = std::time::Instant::now();
        let result = construct_grasp(instance, self.iters, self.rcl_size, self.seed);
        timed_solution(instance, start, result, self.name(), Some(self.iters))
    }

    fn name(&self) -> &str {
        "GRASP"
    }
}

/// Multi-start construction: runs several heuristics and keeps the best value
pub struct MultiStartConstruction {
    heuristics: Vec<Box<dyn ConstructionHeuristic + Send + Sync>>,
}

impl MultiStartConstruction {
    pub fn new() -> Self {
        MultiStartConstruction { heuristics: Vec::new() }
    }

    pub fn with_all_heuristics(seed: Option<u64>) -> Self {
        let heuristics: Vec<Box<dyn ConstructionHeuristic + Send + Sync>> = vec![
            Box::new(RandomRestartConstruction::with_params(200, seed)),
            Box::new(GreedyRatioConstruction::new()),
            Box::new(GraspConstruction::with_params(200, 8, seed)),
        ];

        MultiStartConstruction { heuristics }
    }

    pub fn add_heuristic<H: ConstructionHeuristic + Send + Sync + 'static>(&mut self, h: H) {
        self.heuristics.push(Box::new(h));
    }
}

impl Default for MultiStartConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for MultiStartConstruction {
    fn construct(&self, instance: &SukpInstance) -> Solution {
        let start = std::time::Instant::now();

        let mut best_solution = Solution::from_selection(instance, Selection::new(), self.name());

        for heuristic in &self.heuristics {
            let solution = heuristic.construct(instance);
            if solution.feasible && solution.value > best_solution.value {
                best_solution = solution;
            }
        }

        log::debug!("MultiStart kept {} (value {})", best_solution.algorithm, best_solution.value);
        best_solution.algorithm = self.name().to_string();
        best_solution.computation_time = start.elapsed().as_secs_f64();
        best_solution
    }

    fn name(&self) -> &str {
        "MultiStart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation;

    /// Two resources of weight 5, items 0 and 1 each need one, item 2 needs both.
    fn create_test_instance() -> SukpInstance {
        SukpInstance::new(
            "test",
            5,
            vec![10, 10, 10],
            vec![5, 5],
            vec![vec![0], vec![1], vec![0, 1]],
        )
        .unwrap()
    }

    fn create_shared_instance() -> SukpInstance {
        SukpInstance::new(
            "shared",
            12,
            vec![9, 4, 4, 6, 2],
            vec![6, 3, 3, 5],
            vec![vec![0], vec![0, 1], vec![0, 2], vec![3], vec![]],
        )
        .unwrap()
    }

    #[test]
    fn test_greedy_scenario() {
        let instance = create_test_instance();
        let (value, selection) = construct_greedy(&instance);

        assert_eq!(value, 10);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(0) || selection.contains(1));
        assert_eq!(evaluation::weight(&instance, &selection), 5);
    }

    #[test]
    fn test_grasp_scenario() {
        let instance = create_test_instance();
        let (value, selection) = construct_grasp(&instance, 20, 3, Some(7));

        assert_eq!(value, 10);
        assert!(evaluation::is_feasible(&instance, &selection));
        assert!(!selection.contains(2));
    }

    #[test]
    fn test_random_scenario() {
        let instance = create_test_instance();
        let (value, selection) = construct_random(&instance, 10, Some(3));

        assert_eq!(value, 10);
        assert!(evaluation::is_feasible(&instance, &selection));
    }

    #[test]
    fn test_greedy_uses_marginal_cost() {
        let instance = create_shared_instance();
        let (value, selection) = construct_greedy(&instance);

        // Item 4 is free, then item 0 (9/6); items 1 and 2 cost 3 each after it.
        assert!(selection.contains(4));
        assert!(selection.contains(0));
        assert!(selection.contains(1));
        assert!(selection.contains(2));
        assert_eq!(value, 19);
        assert_eq!(evaluation::weight(&instance, &selection), 12);
    }

    #[test]
    fn test_zero_capacity_gives_empty_selection() {
        let instance = SukpInstance::new("zero", 0, vec![3, 4], vec![1], vec![vec![0], vec![0]]).unwrap();

        assert_eq!(construct_greedy(&instance), (0, Selection::new()));
        assert_eq!(construct_grasp(&instance, 5, 2, Some(1)), (0, Selection::new()));
        assert_eq!(construct_random(&instance, 5, Some(1)), (0, Selection::new()));
    }

    #[test]
    fn test_free_items_are_taken_even_at_zero_capacity() {
        let instance = SukpInstance::new("free", 0, vec![3, 4], vec![1], vec![vec![], vec![0]]).unwrap();
        let (value, selection) = construct_grasp(&instance, 3, 2, Some(1));

        assert_eq!(value, 3);
        assert_eq!(selection, [0].into_iter().collect());
    }

    fn candidate(item: usize, cost: u64, profit: u64) -> Candidate {
        let score = if cost == 0 { f64::INFINITY } else { profit as f64 / cost as f64 };
        Candidate { item, cost, score }
    }

    #[test]
    fn test_free_candidate_is_taken_without_a_draw() {
        for seed in 0..20 {
            let mut candidates = vec![
                candidate(0, 2, 50),
                candidate(3, 0, 1),
                candidate(5, 4, 90),
                candidate(6, 0, 7),
            ];
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut untouched = ChaCha8Rng::seed_from_u64(seed);

            assert_eq!(rcl_pick(&mut candidates, 8, &mut rng), 3);
            assert_eq!(rng.next_u64(), untouched.next_u64());
        }
    }

    #[test]
    fn test_rcl_is_limited_to_the_best_scores() {
        let mut seen = [0usize; 4];
        for seed in 0..200 {
            // Scores: item 0 -> 2.0, item 1 -> 9.0, item 2 -> 1.0, item 3 -> 5.0
            let mut candidates = vec![
                candidate(0, 5, 10),
                candidate(1, 2, 18),
                candidate(2, 4, 4),
                candidate(3, 2, 10),
            ];
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            seen[rcl_pick(&mut candidates, 2, &mut rng)] += 1;
        }

        assert_eq!(seen[0], 0);
        assert_eq!(seen[2], 0);
        assert!(seen[1] > 0 && seen[3] > 0);
    }

    #[test]
    fn test_grasp_never_builds_from_third_ranked_item() {
        // Room for exactly one item; ratios 3, 2 and 1.
        let instance = SukpInstance::new(
            "rank",
            10,
            vec![30, 20, 10],
            vec![10, 10, 10],
            vec![vec![0], vec![1], vec![2]],
        )
        .unwrap();

        let mut firsts = 0;
        let mut seconds = 0;
        for seed in 0..100 {
            let (_, selection) = construct_grasp(&instance, 1, 2, Some(seed));
            assert_eq!(selection.len(), 1);
            assert!(!selection.contains(2));
            if selection.contains(0) {
                firsts += 1;
            } else {
                seconds += 1;
            }
        }
        assert!(firsts > 0 && seconds > 0);
    }

    #[test]
    fn test_grasp_with_unit_rcl_matches_greedy() {
        for instance in [create_test_instance(), create_shared_instance()] {
            for seed in 0..5 {
                assert_eq!(construct_grasp(&instance, 3, 1, Some(seed)), construct_greedy(&instance));
            }
        }
    }

    #[test]
    fn test_seeded_constructions_are_reproducible() {
        let instance = create_shared_instance();

        assert_eq!(construct_grasp(&instance, 30, 2, Some(11)), construct_grasp(&instance, 30, 2, Some(11)));
        assert_eq!(construct_random(&instance, 30, Some(11)), construct_random(&instance, 30, Some(11)));
    }

    #[test]
    fn test_multi_start_keeps_best() {
        let instance = create_shared_instance();
        let multi = MultiStartConstruction::with_all_heuristics(Some(5));
        let solution = multi.construct(&instance);

        let (greedy_value, _) = construct_greedy(&instance);
        assert!(solution.feasible);
        assert!(solution.value >= greedy_value);
        assert_eq!(solution.algorithm, "MultiStart");
    }
}
