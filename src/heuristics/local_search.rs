//! Local search improvement heuristics for the SUKP.
//!
//! Two neighborhoods are explored around a feasible selection:
//! - Flip: remove one selected item, or add one unselected item whose
//!   marginal cost fits the remaining budget
//! - Swap: replace one selected item with one unselected item, where the
//!   weight change only credits resources that become unreferenced
//!
//! The descent tries the flip neighborhood first, falls back to swap, and
//! stops at a selection that neither can improve.

use crate::evaluation::ResourceCover;
use crate::instance::SukpInstance;
use crate::solution::{Move, Selection, Solution};
use serde::{Deserialize, Serialize};

/// Trait for local search improvement methods
pub trait LocalSearch {
    fn improve(&self, instance: &SukpInstance, solution: &mut Solution) -> bool;
    fn name(&self) -> &str;
}

/// How a neighborhood is scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementPolicy {
    /// Evaluate every neighbor, keep the best improving one
    #[default]
    Best,
    /// Take the first improving neighbor in enumeration order
    First,
}

/// Best improving flip move, if any.
///
/// Removals are scanned before additions, both in ascending item order;
/// ties keep the first move found.
pub fn best_flip(instance: &SukpInstance, selection: &Selection, cover: &ResourceCover) -> Option<Move> {
    let mut best: Option<Move> = None;
    let mut best_delta = 0i64;

    let removals = selection.iter().map(Move::Remove);
    let additions = (0..instance.num_items())
        .filter(|&p| !selection.contains(p) && cover.fits(instance, p))
        .map(Move::Add);

    for mv in removals.chain(additions) {
        let delta = mv.value_delta(instance);
        if delta > best_delta {
            best_delta = delta;
            best = Some(mv);
        }
    }

    best
}

/// Best improving feasible swap move, if any
pub fn best_swap(instance: &SukpInstance, selection: &Selection, cover: &ResourceCover) -> Option<Move> {
    let mut best: Option<Move> = None;
    let mut best_delta = 0i64;

    for out in selection.iter() {
        for into in 0..instance.num_items() {
            if selection.contains(into) || !cover.swap_fits(instance, out, into) {
                continue;
            }
            let mv = Move::Swap { out, into };
            let delta = mv.value_delta(instance);
            if delta > best_delta {
                best_delta = delta;
                best = Some(mv);
            }
        }
    }

    best
}

/// First improving flip move, scanning items in ascending order
pub fn first_flip(instance: &SukpInstance, selection: &Selection, cover: &ResourceCover) -> Option<Move> {
    (0..instance.num_items()).find_map(|p| {
        let mv = if selection.contains(p) {
            Move::Remove(p)
        } else if cover.fits(instance, p) {
            Move::Add(p)
        } else {
            return None;
        };
        (mv.value_delta(instance) > 0).then_some(mv)
    })
}

/// First improving feasible swap move, scanning selected items then
/// candidates in ascending order
pub fn first_swap(instance: &SukpInstance, selection: &Selection, cover: &ResourceCover) -> Option<Move> {
    for out in selection.iter() {
        for into in 0..instance.num_items() {
            if selection.contains(into) {
                continue;
            }
            let mv = Move::Swap { out, into };
            if mv.value_delta(instance) > 0 && cover.swap_fits(instance, out, into) {
                return Some(mv);
            }
        }
    }
    None
}

/// Next improving move under a policy: flip first, then swap
pub fn improving_move(
    instance: &SukpInstance,
    selection: &Selection,
    cover: &ResourceCover,
    policy: ImprovementPolicy,
) -> Option<Move> {
    match policy {
        ImprovementPolicy::Best => best_flip(instance, selection, cover)
            .or_else(|| best_swap(instance, selection, cover)),
        ImprovementPolicy::First => first_flip(instance, selection, cover)
            .or_else(|| first_swap(instance, selection, cover)),
    }
}

/// Whether no flip or swap move improves the selection
pub fn is_local_optimum(instance: &SukpInstance, selection: &Selection) -> bool {
    let cover = ResourceCover::from_selection(instance, selection);
    improving_move(instance, selection, &cover, ImprovementPolicy::Best).is_none()
}

/// Climb from `initial` until a local optimum; returns it with the number of
/// accepted moves
fn descend(instance: &SukpInstance, initial: &Selection, policy: ImprovementPolicy) -> (Selection, usize) {
    let mut current = initial.clone();
    let mut cover = ResourceCover::from_selection(instance, &current);
    let mut moves = 0;

    if cover.weight() > instance.capacity {
        log::warn!(
            "Local search started from an infeasible selection (weight {} > {})",
            cover.weight(),
            instance.capacity
        );
    }

    while let Some(mv) = improving_move(instance, &current, &cover, policy) {
        current = mv.apply(&current);
        cover.apply_move(instance, mv);
        moves += 1;
    }

    (current, moves)
}

/// Improve `initial` by flip/swap descent until a local optimum.
///
/// Every accepted move strictly increases the value and keeps the selection
/// feasible, so the result is never worse than `initial`.
pub fn local_search(instance: &SukpInstance, initial: &Selection, policy: ImprovementPolicy) -> Selection {
    descend(instance, initial, policy).0
}

/// Flip/swap descent as a [`LocalSearch`] operator
pub struct FlipSwapDescent {
    pub policy: ImprovementPolicy,
}

impl FlipSwapDescent {
    pub fn new() -> Self {
        FlipSwapDescent {
            policy: ImprovementPolicy::Best,
        }
    }

    pub fn first_improvement() -> Self {
        FlipSwapDescent {
            policy: ImprovementPolicy::First,
        }
    }
}

impl Default for FlipSwapDescent {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for FlipSwapDescent {
    fn improve(&self, instance: &SukpInstance, solution: &mut Solution) -> bool {
        let start = std::time::Instant::now();
        let before = solution.value;

        let (selection, moves) = descend(instance, &solution.selection, self.policy);

        solution.selection = selection;
        solution.iterations = Some(moves);
        solution.validate(instance);
        solution.computation_time += start.elapsed().as_secs_f64();

        log::debug!(
            "{}: {} moves, value {} -> {}",
            self.name(),
            moves,
            before,
            solution.value
        );
        solution.value > before
    }

    fn name(&self) -> &str {
        match self.policy {
            ImprovementPolicy::Best => "LocalSearch-BI",
            ImprovementPolicy::First => "LocalSearch-FI",
        }
    }
}
