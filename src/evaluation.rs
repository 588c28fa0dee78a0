//! Evaluation of selections against an instance.
//!
//! Every admission and acceptance decision in the crate goes through the
//! marginal cost defined here: the weight of the resources an item requires
//! that are *not yet* required by the current selection. Resources are paid
//! once, so the naive sum of an item's requirement weights overestimates the
//! cost as soon as requirements are shared.
//!
//! Two forms are provided. The free functions work on plain sets and are the
//! reference definitions. [`ResourceCover`] keeps a per-resource reference
//! count for a selection, so marginal costs, freed weights and swap deltas
//! cost `O(|requires(p)|)` instead of a rescan of the selection.

use crate::instance::SukpInstance;
use crate::solution::{Move, Selection};
use std::collections::BTreeSet;

/// Weight of the resources of `item` for which `is_covered` is false
#[inline]
fn uncovered_weight<F>(instance: &SukpInstance, item: usize, is_covered: F) -> u64
where
    F: Fn(usize) -> bool,
{
    instance
        .requires(item)
        .iter()
        .filter(|&&d| !is_covered(d))
        .map(|&d| instance.weight(d))
        .sum()
}

/// Total profit of the selected items
pub fn value(instance: &SukpInstance, selection: &Selection) -> u64 {
    selection.iter().map(|p| instance.profit(p)).sum()
}

/// Union of the requirement sets of the selected items
pub fn required_resources(instance: &SukpInstance, selection: &Selection) -> BTreeSet<usize> {
    selection
        .iter()
        .flat_map(|p| instance.requires(p).iter().copied())
        .collect()
}

/// Weight of a resource set
pub fn resources_weight(instance: &SukpInstance, resources: &BTreeSet<usize>) -> u64 {
    resources.iter().map(|&d| instance.weight(d)).sum()
}

/// Weight of the union of resources required by the selection
pub fn weight(instance: &SukpInstance, selection: &Selection) -> u64 {
    resources_weight(instance, &required_resources(instance, selection))
}

/// Whether the selection respects the capacity
pub fn is_feasible(instance: &SukpInstance, selection: &Selection) -> bool {
    weight(instance, selection) <= instance.capacity
}

/// Weight of the resources newly required when adding `item` to a selection
/// whose required resources are `resources`
pub fn marginal_cost(instance: &SukpInstance, item: usize, resources: &BTreeSet<usize>) -> u64 {
    uncovered_weight(instance, item, |d| resources.contains(&d))
}

/// Change in weight caused by replacing `out` (selected) with `into` (not
/// selected).
///
/// Only resources that become unreferenced after removing `out` are freed;
/// resources still required by another selected item keep their weight.
pub fn swap_delta(instance: &SukpInstance, selection: &Selection, out: usize, into: usize) -> i64 {
    let before = required_resources(instance, selection);
    let after = required_resources(instance, &selection.without_item(out));
    let freed = resources_weight(instance, &before) - resources_weight(instance, &after);
    marginal_cost(instance, into, &after) as i64 - freed as i64
}

/// Reference-counted view of the resources required by a selection.
///
/// `counts[d]` is the number of selected items requiring resource `d`. The
/// cover must be rebuilt with [`ResourceCover::from_selection`] or kept in
/// step with the selection through [`add`](Self::add) and
/// [`remove`](Self::remove).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCover {
    counts: Vec<u32>,
    weight: u64,
}

impl ResourceCover {
    /// Cover of the empty selection
    pub fn new(instance: &SukpInstance) -> Self {
        ResourceCover {
            counts: vec![0; instance.num_resources()],
            weight: 0,
        }
    }

    /// Recompute the cover of a selection from scratch
    pub fn from_selection(instance: &SukpInstance, selection: &Selection) -> Self {
        let mut cover = Self::new(instance);
        for p in selection.iter() {
            cover.add(instance, p);
        }
        cover
    }

    /// Weight of the covered resources
    #[inline]
    pub fn weight(&self) -> u64 {
        self.weight
    }

    #[inline]
    pub fn is_covered(&self, resource: usize) -> bool {
        self.counts[resource] > 0
    }

    /// Covered resources in ascending order
    pub fn resources(&self) -> BTreeSet<usize> {
        (0..self.counts.len()).filter(|&d| self.counts[d] > 0).collect()
    }

    /// Weight newly required by adding `item`
    #[inline]
    pub fn marginal_cost(&self, instance: &SukpInstance, item: usize) -> u64 {
        uncovered_weight(instance, item, |d| self.is_covered(d))
    }

    /// Whether adding `item` keeps the weight within capacity
    #[inline]
    pub fn fits(&self, instance: &SukpInstance, item: usize) -> bool {
        self.weight
            .checked_add(self.marginal_cost(instance, item))
            .map_or(false, |w| w <= instance.capacity)
    }

    /// Weight released by removing `item`, which must be selected
    #[inline]
    pub fn freed_weight(&self, instance: &SukpInstance, item: usize) -> u64 {
        uncovered_weight(instance, item, |d| self.counts[d] > 1)
    }

    /// Exact weight change of replacing `out` (selected) with `into`
    fn swap_weight_change(&self, instance: &SukpInstance, out: usize, into: usize) -> i128 {
        let leaving = instance.requires(out);
        let add_cost = uncovered_weight(instance, into, |d| {
            let released = leaving.binary_search(&d).is_ok() as u32;
            self.counts[d] > released
        });
        add_cost as i128 - self.freed_weight(instance, out) as i128
    }

    /// Change in weight caused by replacing `out` (selected) with `into`
    /// (not selected), saturated to the `i64` range
    pub fn swap_delta(&self, instance: &SukpInstance, out: usize, into: usize) -> i64 {
        self.swap_weight_change(instance, out, into)
            .clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Whether replacing `out` with `into` keeps the weight within capacity
    pub fn swap_fits(&self, instance: &SukpInstance, out: usize, into: usize) -> bool {
        self.weight as i128 + self.swap_weight_change(instance, out, into) <= instance.capacity as i128
    }

    /// Register `item` as selected; returns the weight added
    pub fn add(&mut self, instance: &SukpInstance, item: usize) -> u64 {
        let mut added = 0;
        for &d in instance.requires(item) {
            if self.counts[d] == 0 {
                added += instance.weight(d);
            }
            self.counts[d] += 1;
        }
        self.weight += added;
        added
    }

    /// Unregister `item`, which must be selected; returns the weight freed
    pub fn remove(&mut self, instance: &SukpInstance, item: usize) -> u64 {
        let mut freed = 0;
        for &d in instance.requires(item) {
            debug_assert!(self.counts[d] > 0, "removing an unselected item");
            self.counts[d] -= 1;
            if self.counts[d] == 0 {
                freed += instance.weight(d);
            }
        }
        self.weight -= freed;
        freed
    }

    /// Keep the cover in step with a move applied to its selection
    pub fn apply_move(&mut self, instance: &SukpInstance, mv: Move) {
        match mv {
            Move::Add(p) => {
                self.add(instance, p);
            }
            Move::Remove(p) => {
                self.remove(instance, p);
            }
            Move::Swap { out, into } => {
                self.remove(instance, out);
                self.add(instance, into);
            }
        }
    }

    /// Change in weight a move would cause, without applying it
    pub fn move_delta(&self, instance: &SukpInstance, mv: Move) -> i64 {
        match mv {
            Move::Add(p) => self.marginal_cost(instance, p) as i64,
            Move::Remove(p) => -(self.freed_weight(instance, p) as i64),
            Move::Swap { out, into } => self.swap_delta(instance, out, into),
        }
    }
}
