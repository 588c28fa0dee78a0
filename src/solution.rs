//! Solution representation and manipulation for the SUKP.
//!
//! A [`Selection`] is a plain set of item indices. Neighbors are built as new
//! values (`with_item`, `without_item`, `with_swap`) rather than by mutating a
//! selection shared between search steps. [`Solution`] pairs a selection with
//! its cached value, weight and run metadata.

use crate::evaluation;
use crate::instance::SukpInstance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of chosen item indices.
///
/// Backed by an ordered set so that iteration order, and therefore every
/// seeded search built on top of it, is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    items: BTreeSet<usize>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Selection { items: BTreeSet::new() }
    }

    #[inline]
    pub fn contains(&self, item: usize) -> bool {
        self.items.contains(&item)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().copied()
    }

    /// The `k`-th smallest item, used to draw a uniformly random member
    pub fn nth(&self, k: usize) -> Option<usize> {
        self.items.iter().nth(k).copied()
    }

    /// Insert an item while a selection is being built
    pub fn insert(&mut self, item: usize) -> bool {
        self.items.insert(item)
    }

    /// A new selection with `item` added
    pub fn with_item(&self, item: usize) -> Selection {
        let mut next = self.clone();
        next.items.insert(item);
        next
    }

    /// A new selection with `item` removed
    pub fn without_item(&self, item: usize) -> Selection {
        let mut next = self.clone();
        next.items.remove(&item);
        next
    }

    /// A new selection with `out` replaced by `into`
    pub fn with_swap(&self, out: usize, into: usize) -> Selection {
        let mut next = self.clone();
        next.items.remove(&out);
        next.items.insert(into);
        next
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Selection { items: iter.into_iter().collect() }
    }
}

/// Represents a solution to the SUKP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Chosen items
    pub selection: Selection,
    /// Total profit of the chosen items
    pub value: u64,
    /// Weight of the union of resources required by the chosen items
    pub weight: u64,
    /// Whether the weight respects the capacity
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create the empty solution (value 0, always feasible)
    pub fn new() -> Self {
        Solution {
            selection: Selection::new(),
            value: 0,
            weight: 0,
            feasible: true,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from a selection
    pub fn from_selection(instance: &SukpInstance, selection: Selection, algorithm: &str) -> Self {
        let value = evaluation::value(instance, &selection);
        let weight = evaluation::weight(instance, &selection);

        Solution {
            selection,
            value,
            weight,
            feasible: weight <= instance.capacity,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Validate and update solution properties
    pub fn validate(&mut self, instance: &SukpInstance) {
        self.value = evaluation::value(instance, &self.selection);
        self.weight = evaluation::weight(instance, &self.selection);
        self.feasible = self.weight <= instance.capacity;
    }

    /// Number of chosen items
    pub fn num_items(&self) -> usize {
        self.selection.len()
    }

    /// Chosen items as a `0`/`1` string of length m
    pub fn items_bitstring(&self, instance: &SukpInstance) -> String {
        (0..instance.num_items())
            .map(|p| if self.selection.contains(p) { '1' } else { '0' })
            .collect()
    }

    /// Required resources as a `0`/`1` string of length n
    pub fn resources_bitstring(&self, instance: &SukpInstance) -> String {
        let required = evaluation::required_resources(instance, &self.selection);
        (0..instance.num_resources())
            .map(|d| if required.contains(&d) { '1' } else { '0' })
            .collect()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Value: {}", self.value)?;
        writeln!(f, "  Weight: {}", self.weight)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        let items: Vec<usize> = self.selection.iter().collect();
        writeln!(f, "  Items: {:?}", items)
    }
}

/// Represents a move in local search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Add(usize),
    Remove(usize),
    Swap { out: usize, into: usize },
}

impl Move {
    /// Change in value caused by the move
    pub fn value_delta(&self, instance: &SukpInstance) -> i64 {
        match *self {
            Move::Add(p) => instance.profit(p) as i64,
            Move::Remove(p) => -(instance.profit(p) as i64),
            Move::Swap { out, into } => instance.profit(into) as i64 - instance.profit(out) as i64,
        }
    }

    /// The neighbor reached by applying the move to `selection`
    pub fn apply(&self, selection: &Selection) -> Selection {
        match *self {
            Move::Add(p) => selection.with_item(p),
            Move::Remove(p) => selection.without_item(p),
            Move::Swap { out, into } => selection.with_swap(out, into),
        }
    }
}
