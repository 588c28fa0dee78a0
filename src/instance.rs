//! Module for parsing and representing SUKP instances.
//!
//! An instance is a set of items, each with a profit and a set of required
//! resources, a set of resources, each with a weight, and a capacity bounding
//! the total weight of the union of resources required by the chosen items.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Errors raised while building or loading an instance
#[derive(Debug)]
pub enum InstanceError {
    /// The instance file could not be read
    Io(std::io::Error),
    /// The header line `m n ne b` is missing or incomplete
    MissingHeader,
    /// A token could not be parsed as a non-negative integer
    InvalidNumber { token: String, section: &'static str },
    /// A header count too large to describe any instance
    HeaderTooLarge { field: &'static str, value: usize },
    /// A section ended before the expected number of values was read
    Truncated { section: &'static str, expected: usize, found: usize },
    /// An item index outside `[0, m)`
    ItemOutOfRange { item: usize, items: usize },
    /// A resource index outside `[0, n)`
    ResourceOutOfRange { item: usize, resource: usize, resources: usize },
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceError::Io(e) => write!(f, "Cannot read instance: {}", e),
            InstanceError::MissingHeader => write!(f, "Missing header line `m n ne b`"),
            InstanceError::InvalidNumber { token, section } => {
                write!(f, "Invalid number '{}' in {}", token, section)
            }
            InstanceError::HeaderTooLarge { field, value } => {
                write!(f, "Header field {} = {} is too large", field, value)
            }
            InstanceError::Truncated { section, expected, found } => write!(
                f,
                "Section {} expected {} values but found {}",
                section, expected, found
            ),
            InstanceError::ItemOutOfRange { item, items } => {
                write!(f, "Item index {} out of range (m = {})", item, items)
            }
            InstanceError::ResourceOutOfRange { item, resource, resources } => write!(
                f,
                "Item {} requires resource {} out of range (n = {})",
                item, resource, resources
            ),
        }
    }
}

impl std::error::Error for InstanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstanceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InstanceError {
    fn from(e: std::io::Error) -> Self {
        InstanceError::Io(e)
    }
}

/// A complete, validated SUKP instance. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct SukpInstance {
    /// Name of the instance (file stem when loaded from disk)
    pub name: String,
    /// Weight budget for the union of required resources
    pub capacity: u64,
    /// Profit of each item
    profits: Vec<u64>,
    /// Weight of each resource
    weights: Vec<u64>,
    /// Requirement set of each item, sorted and deduplicated
    requires: Vec<Vec<usize>>,
}

impl SukpInstance {
    /// Build an instance from in-memory data.
    ///
    /// The number of items is `profits.len()` and must match `requires.len()`;
    /// the number of resources is `weights.len()`. Requirement sets are sorted
    /// and deduplicated.
    pub fn new(
        name: &str,
        capacity: u64,
        profits: Vec<u64>,
        weights: Vec<u64>,
        requires: Vec<Vec<usize>>,
    ) -> Result<Self, InstanceError> {
        if requires.len() != profits.len() {
            return Err(InstanceError::Truncated {
                section: "requirements",
                expected: profits.len(),
                found: requires.len(),
            });
        }

        let resources = weights.len();
        let mut normalized = Vec::with_capacity(requires.len());
        for (item, mut set) in requires.into_iter().enumerate() {
            if let Some(&resource) = set.iter().find(|&&d| d >= resources) {
                return Err(InstanceError::ResourceOutOfRange { item, resource, resources });
            }
            set.sort_unstable();
            set.dedup();
            normalized.push(set);
        }

        Ok(SukpInstance {
            name: name.to_string(),
            capacity,
            profits,
            weights,
            requires: normalized,
        })
    }

    /// Parse an instance from a file in the `m n ne b` text format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse(&name, &text)
    }

    /// Parse an instance from text.
    ///
    /// Layout: header `m n ne b`, then `m` profits, `n` weights and `ne`
    /// pairs `p d` meaning item `p` requires resource `d` (0-based).
    pub fn parse(name: &str, text: &str) -> Result<Self, InstanceError> {
        let mut tokens = text.split_whitespace();

        let mut header = [0usize; 4];
        for slot in header.iter_mut() {
            let token = tokens.next().ok_or(InstanceError::MissingHeader)?;
            *slot = parse_number(token, "header")?;
        }
        let [m, n, ne, b] = header;

        let profits = read_section(&mut tokens, m, "profits")?;
        let weights = read_section(&mut tokens, n, "weights")?;
        let pair_tokens = ne
            .checked_mul(2)
            .ok_or(InstanceError::HeaderTooLarge { field: "ne", value: ne })?;
        let pairs: Vec<usize> = read_section(&mut tokens, pair_tokens, "requirements")?;

        let mut requires = vec![Vec::new(); m];
        for pair in pairs.chunks_exact(2) {
            let (item, resource) = (pair[0], pair[1]);
            if item >= m {
                return Err(InstanceError::ItemOutOfRange { item, items: m });
            }
            requires[item].push(resource);
        }

        Self::new(name, b as u64, profits, weights, requires)
    }

    /// Number of items (m)
    #[inline]
    pub fn num_items(&self) -> usize {
        self.profits.len()
    }

    /// Number of resources (n)
    #[inline]
    pub fn num_resources(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn profit(&self, item: usize) -> u64 {
        self.profits[item]
    }

    #[inline]
    pub fn weight(&self, resource: usize) -> u64 {
        self.weights[resource]
    }

    /// Sorted requirement set of an item
    #[inline]
    pub fn requires(&self, item: usize) -> &[usize] {
        &self.requires[item]
    }

    pub fn profits(&self) -> &[u64] {
        &self.profits
    }

    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    /// Sum of the weights of an item's own requirement set, ignoring sharing
    pub fn standalone_weight(&self, item: usize) -> u64 {
        self.requires[item].iter().map(|&d| self.weights[d]).sum()
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let num_items = self.num_items();
        let total_pairs: usize = self.requires.iter().map(Vec::len).sum();
        let avg_requirements = if num_items > 0 {
            total_pairs as f64 / num_items as f64
        } else {
            0.0
        };
        let items_fitting_alone = (0..num_items)
            .filter(|&p| self.standalone_weight(p) <= self.capacity)
            .count();

        InstanceStatistics {
            name: self.name.clone(),
            num_items,
            num_resources: self.num_resources(),
            num_pairs: total_pairs,
            capacity: self.capacity,
            total_profit: self.profits.iter().sum(),
            total_weight: self.weights.iter().sum(),
            avg_requirements,
            items_fitting_alone,
        }
    }
}

fn parse_number<T: std::str::FromStr>(token: &str, section: &'static str) -> Result<T, InstanceError> {
    token.parse().map_err(|_| InstanceError::InvalidNumber {
        token: token.to_string(),
        section,
    })
}

/// Upper bound on the capacity reserved from an unchecked header count
const PREALLOC_LIMIT: usize = 1 << 16;

fn read_section<'a, T, I>(tokens: &mut I, count: usize, section: &'static str) -> Result<Vec<T>, InstanceError>
where
    T: std::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    let mut values = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for _ in 0..count {
        let token = tokens.next().ok_or_else(|| InstanceError::Truncated {
            section,
            expected: count,
            found: values.len(),
        })?;
        values.push(parse_number(token, section)?);
    }
    Ok(values)
}

/// Statistics about a SUKP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_items: usize,
    pub num_resources: usize,
    pub num_pairs: usize,
    pub capacity: u64,
    pub total_profit: u64,
    pub total_weight: u64,
    pub avg_requirements: f64,
    pub items_fitting_alone: usize,
}

impl fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Items: {}", self.num_items)?;
        writeln!(f, "  Resources: {}", self.num_resources)?;
        writeln!(f, "  Item/resource pairs: {}", self.num_pairs)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Total profit (items): {}", self.total_profit)?;
        writeln!(f, "  Total weight (resources): {}", self.total_weight)?;
        writeln!(f, "  Avg requirements per item: {:.2}", self.avg_requirements)?;
        writeln!(f, "  Items fitting alone: {}", self.items_fitting_alone)
    }
}
