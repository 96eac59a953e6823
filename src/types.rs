use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

pub type ItemIndex = usize;
pub type BinIndex = usize;
pub type Reference = i64;

/// A student waiting for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub weight: u64,
    pub value: u64,
    pub reference: Reference,
}

/// A parsed instance file. Items and bins are identified by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    capacities: Vec<u64>,
    items: Vec<Item>,
}

impl Instance {
    pub fn new(capacities: Vec<u64>, items: Vec<Item>) -> Self {
        Self { capacities, items }
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_bins(&self) -> usize {
        self.capacities.len()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, index: ItemIndex) -> &Item {
        &self.items[index]
    }

    pub fn capacities(&self) -> &[u64] {
        &self.capacities
    }

    pub fn capacity(&self, bin: BinIndex) -> u64 {
        self.capacities[bin]
    }

    /// Distinct item references in ascending order.
    pub fn distinct_references(&self) -> Vec<Reference> {
        self.items
            .iter()
            .map(|item| item.reference)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// How an item's reference selects the bin it may enter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityPolicy {
    /// The k-th smallest distinct reference belongs to bin k.
    #[default]
    ReferenceMapped,
    /// A reference is the 1-based number of the bin.
    DirectAddressing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingWarning {
    /// Bins left without a reference; nothing can ever be placed in them.
    UnmappedBins { bins: Vec<BinIndex> },
    /// Item references that no bin answers to.
    UnresolvedReferences { references: Vec<Reference> },
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingWarning::UnmappedBins { bins } => {
                let numbers: Vec<String> = bins.iter().map(|b| (b + 1).to_string()).collect();
                write!(
                    f,
                    "{} bin(s) have no reference and stay empty: {}",
                    bins.len(),
                    numbers.join(", ")
                )
            }
            MappingWarning::UnresolvedReferences { references } => {
                let refs: Vec<String> = references.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "{} reference(s) match no bin, their items cannot be placed: {}",
                    references.len(),
                    refs.join(", ")
                )
            }
        }
    }
}

/// The resolved reference-to-bin table of an instance under a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compatibility {
    policy: CompatibilityPolicy,
    bin_references: Vec<Option<Reference>>,
    bins_by_reference: BTreeMap<Reference, BinIndex>,
    warnings: Vec<MappingWarning>,
}

impl Compatibility {
    pub fn resolve(policy: CompatibilityPolicy, instance: &Instance) -> Self {
        let num_bins = instance.num_bins();
        let bin_references: Vec<Option<Reference>> = match policy {
            CompatibilityPolicy::ReferenceMapped => {
                let mut distinct = instance.distinct_references().into_iter();
                (0..num_bins).map(|_| distinct.next()).collect()
            }
            CompatibilityPolicy::DirectAddressing => {
                (0..num_bins).map(|b| Reference::try_from(b + 1).ok()).collect()
            }
        };
        let bins_by_reference = bin_references
            .iter()
            .enumerate()
            .filter_map(|(bin, reference)| reference.map(|r| (r, bin)))
            .collect::<BTreeMap<_, _>>();

        let mut warnings = Vec::new();
        let unmapped: Vec<BinIndex> = bin_references
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(bin, _)| bin)
            .collect();
        if !unmapped.is_empty() {
            warnings.push(MappingWarning::UnmappedBins { bins: unmapped });
        }
        let unresolved: Vec<Reference> = instance
            .distinct_references()
            .into_iter()
            .filter(|r| !bins_by_reference.contains_key(r))
            .collect();
        if !unresolved.is_empty() {
            warnings.push(MappingWarning::UnresolvedReferences {
                references: unresolved,
            });
        }

        Self {
            policy,
            bin_references,
            bins_by_reference,
            warnings,
        }
    }

    pub fn policy(&self) -> CompatibilityPolicy {
        self.policy
    }

    /// The bin an item with `reference` may enter, if any.
    pub fn resolve_reference(&self, reference: Reference) -> Option<BinIndex> {
        self.bins_by_reference.get(&reference).copied()
    }

    pub fn bin_reference(&self, bin: BinIndex) -> Option<Reference> {
        self.bin_references.get(bin).copied().flatten()
    }

    pub fn bin_references(&self) -> &[Option<Reference>] {
        &self.bin_references
    }

    pub fn is_compatible(&self, item: &Item, bin: BinIndex) -> bool {
        self.resolve_reference(item.reference) == Some(bin)
    }

    pub fn warnings(&self) -> &[MappingWarning] {
        &self.warnings
    }
}

/// Items mapped to at most one bin each, with the value they collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    bins: Vec<Option<BinIndex>>,
    objective: u64,
}

impl Assignment {
    /// The objective saturates at `u64::MAX`.
    pub fn new(bins: Vec<Option<BinIndex>>, instance: &Instance) -> Self {
        let objective = bins
            .iter()
            .zip(instance.items())
            .filter(|(bin, _)| bin.is_some())
            .fold(0u64, |sum, (_, item)| sum.saturating_add(item.value));
        Self { bins, objective }
    }

    pub fn bin_of(&self, item: ItemIndex) -> Option<BinIndex> {
        self.bins.get(item).copied().flatten()
    }

    pub fn items_in(&self, bin: BinIndex) -> impl Iterator<Item = ItemIndex> + '_ {
        self.bins
            .iter()
            .enumerate()
            .filter(move |(_, b)| **b == Some(bin))
            .map(|(item, _)| item)
    }

    pub fn assigned_count(&self) -> usize {
        self.bins.iter().filter(|b| b.is_some()).count()
    }

    pub fn objective(&self) -> u64 {
        self.objective
    }

    /// Every way this assignment breaks the capacity or compatibility rules.
    pub fn violations(&self, instance: &Instance, compatibility: &Compatibility) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.bins.len() != instance.num_items() {
            violations.push(Violation::ItemCount {
                expected: instance.num_items(),
                found: self.bins.len(),
            });
        }
        let mut loads = vec![0u128; instance.num_bins()];
        for (item, bin) in self.bins.iter().enumerate() {
            let Some(bin) = *bin else { continue };
            if bin >= instance.num_bins() {
                violations.push(Violation::UnknownBin { item, bin });
                continue;
            }
            if let Some(spec) = instance.items().get(item) {
                if !compatibility.is_compatible(spec, bin) {
                    violations.push(Violation::Incompatible { item, bin });
                }
                loads[bin] += u128::from(spec.weight);
            }
        }
        for (bin, (&load, &capacity)) in loads.iter().zip(instance.capacities()).enumerate() {
            if load > u128::from(capacity) {
                violations.push(Violation::OverCapacity {
                    bin,
                    load,
                    capacity,
                });
            }
        }
        violations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("assignment covers {found} items, instance has {expected}")]
    ItemCount { expected: usize, found: usize },
    #[error("item {item} placed in nonexistent bin {bin}")]
    UnknownBin { item: ItemIndex, bin: BinIndex },
    #[error("item {item} placed in bin {bin} its reference does not resolve to")]
    Incompatible { item: ItemIndex, bin: BinIndex },
    #[error("bin {bin} holds weight {load} over its capacity {capacity}")]
    OverCapacity {
        bin: BinIndex,
        load: u128,
        capacity: u64,
    },
}
