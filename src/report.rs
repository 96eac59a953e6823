use crate::error::AllocError;
use crate::optimizer::Outcome;
use crate::types::{
    Assignment, BinIndex, Compatibility, CompatibilityPolicy, Instance, ItemIndex, Reference,
};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DELIMITER: &str = "_______________________________________________________________";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub instance: String,
    pub solver: String,
    pub policy: CompatibilityPolicy,
    pub num_items: usize,
    pub num_bins: usize,
    pub warnings: Vec<String>,
    pub allocation: Outcome<AllocationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    pub objective: u64,
    pub bins: Vec<BinReport>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinReport {
    /// 1-based, as printed.
    pub bin: usize,
    pub capacity: u64,
    pub reference: Option<Reference>,
    pub items: Vec<ItemLine>,
    pub weight: u64,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemLine {
    pub item: ItemIndex,
    pub weight: u64,
    pub value: u64,
    pub reference: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub assigned_weight: u64,
    pub assigned_items: usize,
    pub unassigned_items: usize,
}

impl Report {
    pub fn new(
        instance_name: &str,
        solver: &str,
        instance: &Instance,
        compatibility: &Compatibility,
        outcome: &Outcome<Assignment>,
    ) -> Self {
        let allocation = outcome
            .clone()
            .map(|assignment| allocation_report(instance, compatibility, &assignment));
        Self {
            instance: instance_name.to_owned(),
            solver: solver.to_owned(),
            policy: compatibility.policy(),
            num_items: instance.num_items(),
            num_bins: instance.num_bins(),
            warnings: compatibility.warnings().iter().map(ToString::to_string).collect(),
            allocation,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_saida.txt", self.instance)
    }

    /// Write the text report into `dir`, returning the file's path.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AllocError> {
        let path = dir.as_ref().join(self.file_name());
        fs::write(&path, self.to_string()).map_err(|source| AllocError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn allocation_report(
    instance: &Instance,
    compatibility: &Compatibility,
    assignment: &Assignment,
) -> AllocationReport {
    let bins: Vec<BinReport> = (0..instance.num_bins())
        .map(|bin| bin_report(instance, compatibility, assignment, bin))
        .collect();
    let summary = Summary {
        assigned_weight: bins.iter().fold(0u64, |sum, b| sum.saturating_add(b.weight)),
        assigned_items: assignment.assigned_count(),
        unassigned_items: instance.num_items() - assignment.assigned_count(),
    };
    AllocationReport {
        objective: assignment.objective(),
        bins,
        summary,
    }
}

fn bin_report(
    instance: &Instance,
    compatibility: &Compatibility,
    assignment: &Assignment,
    bin: BinIndex,
) -> BinReport {
    let items: Vec<ItemLine> = assignment
        .items_in(bin)
        .map(|item| {
            let spec = instance.item(item);
            ItemLine {
                item,
                weight: spec.weight,
                value: spec.value,
                reference: spec.reference,
            }
        })
        .collect();
    BinReport {
        bin: bin + 1,
        capacity: instance.capacity(bin),
        reference: compatibility.bin_reference(bin),
        weight: items.iter().fold(0u64, |sum, i| sum.saturating_add(i.weight)),
        value: items.iter().fold(0u64, |sum, i| sum.saturating_add(i.value)),
        items,
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instance '{}' solved with {}:", self.instance, self.solver)?;
        writeln!(f, "  - Number of items: {}", self.num_items)?;
        writeln!(f, "  - Number of bins: {}", self.num_bins)?;
        for warning in &self.warnings {
            writeln!(f, "  - Warning: {warning}")?;
        }
        writeln!(f, "{DELIMITER}\n")?;

        let allocation = match &self.allocation {
            Outcome::Optimal(allocation) => allocation,
            other => return writeln!(f, "The problem has no optimal solution ({other})."),
        };

        writeln!(f, "Optimal solution found:")?;
        writeln!(f, "  - Total optimized value: {}", allocation.objective)?;
        writeln!(f, "{DELIMITER}\n")?;

        for bin in &allocation.bins {
            match bin.reference {
                Some(reference) => writeln!(
                    f,
                    "Bin {} (capacity: {}, reference: {reference}):",
                    bin.bin, bin.capacity
                )?,
                None => writeln!(f, "Bin {} (capacity: {}, unmapped):", bin.bin, bin.capacity)?,
            }
            for line in &bin.items {
                writeln!(
                    f,
                    "  - Item {} (value: {}, reference: {}, weight: {})",
                    line.item, line.value, line.reference, line.weight
                )?;
            }
            writeln!(f, "  Total weight in bin: {}", bin.weight)?;
            writeln!(f, "  Total value of bin: {}", bin.value)?;
            writeln!(f, "{DELIMITER}\n")?;
        }

        writeln!(f, "Final summary:")?;
        writeln!(f, "  - Total assigned weight: {}", allocation.summary.assigned_weight)?;
        writeln!(f, "  - Items assigned: {}", allocation.summary.assigned_items)?;
        writeln!(f, "  - Items not assigned: {}", allocation.summary.unassigned_items)
    }
}
