use crate::types::{Assignment, BinIndex, Compatibility, Instance, ItemIndex};
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashMap;

/// Index of a binary decision variable `x[item, bin]` in an [`AssignmentModel`].
pub type VarIndex = usize;

/// Values chosen for each variable, in variable order.
pub type Selection = Vec<bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub item: ItemIndex,
    pub bin: BinIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    SingleAssignment { item: ItemIndex },
    Capacity { bin: BinIndex },
}

/// `sum(coefficient * x[var]) <= rhs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<(VarIndex, u64)>,
    pub rhs: u64,
}

impl LinearConstraint {
    /// Exact left-hand side; `u64` coefficients cannot overflow a `u128` sum.
    pub fn lhs(&self, selection: &[bool]) -> u128 {
        self.terms
            .iter()
            .filter(|(var, _)| selection[*var])
            .map(|&(_, coefficient)| u128::from(coefficient))
            .sum()
    }

    pub fn is_satisfied(&self, selection: &[bool]) -> bool {
        self.lhs(selection) <= u128::from(self.rhs)
    }
}

/// A binary maximisation problem over compatible (item, bin) pairs.
///
/// Pairs ruled out by the compatibility table never get a variable, which
/// fixes them to zero without carrying them through the constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentModel {
    candidates: Vec<Candidate>,
    #[serde(skip)]
    lookup: HashMap<(ItemIndex, BinIndex), VarIndex>,
    objective: Vec<u64>,
    constraints: Vec<LinearConstraint>,
}

impl AssignmentModel {
    pub fn build(instance: &Instance, compatibility: &Compatibility) -> Self {
        let (candidates, lookup) = init_variables(instance, compatibility);
        let objective = create_objective(instance, &candidates);

        let mut constraints = constrain_single_assignment(instance, &lookup, compatibility);
        constraints.extend(constrain_bin_capacities(instance, &candidates));

        debug!(
            "model has {} variables out of {} item/bin pairs and {} constraints",
            candidates.len(),
            instance.num_items() * instance.num_bins(),
            constraints.len()
        );

        Self {
            candidates,
            lookup,
            objective,
            constraints,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn num_variables(&self) -> usize {
        self.candidates.len()
    }

    /// The variable for `x[item, bin]`, or `None` if the pair is fixed to zero.
    pub fn variable(&self, item: ItemIndex, bin: BinIndex) -> Option<VarIndex> {
        self.lookup.get(&(item, bin)).copied()
    }

    pub fn objective(&self) -> &[u64] {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Saturates at `u64::MAX`.
    pub fn objective_value(&self, selection: &[bool]) -> u64 {
        self.objective
            .iter()
            .zip(selection)
            .filter(|(_, chosen)| **chosen)
            .fold(0u64, |sum, (&coefficient, _)| sum.saturating_add(coefficient))
    }

    pub fn is_feasible(&self, selection: &[bool]) -> bool {
        selection.len() == self.num_variables()
            && self.constraints.iter().all(|c| c.is_satisfied(selection))
    }

    /// Read an optimizer's variable values back as an item-to-bin assignment.
    pub fn assignment(&self, instance: &Instance, selection: &[bool]) -> Assignment {
        let mut bins = vec![None; instance.num_items()];
        for (candidate, _) in self
            .candidates
            .iter()
            .zip(selection)
            .filter(|(_, chosen)| **chosen)
        {
            bins[candidate.item] = Some(candidate.bin);
        }
        Assignment::new(bins, instance)
    }
}

type ItemBinToVariableMap = HashMap<(ItemIndex, BinIndex), VarIndex>;

fn init_variables(
    instance: &Instance,
    compatibility: &Compatibility,
) -> (Vec<Candidate>, ItemBinToVariableMap) {
    let mut candidates = Vec::new();
    let mut lookup = HashMap::new();

    for (item, spec) in instance.items().iter().enumerate() {
        let Some(bin) = compatibility.resolve_reference(spec.reference) else {
            trace!("item {item} (reference {}) has no bin", spec.reference);
            continue;
        };
        if bin >= instance.num_bins() {
            continue;
        }
        lookup.insert((item, bin), candidates.len());
        candidates.push(Candidate { item, bin });
    }

    (candidates, lookup)
}

/// Every placed item contributes its own value, whichever bin it lands in.
fn create_objective(instance: &Instance, candidates: &[Candidate]) -> Vec<u64> {
    candidates
        .iter()
        .map(|c| instance.item(c.item).value)
        .collect()
}

/// Each item goes to at most one bin.
fn constrain_single_assignment(
    instance: &Instance,
    lookup: &ItemBinToVariableMap,
    compatibility: &Compatibility,
) -> Vec<LinearConstraint> {
    instance
        .items()
        .iter()
        .enumerate()
        .filter_map(|(item, spec)| {
            // A reference resolves to at most one bin, so this is zero or one term.
            let terms: Vec<(VarIndex, u64)> = compatibility
                .resolve_reference(spec.reference)
                .and_then(|bin| lookup.get(&(item, bin)))
                .map(|&var| (var, 1))
                .into_iter()
                .collect();
            (!terms.is_empty()).then_some(LinearConstraint {
                kind: ConstraintKind::SingleAssignment { item },
                terms,
                rhs: 1,
            })
        })
        .collect()
}

/// Weight placed in a bin stays within its capacity.
fn constrain_bin_capacities(
    instance: &Instance,
    candidates: &[Candidate],
) -> Vec<LinearConstraint> {
    let mut terms_by_bin: Vec<Vec<(VarIndex, u64)>> = vec![Vec::new(); instance.num_bins()];
    for (var, candidate) in candidates.iter().enumerate() {
        terms_by_bin[candidate.bin].push((var, instance.item(candidate.item).weight));
    }

    terms_by_bin
        .into_iter()
        .enumerate()
        .filter(|(_, terms)| !terms.is_empty())
        .map(|(bin, terms)| LinearConstraint {
            kind: ConstraintKind::Capacity { bin },
            terms,
            rhs: instance.capacity(bin),
        })
        .collect()
}
