pub mod batch;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod optimizer;
pub mod report;
pub mod types;

pub use batch::{BatchSummary, solve_directory};
pub use config::Config;
pub use error::{AllocError, MalformedInstance};
pub use loader::{load_instance, parse_instance};
pub use model::AssignmentModel;
pub use optimizer::{CbcOptimizer, ExhaustiveOptimizer, Optimizer, Outcome, optimizer_by_name};
pub use report::Report;
pub use types::{Assignment, Compatibility, CompatibilityPolicy, Instance, Item};

use log::{error, info, warn};
use std::path::Path;

/// The compatibility table an instance was solved under, and what came of it.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub compatibility: Compatibility,
    pub outcome: Outcome<Assignment>,
}

impl Instance {
    pub fn allocate(&self, policy: CompatibilityPolicy, optimizer: &dyn Optimizer) -> Allocation {
        allocate(self, policy, optimizer)
    }
}

/// Resolve references, build the model, hand it to `optimizer` and read the
/// answer back as an assignment.
pub fn allocate(
    instance: &Instance,
    policy: CompatibilityPolicy,
    optimizer: &dyn Optimizer,
) -> Allocation {
    let compatibility = Compatibility::resolve(policy, instance);
    for warning in compatibility.warnings() {
        warn!("{warning}");
    }

    let model = AssignmentModel::build(instance, &compatibility);
    let outcome = optimizer.solve(&model);
    info!("{} finished: {outcome}", optimizer.name());

    let outcome = match outcome {
        Outcome::Optimal(selection) if !model.is_feasible(&selection) => {
            error!("{} returned a selection that breaks the model", optimizer.name());
            Outcome::Error("selection violates the model constraints".to_owned())
        }
        other => other.map(|selection| model.assignment(instance, &selection)),
    };

    Allocation {
        compatibility,
        outcome,
    }
}

/// Load one instance file and solve it with the engine called `solver`.
pub fn solve_instance(
    path: impl AsRef<Path>,
    solver: &str,
    config: &Config,
) -> Result<Report, AllocError> {
    let path = path.as_ref();
    let instance = load_instance(path)?;
    let name = instance_name(path);
    info!(
        "instance '{name}': {} items, {} bins",
        instance.num_items(),
        instance.num_bins()
    );

    let optimizer = optimizer_by_name(solver, config)?;
    let allocation = instance.allocate(config.policy, optimizer.as_ref());

    Ok(Report::new(
        &name,
        optimizer.name(),
        &instance,
        &allocation.compatibility,
        &allocation.outcome,
    ))
}

/// File name without its extension.
pub fn instance_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "instance".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::{read_dir, read_to_string};
    use std::path::PathBuf;

    #[derive(Debug, Deserialize)]
    struct Expected {
        policy: CompatibilityPolicy,
        objective: u64,
        assigned_items: usize,
    }

    // Helper function to run a test from a test file
    fn run_test_file(instance_file: &Path) {
        println!("Running test for file: {:?}", instance_file);

        let expected_file = instance_file.with_extension("yaml");
        let failure_message = format!("Failed to read expected file: {}", expected_file.display());
        let expected_yaml = read_to_string(&expected_file).expect(&failure_message);
        let failure_message = format!("Failed to parse expected YAML: {}", expected_file.display());
        let expected: Expected = serde_yaml::from_str(&expected_yaml).expect(&failure_message);

        let failure_message = format!("Failed to load instance: {}", instance_file.display());
        let instance = load_instance(instance_file).expect(&failure_message);

        let engines: [&dyn Optimizer; 2] =
            [&CbcOptimizer::default(), &ExhaustiveOptimizer::default()];
        for optimizer in engines {
            let allocation = instance.allocate(expected.policy, optimizer);
            let failure_message = format!(
                "{} found no optimum for {}",
                optimizer.name(),
                instance_file.display()
            );
            let assignment = allocation.outcome.optimal().expect(&failure_message);

            assert_eq!(
                assignment.objective(),
                expected.objective,
                "{} ({})",
                instance_file.display(),
                optimizer.name()
            );
            assert_eq!(
                assignment.assigned_count(),
                expected.assigned_items,
                "{} ({})",
                instance_file.display(),
                optimizer.name()
            );
            assert!(
                assignment
                    .violations(&instance, &allocation.compatibility)
                    .is_empty()
            );
        }
    }

    #[test]
    fn run_all_test_files() {
        let test_data_dir = Path::new("test_data");
        let mut entries: Vec<PathBuf> = read_dir(test_data_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == "txt").unwrap_or(false)
            })
            .collect();

        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        assert!(!entries.is_empty());

        for path in entries {
            run_test_file(&path);
        }
    }

    fn scenario_a() -> Instance {
        "2\n10\n5\n3\n4 10 1\n6 8 1\n5 6 2\n".parse().unwrap()
    }

    #[test]
    fn scenario_a_fills_both_bins() {
        let instance = scenario_a();
        let allocation = instance.allocate(
            CompatibilityPolicy::ReferenceMapped,
            &ExhaustiveOptimizer::default(),
        );
        let assignment = allocation.outcome.optimal().unwrap();

        assert_eq!(assignment.objective(), 24);
        assert_eq!(assignment.items_in(0).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(assignment.items_in(1).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn scenario_b_unmapped_reference_is_never_assigned() {
        let instance: Instance = "1\n10\n3\n3 5 1\n3 9 2\n2 1 1\n".parse().unwrap();
        for optimizer in [
            &CbcOptimizer::default() as &dyn Optimizer,
            &ExhaustiveOptimizer::default(),
        ] {
            let allocation = instance.allocate(CompatibilityPolicy::ReferenceMapped, optimizer);
            let assignment = allocation.outcome.optimal().unwrap();

            assert_eq!(assignment.bin_of(1), None);
            assert_eq!(assignment.objective(), 6);
            assert!(
                assignment
                    .violations(&instance, &allocation.compatibility)
                    .is_empty()
            );
        }
    }

    #[test]
    fn scenario_c_zero_items_is_optimal_and_empty() {
        let instance: Instance = "2\n10\n5\n0\n".parse().unwrap();
        let allocation = instance.allocate(
            CompatibilityPolicy::ReferenceMapped,
            &CbcOptimizer::default(),
        );
        let report = Report::new(
            "empty",
            "CBC",
            &instance,
            &allocation.compatibility,
            &allocation.outcome,
        );

        let allocation = report.allocation.optimal().unwrap();
        assert_eq!(allocation.objective, 0);
        assert!(allocation.bins.iter().all(|bin| bin.items.is_empty()));
        assert_eq!(allocation.summary.unassigned_items, 0);
    }

    #[test]
    fn zero_bins_leaves_every_item_out() {
        let instance: Instance = "0\n2\n1 1 1\n1 1 2\n".parse().unwrap();
        let allocation = instance.allocate(
            CompatibilityPolicy::DirectAddressing,
            &ExhaustiveOptimizer::default(),
        );
        let assignment = allocation.outcome.optimal().unwrap();

        assert_eq!(assignment.objective(), 0);
        assert_eq!(assignment.assigned_count(), 0);
    }

    #[test]
    fn oversized_item_is_excluded_not_an_error() {
        let instance: Instance = "1\n5\n2\n6 100 1\n5 1 1\n".parse().unwrap();
        let allocation = instance.allocate(
            CompatibilityPolicy::DirectAddressing,
            &ExhaustiveOptimizer::default(),
        );
        let assignment = allocation.outcome.optimal().unwrap();

        assert_eq!(assignment.bin_of(0), None);
        assert_eq!(assignment.bin_of(1), Some(0));
    }

    /// Deterministic pseudo-random instance.
    fn generated_instance(seed: u64, bins: usize, items: usize) -> Instance {
        let mut state = seed;
        let mut next = move |modulo: u64| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) % modulo
        };
        let capacities = (0..bins).map(|_| 5 + next(20)).collect();
        let items = (0..items)
            .map(|_| Item {
                weight: 1 + next(9),
                value: next(30),
                reference: 1 + next(bins as u64 + 1) as i64,
            })
            .collect();
        Instance::new(capacities, items)
    }

    #[test]
    fn engines_agree_and_respect_invariants() {
        for seed in 1..=6 {
            let instance = generated_instance(seed, 3, 16);
            for policy in [
                CompatibilityPolicy::ReferenceMapped,
                CompatibilityPolicy::DirectAddressing,
            ] {
                let exact = instance.allocate(policy, &ExhaustiveOptimizer::default());
                let cbc = instance.allocate(policy, &CbcOptimizer::default());
                let exact_assignment = exact.outcome.optimal().unwrap();
                let cbc_assignment = cbc.outcome.optimal().unwrap();

                for (assignment, compatibility) in [
                    (exact_assignment, &exact.compatibility),
                    (cbc_assignment, &cbc.compatibility),
                ] {
                    assert!(assignment.violations(&instance, compatibility).is_empty());
                    let assigned_value: u64 = (0..instance.num_items())
                        .filter(|&i| assignment.bin_of(i).is_some())
                        .map(|i| instance.item(i).value)
                        .sum();
                    assert_eq!(assignment.objective(), assigned_value);
                }
                assert_eq!(exact_assignment.objective(), cbc_assignment.objective());
            }
        }
    }

    #[test]
    fn repeated_solves_give_the_same_value() {
        let instance = generated_instance(42, 4, 20);
        let policy = CompatibilityPolicy::ReferenceMapped;
        let first = instance.allocate(policy, &CbcOptimizer::default());
        let second = instance.allocate(policy, &CbcOptimizer::default());

        assert_eq!(
            first.outcome.optimal().unwrap().objective(),
            second.outcome.optimal().unwrap().objective()
        );
    }

    struct Refusing;

    impl Optimizer for Refusing {
        fn name(&self) -> &str {
            "REFUSING"
        }

        fn solve(&self, _model: &AssignmentModel) -> Outcome<model::Selection> {
            Outcome::Infeasible
        }
    }

    struct Cheating;

    impl Optimizer for Cheating {
        fn name(&self) -> &str {
            "CHEATING"
        }

        fn solve(&self, model: &AssignmentModel) -> Outcome<model::Selection> {
            Outcome::Optimal(vec![true; model.num_variables()])
        }
    }

    #[test]
    fn non_optimal_status_is_kept() {
        let allocation = scenario_a().allocate(CompatibilityPolicy::ReferenceMapped, &Refusing);
        assert_eq!(allocation.outcome, Outcome::Infeasible);
    }

    #[test]
    fn infeasible_selection_is_rejected() {
        let instance: Instance = "1\n5\n2\n4 1 1\n4 1 1\n".parse().unwrap();
        let allocation = instance.allocate(CompatibilityPolicy::DirectAddressing, &Cheating);
        assert!(matches!(allocation.outcome, Outcome::Error(_)));
    }

    #[test]
    fn solve_instance_reports_by_file_stem() {
        let config = Config::default();
        let report = solve_instance("test_data/scenario_a.txt", "exhaustive", &config).unwrap();

        assert_eq!(report.instance, "scenario_a");
        assert_eq!(report.solver, "EXHAUSTIVE");
        assert_eq!(report.allocation.optimal().unwrap().objective, 24);
    }

    #[test]
    fn unknown_solver_is_unavailable() {
        let config = Config::default();
        let err = solve_instance("test_data/scenario_a.txt", "GUROBI", &config).unwrap_err();
        assert!(matches!(err, AllocError::SolverUnavailable(_)));
    }
}
