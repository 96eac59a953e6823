use crate::config::Config;
use crate::error::AllocError;
use crate::model::{AssignmentModel, LinearConstraint, Selection};
use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::solvers::{SolutionStatus, WithTimeLimit};
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution as LpSolution, SolverModel, Variable,
    variable,
};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

/// Terminal state of a solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Optimal(T),
    Infeasible,
    Unbounded,
    Error(String),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Optimal(solution) => Outcome::Optimal(f(solution)),
            Outcome::Infeasible => Outcome::Infeasible,
            Outcome::Unbounded => Outcome::Unbounded,
            Outcome::Error(reason) => Outcome::Error(reason),
        }
    }

    pub fn optimal(&self) -> Option<&T> {
        match self {
            Outcome::Optimal(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, Outcome::Optimal(_))
    }
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Optimal(_) => write!(f, "optimal"),
            Outcome::Infeasible => write!(f, "infeasible"),
            Outcome::Unbounded => write!(f, "unbounded"),
            Outcome::Error(reason) => write!(f, "solver error: {reason}"),
        }
    }
}

/// An engine that maximises an [`AssignmentModel`].
pub trait Optimizer {
    fn name(&self) -> &str;

    fn solve(&self, model: &AssignmentModel) -> Outcome<Selection>;
}

/// Look up an engine by name, ignoring case.
pub fn optimizer_by_name(name: &str, config: &Config) -> Result<Box<dyn Optimizer>, AllocError> {
    match name.to_ascii_uppercase().as_str() {
        "CBC" | "COIN_CBC" => Ok(Box::new(CbcOptimizer {
            time_limit: config.time_limit,
        })),
        "EXHAUSTIVE" | "BRUTE_FORCE" => Ok(Box::new(ExhaustiveOptimizer {
            max_variables: config.exhaustive_limit,
        })),
        _ => Err(AllocError::SolverUnavailable(name.to_owned())),
    }
}

/// Mixed integer solving through COIN-OR CBC.
#[derive(Debug, Clone, Default)]
pub struct CbcOptimizer {
    /// Seconds handed to CBC as-is.
    pub time_limit: Option<f64>,
}

impl Optimizer for CbcOptimizer {
    fn name(&self) -> &str {
        "CBC"
    }

    fn solve(&self, model: &AssignmentModel) -> Outcome<Selection> {
        if model.num_variables() == 0 {
            return Outcome::Optimal(Vec::new());
        }

        let mut problem_vars = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .candidates()
            .iter()
            .map(|_| problem_vars.add(variable().binary()))
            .collect();

        let objective = vars
            .iter()
            .zip(model.objective())
            .fold(Expression::from(0.0), |sum, (&var, &value)| {
                sum + var * (value as f64)
            });

        let mut lp = problem_vars.maximise(objective).using(coin_cbc);
        #[cfg(not(debug_assertions))]
        lp.set_parameter("loglevel", "0");
        if let Some(seconds) = self.time_limit {
            lp = lp.with_time_limit(seconds);
        }

        let lp = model.constraints().iter().fold(lp, |m, constraint| {
            m.with(linear_expression(constraint, &vars).leq(constraint.rhs as f64))
        });

        info!("solving {} variables with CBC", vars.len());
        match lp.solve() {
            Ok(solution) => {
                let selection = vars.iter().map(|&var| solution.value(var) > 0.5).collect();
                status_outcome(solution.status(), selection)
            }
            Err(err) => error_outcome(err),
        }
    }
}

/// Only a proven optimum is reported as such; a solve cut short keeps its
/// incumbent out of the report.
fn status_outcome(status: SolutionStatus, selection: Selection) -> Outcome<Selection> {
    match status {
        SolutionStatus::Optimal => Outcome::Optimal(selection),
        SolutionStatus::TimeLimit => {
            Outcome::Error("time limit reached before optimality was proven".to_owned())
        }
        other => Outcome::Error(format!("stopped before optimality was proven ({other:?})")),
    }
}

fn error_outcome(err: ResolutionError) -> Outcome<Selection> {
    match err {
        ResolutionError::Infeasible => Outcome::Infeasible,
        ResolutionError::Unbounded => Outcome::Unbounded,
        err => Outcome::Error(err.to_string()),
    }
}

fn linear_expression(constraint: &LinearConstraint, vars: &[Variable]) -> Expression {
    constraint
        .terms
        .iter()
        .fold(Expression::from(0.0), |sum, &(var, coefficient)| {
            sum + vars[var] * (coefficient as f64)
        })
}

/// Exact depth-first search for small models, with no external engine.
///
/// Variables are branched in model order, taking each one before leaving it
/// out, so ties always resolve to the same selection.
#[derive(Debug, Clone)]
pub struct ExhaustiveOptimizer {
    pub max_variables: usize,
}

impl Default for ExhaustiveOptimizer {
    fn default() -> Self {
        Self { max_variables: 24 }
    }
}

impl Optimizer for ExhaustiveOptimizer {
    fn name(&self) -> &str {
        "EXHAUSTIVE"
    }

    fn solve(&self, model: &AssignmentModel) -> Outcome<Selection> {
        let n = model.num_variables();
        if n > self.max_variables {
            return Outcome::Error(format!(
                "{n} variables exceed the exhaustive limit of {}",
                self.max_variables
            ));
        }

        let mut memberships: Vec<Vec<(usize, u128)>> = vec![Vec::new(); n];
        for (index, constraint) in model.constraints().iter().enumerate() {
            for &(var, coefficient) in &constraint.terms {
                memberships[var].push((index, u128::from(coefficient)));
            }
        }
        let mut remaining = vec![0u64; n + 1];
        for var in (0..n).rev() {
            remaining[var] = remaining[var + 1].saturating_add(model.objective()[var]);
        }

        let mut search = Search {
            model,
            memberships,
            remaining,
            loads: vec![0; model.constraints().len()],
            current: vec![false; n],
            best: vec![false; n],
            best_value: 0,
            nodes: 0,
        };
        search.branch(0, 0);
        debug!(
            "exhaustive search visited {} nodes, best value {}",
            search.nodes, search.best_value
        );
        Outcome::Optimal(search.best)
    }
}

struct Search<'a> {
    model: &'a AssignmentModel,
    memberships: Vec<Vec<(usize, u128)>>,
    remaining: Vec<u64>,
    /// Exact, a sum of `u64` coefficients cannot overflow `u128`.
    loads: Vec<u128>,
    current: Selection,
    best: Selection,
    best_value: u64,
    nodes: u64,
}

impl Search<'_> {
    fn branch(&mut self, var: usize, value: u64) {
        self.nodes += 1;
        if value > self.best_value {
            self.best_value = value;
            self.best.clone_from(&self.current);
        }
        if var == self.current.len()
            || value.saturating_add(self.remaining[var]) <= self.best_value
        {
            return;
        }

        let constraints = self.model.constraints();
        let fits = self.memberships[var]
            .iter()
            .all(|&(c, coefficient)| self.loads[c] + coefficient <= u128::from(constraints[c].rhs));
        if fits {
            for &(c, coefficient) in &self.memberships[var] {
                self.loads[c] += coefficient;
            }
            self.current[var] = true;
            self.branch(var + 1, value.saturating_add(self.model.objective()[var]));
            self.current[var] = false;
            for &(c, coefficient) in &self.memberships[var] {
                self.loads[c] -= coefficient;
            }
        }
        self.branch(var + 1, value);
    }
}
