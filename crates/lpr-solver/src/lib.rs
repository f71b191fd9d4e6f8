mod pivot;
mod problem;
mod simplex;
mod solution;
mod tableau;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use pivot::{
    Candidate, DualStep, PivotChoice, PivotRule, PrimalStep, RatioRule, dual_step, primal_step, select_min,
    select_ratio,
};
pub use problem::{Constraint, LpProblem, ProblemError, Relation, Sense};
pub use simplex::Solver;
pub use solution::{Phase, PivotRecord, SolveResult, SolveStatus, extract_solution};
pub use tableau::Tableau;

/// Solves with default settings.
///
/// With `override_tableau` set, `objective` and `constraints` are not
/// formulated; the given tableau is resumed instead. Only malformed input is
/// an error; infeasible and unbounded problems are reported in the result.
pub fn solve(
    objective: &[f64],
    constraints: &[Constraint],
    sense: Sense,
    override_tableau: Option<Tableau>,
) -> Result<SolveResult, ProblemError> {
    let solver = Solver::new();
    if let Some(tableau) = override_tableau {
        return Ok(solver.resume(tableau, sense));
    }

    let mut problem = LpProblem::new(objective.to_vec(), sense)?;
    for constraint in constraints {
        problem.add_constraint(constraint.clone())?;
    }
    Ok(solver.solve(&problem))
}
