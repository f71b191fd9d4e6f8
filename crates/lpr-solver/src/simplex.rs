use log::{debug, trace};

use crate::pivot::{self, DualStep, PivotChoice, PivotRule, PrimalStep, RatioRule};
use crate::problem::{LpProblem, Sense};
use crate::solution::{self, Phase, PivotRecord, SolveResult, SolveStatus};
use crate::tableau::Tableau;

/// Dual/primal simplex solver.
///
/// Holds configuration only; every call builds and returns its own trace.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots across both phases before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Entering-column rule for primal pivots
    pivot_rule: PivotRule,
    /// Ratio-test rule shared by dual and primal pivots
    ratio_rule: RatioRule,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            pivot_rule: PivotRule::default(),
            ratio_rule: RatioRule::default(),
        }
    }
}

/// Where the phase driver currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseState {
    RestoringFeasibility,
    Optimizing,
    Done(SolveStatus),
}

/// Tableau history of one solve.
struct Trace {
    tableaus: Vec<Tableau>,
    pivots: Vec<PivotRecord>,
}

impl Trace {
    fn new(initial: Tableau) -> Self {
        Self {
            tableaus: vec![initial],
            pivots: Vec::new(),
        }
    }

    fn current(&self) -> &Tableau {
        // Never empty: seeded with the initial tableau
        &self.tableaus[self.tableaus.len() - 1]
    }

    fn apply(&mut self, choice: PivotChoice, phase: Phase, tolerance: f64) {
        let mut next = self.current().clone();
        next.pivot(choice.row, choice.column, tolerance);
        trace!(
            "{:?} pivot on row {} col {}, objective now {}",
            phase,
            choice.row,
            choice.column,
            next.objective_value()
        );
        self.pivots.push(PivotRecord {
            row: choice.row,
            column: choice.column,
            phase,
            ratios: choice.ratios,
        });
        self.tableaus.push(next);
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Sets the comparison tolerance. Negative values are taken by
    /// magnitude; NaN keeps the current tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        if !tol.is_nan() {
            self.tolerance = tol.abs();
        }
        self
    }

    pub fn with_pivot_rule(mut self, rule: PivotRule) -> Self {
        self.pivot_rule = rule;
        self
    }

    pub fn with_ratio_rule(mut self, rule: RatioRule) -> Self {
        self.ratio_rule = rule;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Formulates `problem` and runs both phases.
    pub fn solve(&self, problem: &LpProblem) -> SolveResult {
        let tableau = Tableau::formulate(problem.objective(), problem.constraints());
        debug!(
            "formulated {} x {} tableau for {} variables, {} constraints",
            tableau.num_constraints() + 1,
            tableau.width(),
            problem.num_variables(),
            problem.num_constraints()
        );
        self.run(tableau, problem.sense())
    }

    /// Resumes from a caller-built tableau, skipping formulation.
    pub fn resume(&self, tableau: Tableau, sense: Sense) -> SolveResult {
        debug!(
            "resuming from {} x {} tableau",
            tableau.num_constraints() + 1,
            tableau.width()
        );
        self.run(tableau, sense)
    }

    /// One dual-simplex selection under this solver's rules.
    pub fn dual_step(&self, tableau: &Tableau) -> DualStep {
        pivot::dual_step(tableau, self.ratio_rule, self.tolerance)
    }

    /// One primal-simplex selection under this solver's rules.
    pub fn primal_step(&self, tableau: &Tableau, sense: Sense) -> PrimalStep {
        pivot::primal_step(tableau, sense, self.pivot_rule, self.ratio_rule, self.tolerance)
    }

    fn run(&self, tableau: Tableau, sense: Sense) -> SolveResult {
        let header = tableau.header().to_vec();
        let mut trace = Trace::new(tableau);
        let mut state = PhaseState::RestoringFeasibility;

        let status = loop {
            state = match state {
                PhaseState::Done(status) => break status,
                PhaseState::RestoringFeasibility => match self.dual_step(trace.current()) {
                    DualStep::Feasible => {
                        debug!(
                            "primal feasible after {} dual pivots",
                            trace.pivots.len()
                        );
                        PhaseState::Optimizing
                    }
                    DualStep::Infeasible { row } => {
                        debug!("row {} cannot be made feasible", row);
                        PhaseState::Done(SolveStatus::Infeasible)
                    }
                    DualStep::Pivot(_) if self.at_limit(&trace) => {
                        PhaseState::Done(SolveStatus::MaxIterationsExceeded)
                    }
                    DualStep::Pivot(choice) => {
                        trace.apply(choice, Phase::Dual, self.tolerance);
                        PhaseState::RestoringFeasibility
                    }
                },
                PhaseState::Optimizing => match self.primal_step(trace.current(), sense) {
                    PrimalStep::Optimal => PhaseState::Done(SolveStatus::Optimal),
                    PrimalStep::Unbounded { column } => {
                        debug!("column {} is unbounded", column);
                        PhaseState::Done(SolveStatus::Unbounded)
                    }
                    PrimalStep::Pivot(_) if self.at_limit(&trace) => {
                        PhaseState::Done(SolveStatus::MaxIterationsExceeded)
                    }
                    PrimalStep::Pivot(choice) => {
                        trace.apply(choice, Phase::Primal, self.tolerance);
                        // A positive-first ratio test can skip a degenerate
                        // row and drive its RHS negative
                        if trace.current().is_primal_feasible(self.tolerance) {
                            PhaseState::Optimizing
                        } else {
                            debug!("primal pivot broke feasibility, back to dual phase");
                            PhaseState::RestoringFeasibility
                        }
                    }
                },
            };
        };

        let (objective_value, variables) = match status {
            SolveStatus::Optimal => solution::extract_solution(trace.current(), self.tolerance),
            SolveStatus::Unbounded => {
                let direction = match sense {
                    Sense::Maximize => f64::INFINITY,
                    Sense::Minimize => f64::NEG_INFINITY,
                };
                (direction, Vec::new())
            }
            SolveStatus::Infeasible | SolveStatus::MaxIterationsExceeded => (f64::NAN, Vec::new()),
        };
        debug!(
            "{:?} after {} pivots, objective {}",
            status,
            trace.pivots.len(),
            objective_value
        );

        SolveResult {
            status,
            tableaus: trace.tableaus,
            pivots: trace.pivots,
            header,
            objective_value,
            variables,
        }
    }

    /// Whether another pivot would exceed the iteration limit.
    fn at_limit(&self, trace: &Trace) -> bool {
        let reached = trace.pivots.len() >= self.max_iterations;
        if reached {
            debug!("stopping after {} pivots", trace.pivots.len());
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Constraint, LpProblem};
    use approx::assert_abs_diff_eq;

    const TOL: f64 = 1e-6;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn problem(objective: Vec<f64>, sense: Sense, constraints: Vec<Constraint>) -> LpProblem {
        let mut problem = LpProblem::new(objective, sense).unwrap();
        for c in constraints {
            problem.add_constraint(c).unwrap();
        }
        problem
    }

    #[test]
    fn test_simple_maximization() {
        init();
        // Maximize: 8x + y
        // Subject to:
        //   x + y <= 40
        //   2x + y <= 60
        // Optimal: x=30, y=0, obj=240
        let problem = problem(
            vec![8.0, 1.0],
            Sense::Maximize,
            vec![Constraint::le(vec![1.0, 1.0], 40.0), Constraint::le(vec![2.0, 1.0], 60.0)],
        );
        let result = Solver::new().solve(&problem);

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(result.objective_value, 240.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[0], 30.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[1], 0.0, epsilon = TOL);
        assert_eq!(result.phases(), vec![Phase::Primal]);
        assert_eq!(result.header, ["x1", "x2", "s1", "s2", "rhs"]);
    }

    #[test]
    fn test_two_constraint_maximization() {
        init();
        // Maximize: 5x + 4y
        // Subject to:
        //   6x + 4y <= 24
        //   x + 2y <= 6
        // Optimal: x=3, y=1.5, obj=21
        let problem = problem(
            vec![5.0, 4.0],
            Sense::Maximize,
            vec![Constraint::le(vec![6.0, 4.0], 24.0), Constraint::le(vec![1.0, 2.0], 6.0)],
        );
        let result = Solver::new().solve(&problem);

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(result.objective_value, 21.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[0], 3.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[1], 1.5, epsilon = TOL);
        assert_eq!(result.tableaus.len(), result.pivots.len() + 1);
        let rows: Vec<(usize, usize)> = result.pivots.iter().map(|p| (p.row, p.column)).collect();
        assert_eq!(rows, vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn test_minimization_restores_feasibility_first() {
        init();
        // Minimize: 7x + 2y
        // Subject to:
        //   7x + 2y >= 28
        //   2x + 12y >= 24
        // Optimal: obj=28
        let problem = problem(
            vec![7.0, 2.0],
            Sense::Minimize,
            vec![Constraint::ge(vec![7.0, 2.0], 28.0), Constraint::ge(vec![2.0, 12.0], 24.0)],
        );
        let result = Solver::new().solve(&problem);

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(result.objective_value, 28.0, epsilon = TOL);
        assert_eq!(
            result.phases(),
            vec![Phase::Dual, Phase::Dual, Phase::Primal]
        );
        assert_abs_diff_eq!(result.variables[0], 3.6, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[1], 1.4, epsilon = TOL);

        // Every tableau produced by a dual pivot precedes every primal one
        let first_primal = result.phases().iter().position(|p| *p == Phase::Primal).unwrap();
        let after_dual = &result.tableaus[first_primal];
        assert!(after_dual.is_primal_feasible(1e-9));
    }

    #[test]
    fn test_minimum_ratio_rule_keeps_dual_feasibility() {
        init();
        let problem = problem(
            vec![7.0, 2.0],
            Sense::Minimize,
            vec![Constraint::ge(vec![7.0, 2.0], 28.0), Constraint::ge(vec![2.0, 12.0], 24.0)],
        );
        let result = Solver::new().with_ratio_rule(RatioRule::Minimum).solve(&problem);

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(result.objective_value, 28.0, epsilon = TOL);
        assert_eq!(result.phases(), vec![Phase::Dual, Phase::Dual]);
    }

    #[test]
    fn test_infeasible() {
        init();
        // x >= 10
        // x <= 5
        for sense in [Sense::Maximize, Sense::Minimize] {
            let problem = problem(
                vec![1.0],
                sense,
                vec![Constraint::ge(vec![1.0], 10.0), Constraint::le(vec![1.0], 5.0)],
            );
            let result = Solver::new().solve(&problem);

            assert_eq!(result.status, SolveStatus::Infeasible);
            assert!(result.objective_value.is_nan());
            assert!(result.variables.is_empty());
            // The attempted pivot is kept for replay
            assert_eq!(result.tableaus.len(), 2);
            assert_eq!(result.phases(), vec![Phase::Dual]);
        }
    }

    #[test]
    fn test_unbounded() {
        init();
        let problem = problem(
            vec![1.0, 1.0],
            Sense::Maximize,
            vec![Constraint::le(vec![1.0, -1.0], 2.0)],
        );
        let result = Solver::new().solve(&problem);

        assert_eq!(result.status, SolveStatus::Unbounded);
        assert_eq!(result.objective_value, f64::INFINITY);
        assert!(result.variables.is_empty());
        assert_eq!(result.tableaus.len(), result.pivots.len() + 1);
    }

    #[test]
    fn test_equality_constraint() {
        init();
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y = 4
        //   x <= 3
        // Optimal: x=3, y=1, obj=9
        let problem = problem(
            vec![2.0, 3.0],
            Sense::Minimize,
            vec![Constraint::equal(vec![1.0, 1.0], 4.0), Constraint::le(vec![1.0, 0.0], 3.0)],
        );
        let result = Solver::new().solve(&problem);

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(result.objective_value, 9.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[0], 3.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[1], 1.0, epsilon = TOL);
    }

    #[test]
    fn test_feasibility_and_optimality_invariants() {
        init();
        let problems = [
            problem(
                vec![48.0, 20.0, 8.0],
                Sense::Minimize,
                vec![
                    Constraint::ge(vec![8.0, 4.0, 2.0], 60.0),
                    Constraint::ge(vec![6.0, 2.0, 1.5], 30.0),
                    Constraint::ge(vec![1.0, 1.5, 0.5], 20.0),
                ],
            ),
            problem(
                vec![100.0, 30.0],
                Sense::Maximize,
                vec![
                    Constraint::ge(vec![0.0, 1.0], 3.0),
                    Constraint::le(vec![1.0, 1.0], 7.0),
                    Constraint::le(vec![10.0, 4.0], 40.0),
                ],
            ),
        ];
        for problem in &problems {
            let result = Solver::new().solve(problem);
            assert_eq!(result.status, SolveStatus::Optimal);
            let last = result.final_tableau().unwrap();
            assert!(last.is_primal_feasible(1e-9));
            assert!(last.is_optimal(problem.sense(), 1e-9));
            for (k, tab) in result.tableaus.iter().enumerate() {
                assert_eq!(tab.width(), result.header.len(), "tableau {}", k);
            }
        }
    }

    #[test]
    fn test_known_optima() {
        init();
        let min = problem(
            vec![48.0, 20.0, 8.0],
            Sense::Minimize,
            vec![
                Constraint::ge(vec![8.0, 4.0, 2.0], 60.0),
                Constraint::ge(vec![6.0, 2.0, 1.5], 30.0),
                Constraint::ge(vec![1.0, 1.5, 0.5], 20.0),
            ],
        );
        let result = Solver::new().solve(&min);
        assert_abs_diff_eq!(result.objective_value, 280.0, epsilon = TOL);

        let max = problem(
            vec![100.0, 30.0],
            Sense::Maximize,
            vec![
                Constraint::ge(vec![0.0, 1.0], 3.0),
                Constraint::le(vec![1.0, 1.0], 7.0),
                Constraint::le(vec![10.0, 4.0], 40.0),
            ],
        );
        let result = Solver::new().solve(&max);
        assert_abs_diff_eq!(result.objective_value, 370.0, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[0], 2.8, epsilon = TOL);
        assert_abs_diff_eq!(result.variables[1], 3.0, epsilon = TOL);
    }

    #[test]
    fn test_primal_step_is_idempotent_at_optimum() {
        init();
        let problem = problem(
            vec![5.0, 4.0],
            Sense::Maximize,
            vec![Constraint::le(vec![6.0, 4.0], 24.0), Constraint::le(vec![1.0, 2.0], 6.0)],
        );
        let solver = Solver::new();
        let result = solver.solve(&problem);
        let last = result.final_tableau().unwrap().clone();

        assert_eq!(solver.primal_step(&last, Sense::Maximize), PrimalStep::Optimal);
        let resumed = solver.resume(last.clone(), Sense::Maximize);
        assert!(resumed.pivots.is_empty());
        assert_eq!(resumed.tableaus, vec![last]);
        assert_abs_diff_eq!(resumed.objective_value, 21.0, epsilon = TOL);
    }

    #[test]
    fn test_sign_symmetry() {
        init();
        let constraints = vec![
            Constraint::le(vec![6.0, 4.0], 24.0),
            Constraint::le(vec![1.0, 2.0], 6.0),
            Constraint::ge(vec![1.0, 1.0], 1.0),
        ];
        let max = problem(vec![5.0, 4.0], Sense::Maximize, constraints.clone());
        let min = problem(vec![-5.0, -4.0], Sense::Minimize, constraints);

        let solver = Solver::new();
        let a = solver.solve(&max);
        let b = solver.solve(&min);
        assert_abs_diff_eq!(a.objective_value, -b.objective_value, epsilon = TOL);
        assert_eq!(a.pivots, b.pivots);
    }

    #[test]
    fn test_repeated_solves_are_identical() {
        init();
        let problem = problem(
            vec![7.0, 2.0],
            Sense::Minimize,
            vec![Constraint::ge(vec![7.0, 2.0], 28.0), Constraint::ge(vec![2.0, 12.0], 24.0)],
        );
        let solver = Solver::new();
        let first = solver.solve(&problem);
        let second = solver.solve(&problem);
        assert_eq!(first.pivots, second.pivots);
        assert_eq!(first.tableaus, second.tableaus);
    }

    #[test]
    fn test_max_iterations() {
        init();
        let problem = problem(
            vec![5.0, 4.0],
            Sense::Maximize,
            vec![Constraint::le(vec![6.0, 4.0], 24.0), Constraint::le(vec![1.0, 2.0], 6.0)],
        );
        let result = Solver::new().with_max_iterations(1).solve(&problem);

        assert_eq!(result.status, SolveStatus::MaxIterationsExceeded);
        assert!(!result.is_optimal());
        assert!(result.objective_value.is_nan());
        assert!(result.variables.is_empty());
        assert_eq!(result.pivots.len(), 1);

        // A limit that is exactly enough still reports the optimum
        let result = Solver::new().with_max_iterations(2).solve(&problem);
        assert!(result.is_optimal());
    }

    #[test]
    fn test_max_iterations_keeps_terminal_verdicts() {
        init();
        // x >= 10
        // x <= 5
        let problem = problem(
            vec![1.0],
            Sense::Maximize,
            vec![Constraint::ge(vec![1.0], 10.0), Constraint::le(vec![1.0], 5.0)],
        );
        // The only pivot fits the limit; the next selection proves infeasibility
        let result = Solver::new().with_max_iterations(1).solve(&problem);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert_eq!(result.pivots.len(), 1);

        let result = Solver::new().with_max_iterations(0).solve(&problem);
        assert_eq!(result.status, SolveStatus::MaxIterationsExceeded);
        assert_eq!(result.tableaus.len(), 1);

        // max x1 subject to x2 <= 3: unbounded without any pivot
        let unbounded = self::problem(vec![1.0, 0.0], Sense::Maximize, vec![Constraint::le(vec![0.0, 1.0], 3.0)]);
        let result = Solver::new().with_max_iterations(0).solve(&unbounded);
        assert_eq!(result.status, SolveStatus::Unbounded);
    }

    #[test]
    fn test_tolerance_is_non_negative() {
        assert_eq!(Solver::new().with_tolerance(-1e-9).tolerance(), 1e-9);
        assert_eq!(Solver::new().with_tolerance(f64::NAN).tolerance(), 1e-9);
        assert_eq!(Solver::new().with_tolerance(1e-6).tolerance(), 1e-6);

        let problem = problem(
            vec![5.0, 4.0],
            Sense::Maximize,
            vec![Constraint::le(vec![6.0, 4.0], 24.0), Constraint::le(vec![1.0, 2.0], 6.0)],
        );
        let result = Solver::new().with_tolerance(-1e-9).solve(&problem);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_abs_diff_eq!(result.objective_value, 21.0, epsilon = TOL);
    }

    #[test]
    fn test_resume_with_appended_bound() {
        init();
        // Branch x1 <= 2 on max 5x1 + 4x2: optimum moves to (2, 2) with 18
        let problem = problem(
            vec![5.0, 4.0],
            Sense::Maximize,
            vec![Constraint::le(vec![6.0, 4.0], 24.0), Constraint::le(vec![1.0, 2.0], 6.0)],
        );
        let solver = Solver::new();
        let parent = solver.solve(&problem);
        let bounded = parent
            .final_tableau()
            .unwrap()
            .with_constraint(&Constraint::le(vec![1.0, 0.0], 2.0), solver.tolerance())
            .unwrap();

        let child = solver.resume(bounded, Sense::Maximize);
        assert_eq!(child.status, SolveStatus::Optimal);
        assert_eq!(child.phases()[0], Phase::Dual);
        assert_abs_diff_eq!(child.objective_value, 18.0, epsilon = TOL);
        assert_abs_diff_eq!(child.variables[0], 2.0, epsilon = TOL);
        assert_abs_diff_eq!(child.variables[1], 2.0, epsilon = TOL);

        // x1 >= 5 cuts everything off
        let infeasible = parent
            .final_tableau()
            .unwrap()
            .with_constraint(&Constraint::ge(vec![1.0, 0.0], 5.0), solver.tolerance())
            .unwrap();
        let child = solver.resume(infeasible, Sense::Maximize);
        assert_eq!(child.status, SolveStatus::Infeasible);
        assert!(child.objective_value.is_nan());
    }

    #[test]
    fn test_bland_rule_reaches_same_optimum() {
        init();
        let problem = problem(
            vec![3.0, 5.0],
            Sense::Maximize,
            vec![
                Constraint::le(vec![1.0, 0.0], 4.0),
                Constraint::le(vec![0.0, 2.0], 12.0),
                Constraint::le(vec![3.0, 2.0], 18.0),
            ],
        );
        let dantzig = Solver::new().solve(&problem);
        let bland = Solver::new().with_pivot_rule(PivotRule::Bland).solve(&problem);

        assert_abs_diff_eq!(dantzig.objective_value, 36.0, epsilon = TOL);
        assert_abs_diff_eq!(bland.objective_value, 36.0, epsilon = TOL);
        assert_eq!(dantzig.pivots[0].column, 1);
        assert_eq!(bland.pivots[0].column, 0);
    }
}
