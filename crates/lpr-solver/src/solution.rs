use crate::tableau::Tableau;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal basic solution was found
    Optimal,
    /// A negative RHS row had nothing to pivot on
    Infeasible,
    /// The objective improves without bound
    Unbounded,
    /// The pivot limit was hit before either phase finished
    MaxIterationsExceeded,
}

/// Which simplex step produced a pivot.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Restoring primal feasibility
    Dual,
    /// Improving the objective
    Primal,
}

impl Phase {
    /// Numeric tag used by the browser front end (0 dual, 1 primal).
    pub fn tag(self) -> u8 {
        match self {
            Phase::Dual => 0,
            Phase::Primal => 1,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRecord {
    pub row: usize,
    pub column: usize,
    pub phase: Phase,
    /// Ratio vector the pivot was chosen from
    pub ratios: Vec<f64>,
}

/// Everything one solve produced.
///
/// `tableaus[0]` is the starting tableau and `tableaus[k]` the result of
/// `pivots[k - 1]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub tableaus: Vec<Tableau>,
    pub pivots: Vec<PivotRecord>,
    /// Column labels of the starting tableau
    pub header: Vec<String>,
    /// Optimal objective value; NaN unless a finite optimum exists, infinite
    /// in the improving direction when unbounded
    pub objective_value: f64,
    /// Decision-variable values; empty unless optimal
    pub variables: Vec<f64>,
}

impl SolveResult {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    pub fn final_tableau(&self) -> Option<&Tableau> {
        self.tableaus.last()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.pivots.iter().map(|p| p.phase).collect()
    }

    pub fn num_pivots(&self, phase: Phase) -> usize {
        self.pivots.iter().filter(|p| p.phase == phase).count()
    }
}

/// Reads the decision-variable values and objective value off a final
/// tableau. Non-basic decision variables are zero.
pub fn extract_solution(tableau: &Tableau, tolerance: f64) -> (f64, Vec<f64>) {
    let basis = tableau.basis(tolerance);
    let mut values = vec![0.0; tableau.decision_vars()];
    for (i, basic) in basis.iter().enumerate() {
        if let Some(col) = *basic {
            if col < values.len() {
                values[col] = tableau.rhs(i + 1);
            }
        }
    }
    (tableau.objective_value(), values)
}
