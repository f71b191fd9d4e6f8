//! Pivot selection for the dual and primal simplex steps.
//!
//! Selection only reads the tableau; the arithmetic lives in
//! [`Tableau::pivot`](crate::tableau::Tableau). Every choice between equally
//! good candidates goes through [`Candidate::precedes`], so traces are
//! reproducible.

use crate::problem::Sense;
use crate::tableau::Tableau;

/// How the primal step picks its entering column.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotRule {
    /// Most improving reduced cost, smallest index on ties
    #[default]
    Dantzig,
    /// Smallest index with an improving reduced cost
    Bland,
}

/// How a ratio test picks among non-negative ratios.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatioRule {
    /// Smallest strictly positive ratio; a zero ratio only when no positive
    /// one exists
    #[default]
    PositiveFirst,
    /// Smallest non-negative ratio, zero included
    Minimum,
}

/// A scored index. Lower values win; values within tolerance tie and the
/// lower index wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub value: f64,
    pub index: usize,
}

impl Candidate {
    pub fn new(value: f64, index: usize) -> Self {
        Self { value, index }
    }

    /// Lexicographic `(value, index)` order with tolerance-equal values.
    pub fn precedes(&self, other: &Candidate, tolerance: f64) -> bool {
        if (self.value - other.value).abs() <= tolerance {
            self.index < other.index
        } else {
            self.value < other.value
        }
    }
}

/// Best candidate under [`Candidate::precedes`].
pub fn select_min(
    candidates: impl IntoIterator<Item = Candidate>,
    tolerance: f64,
) -> Option<Candidate> {
    candidates.into_iter().fold(None, |best, c| match best {
        Some(b) if !c.precedes(&b, tolerance) => Some(b),
        _ => Some(c),
    })
}

/// Picks a pivot from `(ratio, index)` pairs. Ratios within tolerance of
/// zero count as zero; negative and infinite ratios are never chosen.
pub fn select_ratio(
    ratios: impl IntoIterator<Item = Candidate>,
    rule: RatioRule,
    tolerance: f64,
) -> Option<Candidate> {
    let eligible: Vec<Candidate> = ratios
        .into_iter()
        .filter(|c| c.value.is_finite() && c.value >= -tolerance)
        .map(|c| {
            if c.value.abs() <= tolerance {
                Candidate::new(0.0, c.index)
            } else {
                c
            }
        })
        .collect();

    match rule {
        RatioRule::Minimum => select_min(eligible, tolerance),
        RatioRule::PositiveFirst => {
            let positive = eligible.iter().copied().filter(|c| c.value > 0.0);
            select_min(positive, tolerance).or_else(|| {
                eligible
                    .iter()
                    .copied()
                    .filter(|c| c.value == 0.0)
                    .min_by_key(|c| c.index)
            })
        }
    }
}

/// A selected pivot and the ratios that led to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotChoice {
    pub row: usize,
    pub column: usize,
    /// Dual step: `|c_j / a_rj|` per non-RHS column. Primal step:
    /// `b_i / a_ij` per constraint row. Ineligible entries are infinite.
    pub ratios: Vec<f64>,
}

/// Outcome of one dual-simplex selection.
#[derive(Debug, Clone, PartialEq)]
pub enum DualStep {
    /// No RHS is below `-tolerance`
    Feasible,
    /// `row` has a negative RHS but no negative entry to pivot on
    Infeasible { row: usize },
    Pivot(PivotChoice),
}

/// Outcome of one primal-simplex selection.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimalStep {
    /// No reduced cost improves the objective
    Optimal,
    /// `column` improves the objective without bound
    Unbounded { column: usize },
    Pivot(PivotChoice),
}

/// Selects the dual-simplex pivot that repairs the most negative RHS.
pub fn dual_step(tableau: &Tableau, rule: RatioRule, tolerance: f64) -> DualStep {
    let rows = 1..=tableau.num_constraints();
    let leaving = select_min(
        rows.filter(|&i| tableau.rhs(i) < -tolerance)
            .map(|i| Candidate::new(tableau.rhs(i), i)),
        tolerance,
    );
    let Some(Candidate { index: row, .. }) = leaving else {
        return DualStep::Feasible;
    };

    let n_cols = tableau.width() - 1;
    let pivot_row = tableau.row(row);
    let objective = tableau.objective_row();

    let mut ratios = vec![f64::INFINITY; n_cols];
    for j in 0..n_cols {
        if pivot_row[j] < -tolerance {
            ratios[j] = (objective[j] / pivot_row[j]).abs();
        }
    }

    let entering = select_ratio(
        ratios.iter().enumerate().map(|(j, &r)| Candidate::new(r, j)),
        rule,
        tolerance,
    );
    match entering {
        Some(Candidate { index: column, .. }) => DualStep::Pivot(PivotChoice { row, column, ratios }),
        None => DualStep::Infeasible { row },
    }
}

/// Selects the primal-simplex pivot that improves the objective for `sense`.
///
/// The objective row holds `-c`: when maximizing, negative entries improve;
/// when minimizing, positive ones do.
pub fn primal_step(
    tableau: &Tableau,
    sense: Sense,
    pivot_rule: PivotRule,
    ratio_rule: RatioRule,
    tolerance: f64,
) -> PrimalStep {
    let n_cols = tableau.width() - 1;
    let costs = &tableau.objective_row()[..n_cols];

    // Score so that the most improving column has the lowest value
    let improving = costs.iter().enumerate().filter_map(|(j, &c)| match sense {
        Sense::Maximize if c < -tolerance => Some(Candidate::new(c, j)),
        Sense::Minimize if c > tolerance => Some(Candidate::new(-c, j)),
        _ => None,
    });
    let entering = match pivot_rule {
        PivotRule::Dantzig => select_min(improving, tolerance),
        PivotRule::Bland => improving.min_by_key(|c| c.index),
    };
    let Some(Candidate { index: column, .. }) = entering else {
        return PrimalStep::Optimal;
    };

    let ratios: Vec<f64> = (1..=tableau.num_constraints())
        .map(|i| {
            let a = tableau.row(i)[column];
            if a > tolerance {
                tableau.rhs(i) / a
            } else {
                f64::INFINITY
            }
        })
        .collect();

    let leaving = select_ratio(
        ratios.iter().enumerate().map(|(k, &r)| Candidate::new(r, k + 1)),
        ratio_rule,
        tolerance,
    );
    match leaving {
        Some(Candidate { index: row, .. }) => PrimalStep::Pivot(PivotChoice { row, column, ratios }),
        None => PrimalStep::Unbounded { column },
    }
}
