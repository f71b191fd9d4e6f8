use std::fmt;

use crate::problem::{Constraint, ProblemError, Relation, Sense};

/// Augmented simplex tableau.
///
/// Row 0 is the objective row (stored as `-c`, so its RHS is the current
/// objective value); rows `1..=m` are constraints. The last column of every
/// row is the RHS. The first `decision_vars` columns belong to the decision
/// variables, the rest to slack/excess columns.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTableau"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    rows: Vec<Vec<f64>>,
    header: Vec<String>,
    decision_vars: usize,
}

impl Tableau {
    /// Builds the initial tableau for `objective` subject to `constraints`.
    ///
    /// `>=` rows are negated into `<=` form, `=` rows become a `<=` and a
    /// `>=` row, and every constraint row `k` gets a unit entry in column
    /// `n + k - 1`, so the slack/excess columns form the starting basis. RHS
    /// entries may come out negative; the dual phase repairs them.
    ///
    /// Coefficient vectors must match `objective` in length, which
    /// [`LpProblem`](crate::LpProblem) enforces on construction.
    pub fn formulate(objective: &[f64], constraints: &[Constraint]) -> Self {
        let n = objective.len();

        let oriented: Vec<(&[f64], f64, bool)> = constraints
            .iter()
            .flat_map(|c| {
                let row = c.coefficients.as_slice();
                match c.relation {
                    Relation::LessEqual => vec![(row, c.rhs, false)],
                    Relation::GreaterEqual => vec![(row, c.rhs, true)],
                    Relation::Equal => vec![(row, c.rhs, false), (row, c.rhs, true)],
                }
            })
            .collect();

        let m = oriented.len();
        let width = n + m + 1;

        let mut header: Vec<String> = (1..=n).map(|j| format!("x{}", j)).collect();
        for (k, &(_, _, excess)) in oriented.iter().enumerate() {
            let prefix = if excess { "e" } else { "s" };
            header.push(format!("{}{}", prefix, k + 1));
        }
        header.push("rhs".to_string());

        let mut rows = vec![vec![0.0; width]; m + 1];
        for (j, &coef) in objective.iter().enumerate() {
            rows[0][j] = -coef;
        }

        for (k, &(coefficients, rhs, excess)) in oriented.iter().enumerate() {
            let sign = if excess { -1.0 } else { 1.0 };
            let row = &mut rows[k + 1];
            for (j, &coef) in coefficients.iter().enumerate() {
                row[j] = sign * coef;
            }
            row[width - 1] = sign * rhs;
            row[n + k] = 1.0;
        }

        for row in &mut rows {
            canonicalize(row, 0.0);
        }

        Self {
            rows,
            header,
            decision_vars: n,
        }
    }

    /// Wraps caller-built rows (e.g. a solved tableau with an extra cut row).
    ///
    /// Non-decision columns are labelled `s1`, `s2`, ... in order.
    pub fn from_rows(rows: Vec<Vec<f64>>, decision_vars: usize) -> Result<Self, ProblemError> {
        if rows.len() < 2 {
            return Err(ProblemError::EmptyTableau);
        }
        let width = rows[0].len();
        if decision_vars >= width {
            return Err(ProblemError::DecisionColumns {
                width,
                decision_vars,
            });
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ProblemError::RaggedTableau {
                    row: i,
                    expected: width,
                    found: row.len(),
                });
            }
            if let Some(&value) = row.iter().find(|v| !v.is_finite()) {
                return Err(ProblemError::NonFinite {
                    context: format!("tableau row {}", i),
                    value,
                });
            }
        }

        let mut header: Vec<String> = (1..=decision_vars).map(|j| format!("x{}", j)).collect();
        header.extend((1..width - decision_vars).map(|j| format!("s{}", j)));
        header.push("rhs".to_string());

        Ok(Self {
            rows,
            header,
            decision_vars,
        })
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn objective_row(&self) -> &[f64] {
        &self.rows[0]
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn decision_vars(&self) -> usize {
        self.decision_vars
    }

    /// Number of columns including RHS.
    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn num_constraints(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn rhs(&self, i: usize) -> f64 {
        self.rows[i][self.width() - 1]
    }

    /// Current objective value (RHS of row 0).
    pub fn objective_value(&self) -> f64 {
        self.rhs(0)
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    pub fn is_primal_feasible(&self, tolerance: f64) -> bool {
        (1..self.rows.len()).all(|i| self.rhs(i) >= -tolerance)
    }

    /// Whether no reduced cost can improve the objective for `sense`.
    pub fn is_optimal(&self, sense: Sense, tolerance: f64) -> bool {
        let costs = &self.rows[0][..self.width() - 1];
        match sense {
            Sense::Maximize => costs.iter().all(|&c| c >= -tolerance),
            Sense::Minimize => costs.iter().all(|&c| c <= tolerance),
        }
    }

    /// Row holding the unit entry of `col` if the column is basic: exactly one
    /// constraint-row entry equal to 1, every other entry (objective row
    /// included) equal to 0.
    pub fn basic_row(&self, col: usize, tolerance: f64) -> Option<usize> {
        if self.rows[0][col].abs() > tolerance {
            return None;
        }
        let mut found = None;
        for i in 1..self.rows.len() {
            let value = self.rows[i][col];
            if (value - 1.0).abs() <= tolerance {
                if found.is_some() {
                    return None;
                }
                found = Some(i);
            } else if value.abs() > tolerance {
                return None;
            }
        }
        found
    }

    /// Basic column for each constraint row (index 0 of the result is row 1).
    /// When several columns are unit vectors on the same row the first wins.
    pub fn basis(&self, tolerance: f64) -> Vec<Option<usize>> {
        let mut basis = vec![None; self.num_constraints()];
        for col in 0..self.width() - 1 {
            if let Some(row) = self.basic_row(col, tolerance) {
                basis[row - 1].get_or_insert(col);
            }
        }
        basis
    }

    /// Pivots on `(row, col)`: scales the pivot row to a unit pivot and
    /// eliminates the column from every other row.
    pub(crate) fn pivot(&mut self, row: usize, col: usize, tolerance: f64) {
        let pivot_val = self.rows[row][col];
        for value in &mut self.rows[row] {
            *value /= pivot_val;
        }

        let pivot_row = std::mem::take(&mut self.rows[row]);
        for (i, target) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = target[col];
            if factor != 0.0 {
                for (value, &p) in target.iter_mut().zip(&pivot_row) {
                    *value -= factor * p;
                }
            }
        }
        self.rows[row] = pivot_row;

        for r in &mut self.rows {
            canonicalize(r, tolerance);
        }
    }

    /// Appends `constraint` as a new row with its own slack (`<=`) or excess
    /// (`>=`) column, rewritten in terms of the current basis.
    ///
    /// The result can be handed back to the solver; a violated bound shows up
    /// as a negative RHS on the new row.
    pub fn with_constraint(&self, constraint: &Constraint, tolerance: f64) -> Result<Self, ProblemError> {
        constraint.validate(self.num_constraints(), self.decision_vars)?;
        let sign = match constraint.relation {
            Relation::LessEqual => 1.0,
            Relation::GreaterEqual => -1.0,
            Relation::Equal => return Err(ProblemError::EqualityAppend),
        };

        let basis = self.basis(tolerance);
        let mut rows = self.rows.clone();
        for row in &mut rows {
            let rhs = row.len() - 1;
            row.insert(rhs, 0.0);
        }
        let width = self.width() + 1;

        let mut new_row = vec![0.0; width];
        for (j, &coef) in constraint.coefficients.iter().enumerate() {
            new_row[j] = sign * coef;
        }
        new_row[width - 2] = 1.0;
        new_row[width - 1] = sign * constraint.rhs;

        for (i, basic) in basis.iter().enumerate() {
            let Some(col) = *basic else { continue };
            let factor = new_row[col];
            if factor.abs() > tolerance {
                for (value, &b) in new_row.iter_mut().zip(&rows[i + 1]) {
                    *value -= factor * b;
                }
            }
        }
        canonicalize(&mut new_row, tolerance);
        rows.push(new_row);

        let k = rows.len() - 1;
        let mut header = self.header.clone();
        let label = if sign < 0.0 { format!("e{}", k) } else { format!("s{}", k) };
        header.insert(header.len() - 1, label);

        Ok(Self {
            rows,
            header,
            decision_vars: self.decision_vars,
        })
    }
}

/// Snaps every entry within `tolerance` of zero to exactly `0.0`, which also
/// clears negative zeros.
pub(crate) fn canonicalize(row: &mut [f64], tolerance: f64) {
    for value in row {
        if value.abs() <= tolerance {
            *value = 0.0;
        }
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "")?;
        for label in &self.header {
            write!(f, "{:>10}", label)?;
        }
        writeln!(f)?;
        for (i, row) in self.rows.iter().enumerate() {
            let name = if i == 0 { "z".to_string() } else { i.to_string() };
            write!(f, "{:>6}", name)?;
            for value in row {
                write!(f, "{:>10.3}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTableau {
    rows: Vec<Vec<f64>>,
    decision_vars: usize,
    #[serde(default)]
    header: Option<Vec<String>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTableau> for Tableau {
    type Error = ProblemError;

    fn try_from(raw: RawTableau) -> Result<Self, Self::Error> {
        let mut tableau = Tableau::from_rows(raw.rows, raw.decision_vars)?;
        if let Some(header) = raw.header {
            if header.len() != tableau.width() {
                return Err(ProblemError::HeaderLength {
                    expected: tableau.width(),
                    found: header.len(),
                });
            }
            tableau.header = header;
        }
        Ok(tableau)
    }
}
