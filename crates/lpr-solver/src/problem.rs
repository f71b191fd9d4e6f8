use thiserror::Error;

/// Rejected input: raised when a problem, constraint or caller-built tableau
/// is constructed, never while solving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Objective has no coefficients")]
    EmptyObjective,
    #[error("Constraint {index} has {found} coefficients, expected {expected}")]
    CoefficientCount {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value {value} in {context}")]
    NonFinite { context: String, value: f64 },
    #[error("Unknown relation tag: {0}")]
    UnknownRelation(f64),
    #[error("Raw constraint row needs at least an RHS and a relation tag, got {0} values")]
    ShortRow(usize),
    #[error("Tableau needs an objective row and at least one constraint row")]
    EmptyTableau,
    #[error("Tableau row {row} has {found} columns, expected {expected}")]
    RaggedTableau {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Tableau header has {found} labels, expected {expected}")]
    HeaderLength { expected: usize, found: usize },
    #[error("Tableau with {width} columns cannot hold {decision_vars} decision variables")]
    DecisionColumns { width: usize, decision_vars: usize },
    #[error("Equality rows cannot be appended to a tableau; append a <= and a >= row instead")]
    EqualityAppend,
}

/// Direction of optimization.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    #[cfg_attr(feature = "serde", serde(alias = "min", alias = "Min"))]
    Minimize,
    #[cfg_attr(feature = "serde", serde(alias = "max", alias = "Max"))]
    Maximize,
}

/// Comparison between a constraint's left-hand side and its RHS.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "le", alias = "<="))]
    LessEqual,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = "ge", alias = ">="))]
    GreaterEqual,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "eq", alias = "="))]
    Equal,
}

impl Relation {
    /// Decodes the numeric tag used by the browser front end:
    /// `0` is `<=`, `1` is `>=`, `2` is `=`.
    pub fn from_tag(tag: f64) -> Result<Self, ProblemError> {
        match tag {
            t if t == 0.0 => Ok(Relation::LessEqual),
            t if t == 1.0 => Ok(Relation::GreaterEqual),
            t if t == 2.0 => Ok(Relation::Equal),
            t => Err(ProblemError::UnknownRelation(t)),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Relation::LessEqual => 0,
            Relation::GreaterEqual => 1,
            Relation::Equal => 2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::LessEqual => "<=",
            Relation::GreaterEqual => ">=",
            Relation::Equal => "=",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Coefficients for each decision variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub relation: Relation,
    /// Right-hand side value
    pub rhs: f64,
}

impl Constraint {
    pub fn new(coefficients: Vec<f64>, relation: Relation, rhs: f64) -> Self {
        Self {
            coefficients,
            relation,
            rhs,
        }
    }

    pub fn le(coefficients: Vec<f64>, rhs: f64) -> Self {
        Self::new(coefficients, Relation::LessEqual, rhs)
    }

    pub fn ge(coefficients: Vec<f64>, rhs: f64) -> Self {
        Self::new(coefficients, Relation::GreaterEqual, rhs)
    }

    pub fn equal(coefficients: Vec<f64>, rhs: f64) -> Self {
        Self::new(coefficients, Relation::Equal, rhs)
    }

    /// Builds a constraint from a raw row `[a_1, .., a_n, rhs, tag]`.
    pub fn from_row(row: &[f64]) -> Result<Self, ProblemError> {
        let [coefficients @ .., rhs, tag] = row else {
            return Err(ProblemError::ShortRow(row.len()));
        };
        let relation = Relation::from_tag(*tag)?;
        Ok(Self::new(coefficients.to_vec(), relation, *rhs))
    }

    /// Inverse of [`Constraint::from_row`].
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = self.coefficients.clone();
        row.push(self.rhs);
        row.push(f64::from(self.relation.tag()));
        row
    }

    pub(crate) fn validate(&self, index: usize, n_vars: usize) -> Result<(), ProblemError> {
        if self.coefficients.len() != n_vars {
            return Err(ProblemError::CoefficientCount {
                index,
                expected: n_vars,
                found: self.coefficients.len(),
            });
        }
        let context = || format!("constraint {}", index);
        for &value in self.coefficients.iter().chain(std::iter::once(&self.rhs)) {
            if !value.is_finite() {
                return Err(ProblemError::NonFinite {
                    context: context(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// A linear program over non-negative decision variables.
///
/// Built through [`LpProblem::new`] and [`LpProblem::add_constraint`], which
/// reject malformed rows up front so that solving never has to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawProblem"))]
#[derive(Debug, Clone, PartialEq)]
pub struct LpProblem {
    sense: Sense,
    objective: Vec<f64>,
    constraints: Vec<Constraint>,
}

impl LpProblem {
    pub fn new(objective: Vec<f64>, sense: Sense) -> Result<Self, ProblemError> {
        if objective.is_empty() {
            return Err(ProblemError::EmptyObjective);
        }
        if let Some(&value) = objective.iter().find(|v| !v.is_finite()) {
            return Err(ProblemError::NonFinite {
                context: "objective".to_string(),
                value,
            });
        }
        Ok(Self {
            sense,
            objective,
            constraints: Vec::new(),
        })
    }

    pub fn maximize(objective: Vec<f64>) -> Result<Self, ProblemError> {
        Self::new(objective, Sense::Maximize)
    }

    pub fn minimize(objective: Vec<f64>) -> Result<Self, ProblemError> {
        Self::new(objective, Sense::Minimize)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<&mut Self, ProblemError> {
        constraint.validate(self.constraints.len(), self.objective.len())?;
        self.constraints.push(constraint);
        Ok(self)
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawProblem {
    sense: Sense,
    objective: Vec<f64>,
    #[serde(default)]
    constraints: Vec<Constraint>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawProblem> for LpProblem {
    type Error = ProblemError;

    fn try_from(raw: RawProblem) -> Result<Self, Self::Error> {
        let mut problem = LpProblem::new(raw.objective, raw.sense)?;
        for constraint in raw.constraints {
            problem.add_constraint(constraint)?;
        }
        Ok(problem)
    }
}
