//! WASM bindings for the browser front end.
//!
//! Inputs use the front end's raw encoding: constraint rows are
//! `[a_1, .., a_n, rhs, tag]` with tag `0` for `<=`, `1` for `>=`, `2` for
//! `=`, and the problem type is `"Max"` or `"Min"`.

use wasm_bindgen::prelude::*;

use crate::problem::{Constraint, LpProblem, Sense};
use crate::simplex::Solver;
use crate::tableau::Tableau;

/// Run the dual/primal simplex and return the full trace as a JS object
#[wasm_bindgen(js_name = runDualSimplex)]
pub fn run_dual_simplex(objective: JsValue, constraints: JsValue, problem_type: &str) -> Result<JsValue, JsValue> {
    let objective: Vec<f64> = from_js(objective)?;
    let rows: Vec<Vec<f64>> = from_js(constraints)?;
    let sense = parse_sense(problem_type)?;

    let mut problem = LpProblem::new(objective, sense).map_err(to_js_error)?;
    for row in &rows {
        let constraint = Constraint::from_row(row).map_err(to_js_error)?;
        problem.add_constraint(constraint).map_err(to_js_error)?;
    }

    let result = Solver::new().solve(&problem);
    to_js(&TraceResult::from(result))
}

/// Resume from a tableau the front end built (e.g. after adding a cut row)
#[wasm_bindgen(js_name = resumeDualSimplex)]
pub fn resume_dual_simplex(rows: JsValue, decision_vars: usize, problem_type: &str) -> Result<JsValue, JsValue> {
    let rows: Vec<Vec<f64>> = from_js(rows)?;
    let sense = parse_sense(problem_type)?;
    let tableau = Tableau::from_rows(rows, decision_vars).map_err(to_js_error)?;

    let result = Solver::new().resume(tableau, sense);
    to_js(&TraceResult::from(result))
}

fn parse_sense(problem_type: &str) -> Result<Sense, JsValue> {
    match problem_type {
        "Max" | "max" => Ok(Sense::Maximize),
        "Min" | "min" => Ok(Sense::Minimize),
        other => Err(js_sys::Error::new(&format!("Unknown problem type: {}", other)).into()),
    }
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(e: crate::problem::ProblemError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// Shape the front end's tableau viewer reads
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceResult {
    status: crate::solution::SolveStatus,
    tableaus: Vec<Vec<Vec<f64>>>,
    changing_vars: Vec<f64>,
    optimal_solution: f64,
    pivot_cols: Vec<usize>,
    pivot_rows: Vec<usize>,
    header_row: Vec<String>,
    phases: Vec<u8>,
}

impl From<crate::solution::SolveResult> for TraceResult {
    fn from(result: crate::solution::SolveResult) -> Self {
        Self {
            status: result.status,
            pivot_cols: result.pivots.iter().map(|p| p.column).collect(),
            pivot_rows: result.pivots.iter().map(|p| p.row).collect(),
            phases: result.pivots.iter().map(|p| p.phase.tag()).collect(),
            tableaus: result.tableaus.into_iter().map(Tableau::into_rows).collect(),
            changing_vars: result.variables,
            optimal_solution: result.objective_value,
            header_row: result.header,
        }
    }
}
