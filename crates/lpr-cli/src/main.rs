use clap::{Parser, Subcommand, ValueEnum};
use lpr_solver::{LpProblem, Phase, PivotRule, RatioRule, SolveResult, SolveStatus, Solver};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lpr")]
#[command(about = "Dual/primal simplex solver with step-by-step tableaus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file and print the optimal solution
    Solve {
        /// JSON problem file
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Print every tableau with the pivot that produced it
        #[arg(short, long)]
        tableaus: bool,
        /// Use Bland's rule for the entering column
        #[arg(long)]
        bland: bool,
        /// Take the smallest ratio even when it is zero
        #[arg(long)]
        minimum_ratio: bool,
        /// Pivot limit across both phases
        #[arg(long, default_value_t = 10000)]
        max_iterations: usize,
    },
    /// Check a problem file for errors
    Check {
        /// JSON problem file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            format,
            tableaus,
            bland,
            minimum_ratio,
            max_iterations,
        } => {
            let problem = load(&file);

            let mut solver = Solver::new().with_max_iterations(max_iterations);
            if bland {
                solver = solver.with_pivot_rule(PivotRule::Bland);
            }
            if minimum_ratio {
                solver = solver.with_ratio_rule(RatioRule::Minimum);
            }
            let result = solver.solve(&problem);
            log::info!("solved {} in {} pivots", file.display(), result.pivots.len());

            match format {
                Format::Json => match serde_json::to_string_pretty(&result) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing result: {}", e);
                        std::process::exit(1);
                    }
                },
                Format::Pretty => {
                    if tableaus {
                        print_tableaus(&result);
                    }
                    print_summary(&problem, &result);
                }
            }

            if !result.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let problem = load(&file);
            println!("✓ {} is valid", file.display());
            println!("  {:?}", problem.sense());
            println!("  {} variables", problem.num_variables());
            println!("  {} constraints", problem.num_constraints());
            for (i, c) in problem.constraints().iter().enumerate() {
                let terms: Vec<String> = c
                    .coefficients
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| **a != 0.0)
                    .map(|(j, a)| format!("{}x{}", a, j + 1))
                    .collect();
                println!("    c{}: {} {} {}", i + 1, terms.join(" + "), c.relation.symbol(), c.rhs);
            }
        }
    }
}

fn load(file: &Path) -> LpProblem {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&source) {
        Ok(problem) => problem,
        Err(e) => {
            eprintln!("✗ {} has errors:", file.display());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

fn print_tableaus(result: &SolveResult) {
    for (i, tableau) in result.tableaus.iter().enumerate() {
        match i.checked_sub(1).map(|k| &result.pivots[k]) {
            None => println!("Initial tableau"),
            Some(pivot) => {
                let phase = match pivot.phase {
                    Phase::Dual => "dual",
                    Phase::Primal => "primal",
                };
                println!(
                    "Tableau {} ({} pivot on row {}, column {})",
                    i + 1,
                    phase,
                    pivot.row,
                    result.header[pivot.column]
                );
            }
        }
        println!("{}", tableau);
    }
}

fn print_summary(problem: &LpProblem, result: &SolveResult) {
    match result.status {
        SolveStatus::Optimal => {
            println!("Status: OPTIMAL");
            println!("Objective: {:.4}", result.objective_value);
            println!();
            println!("Variables:");
            for (j, value) in result.variables.iter().enumerate() {
                println!("  {:10} {:12.4}", format!("x{}", j + 1), value);
            }
            println!();
            println!(
                "Pivots: {} dual, {} primal",
                result.num_pivots(Phase::Dual),
                result.num_pivots(Phase::Primal)
            );
        }
        SolveStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No solution satisfies all {} constraints.", problem.num_constraints());
        }
        SolveStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution.");
        }
        SolveStatus::MaxIterationsExceeded => {
            println!("Status: STALLED");
            println!("Stopped after {} pivots without reaching an optimum.", result.pivots.len());
        }
    }
}
