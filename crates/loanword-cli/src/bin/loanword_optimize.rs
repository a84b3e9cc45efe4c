// loanword-optimize: Tune constraint weights with Nelder-Mead.
//
// Scores each weight vector either in process (a weighted run over the
// configured corpus, then evaluation) or with an external command that is
// given `--weights FILE` and prints the accuracy on its last line. Scores,
// weight files, `iterations.jsonl` and `best_weights.txt` go to the work
// directory.
//
// Usage:
//   loanword-optimize --config run.toml [--command CMD] [OPTIONS]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use loanword_cli::{RunArgs, init_tracing};
use loanword_core::WeightVector;
use loanword_core::weights::CONSTRAINT_NAMES;
use loanword_ot::{AdaptationObjective, CommandObjective, OptimizeConfig, optimize};

#[derive(Parser)]
#[command(name = "loanword-optimize", about = "Tune constraint weights")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Offset of the initial simplex vertices along each axis
    #[arg(long)]
    simplex_radius: Option<f64>,
    /// Vertices evaluated at once
    #[arg(long)]
    num_parallel_vertices: Option<usize>,
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,
    /// External evaluation command
    #[arg(long)]
    command: Option<String>,
    /// Starting weight file
    #[arg(long, value_name = "FILE")]
    initial_weights: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, opt: &mut OptimizeConfig) {
        if let Some(v) = self.max_iterations {
            opt.max_iterations = v;
        }
        if let Some(v) = self.simplex_radius {
            opt.simplex_radius = v;
        }
        if let Some(v) = self.num_parallel_vertices {
            opt.num_parallel_vertices = v;
        }
        if let Some(v) = &self.work_dir {
            opt.work_dir = v.clone();
        }
        if self.command.is_some() {
            opt.command = self.command.clone();
        }
        if self.initial_weights.is_some() {
            opt.initial_weights = self.initial_weights.clone();
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let file = cli.run.load()?;
    let mut opt = file.optimize;
    cli.apply(&mut opt);

    let initial = match &opt.initial_weights {
        Some(path) => WeightVector::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => WeightVector::new().with_defaults(CONSTRAINT_NAMES, file.run.default_weight),
    };

    let optimum = match &opt.command {
        Some(command) => {
            let objective = CommandObjective::new(command, &opt.work_dir)?;
            optimize(&objective, &opt, &initial)?
        }
        None => optimize(&AdaptationObjective::new(&file.run), &opt, &initial)?,
    };

    println!("best_weights\t{}", opt.work_dir.join("best_weights.txt").display());
    println!("iterations\t{}", optimum.iterations);
    println!("{}", 1.0 - optimum.score);
    Ok(())
}
