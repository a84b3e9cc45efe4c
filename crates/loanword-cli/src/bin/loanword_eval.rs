// loanword-eval: Accuracy of the result lines of a run.
//
// Reads the result lines and reachability lists a run wrote for its shard
// and prints the accuracy summary. The last line of output is the
// accuracy alone, so the tool can serve as an optimizer objective:
//
//   loanword-optimize --command "loanword-eval --config run.toml --mode weighted --execute"
//
// Usage:
//   loanword-eval --config run.toml [--execute] [--json] [OPTIONS]

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use loanword_cli::{RunArgs, init_tracing};
use loanword_ot::Run;

#[derive(Parser)]
#[command(name = "loanword-eval", about = "Evaluate the results of a run")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
    /// Run the adaptation before evaluating
    #[arg(long)]
    execute: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.run.load()?.run;
    let run = Run::prepare(&config).context("preparing run")?;
    if cli.execute {
        run.execute().context("adapting samples")?;
    }
    let report = run.evaluate().context("evaluating")?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    if cli.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(out, "samples\t{}", report.samples)?;
        writeln!(out, "unreachable\t{}", report.unreachable)?;
        writeln!(out, "reachable\t{}", report.reachable)?;
        writeln!(out, "reachable_correct\t{}", report.reachable_correct)?;
        writeln!(out, "total_hard_accuracy\t{}", report.total_hard_accuracy)?;
        writeln!(out, "total_soft_accuracy\t{}", report.total_soft_accuracy)?;
        writeln!(out, "hard_accuracy\t{}", report.hard_accuracy)?;
    }
    writeln!(out, "{}", report.accuracy)?;
    Ok(())
}
