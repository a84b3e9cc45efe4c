// loanword-adapt: Adapt every sample of a corpus shard.
//
// Builds (or reuses from the cache) the cascade and every sample automaton
// of the shard, decodes the best paths and writes one result line per
// sample. Prints a tab-separated run summary, including the result and
// reachability directories, to stdout.
//
// Usage:
//   loanword-adapt --config run.toml [--worker-id I --num-workers N] [OPTIONS]

use anyhow::{Context, Result};
use clap::Parser;
use loanword_cli::{RunArgs, init_tracing};
use loanword_ot::Run;

#[derive(Parser)]
#[command(name = "loanword-adapt", about = "Adapt the samples of a corpus shard")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.run.load()?.run;
    let run = Run::prepare(&config).context("preparing run")?;
    let summary = run.execute().context("adapting samples")?;
    println!("{summary}");
    Ok(())
}
