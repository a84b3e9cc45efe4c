// loanword-trace: Trace one source word through the cascade to one target.
//
// Each of SOURCE and TARGET is a dictionary word or a quoted phone string
// ("k i t a b"). For every pronunciation pair prints either the first
// composition that came out empty or the best paths with their markers,
// weights and alignments.
//
// Usage:
//   loanword-trace --config run.toml SOURCE TARGET [OPTIONS]

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use loanword_cli::{RunArgs, init_tracing};
use loanword_ot::Run;

#[derive(Parser)]
#[command(name = "loanword-trace", about = "Trace a source word to a target word")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
    /// Source word or phone string
    source: String,
    /// Target word or phone string
    target: String,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.run.load()?.run;
    let run = Run::prepare(&config).context("preparing run")?;
    let pairs = run.trace(&cli.source, &cli.target).context("tracing")?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for pair in &pairs {
        writeln!(out, "{} -> {}", pair.source, pair.target)?;
        let report = &pair.report;
        if report.source_side_empty {
            writeln!(out, "  empty after the source side")?;
        } else if report.source_adaptation_empty {
            writeln!(out, "  empty after the adaptation stages")?;
        } else if report.adaptation_target_empty {
            writeln!(out, "  no adaptation reaches the target")?;
        }
        for path in &report.paths {
            writeln!(out, "  {}\t{}\t{}", path.weight, path.output, path.markers.join(" "))?;
            let alignment: Vec<String> = path.alignment.iter().map(|(i, o)| format!("{i}:{o}")).collect();
            writeln!(out, "    {}", alignment.join(" "))?;
        }
    }
    Ok(())
}
