// loanword-cli: shared setup for the command-line tools.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use loanword_ot::{ConfigFile, Mode, RunConfig};
use tracing_subscriber::EnvFilter;

/// Logs to stderr so stdout stays machine-readable. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Annotate,
    Weighted,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Annotate => Mode::Annotate,
            ModeArg::Weighted => Mode::Weighted,
        }
    }
}

/// Run settings: a configuration file plus per-field overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Root of the artifact cache
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
    /// Built-in profile name or profile file
    #[arg(long)]
    pub profile: Option<String>,
    /// Source-language pronunciation dictionary
    #[arg(long, value_name = "FILE")]
    pub source_dict: Option<PathBuf>,
    /// Target-language pronunciation dictionary
    #[arg(long, value_name = "FILE")]
    pub target_dict: Option<PathBuf>,
    /// Parallel corpus
    #[arg(long, value_name = "FILE")]
    pub corpus: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Keep syllable boundaries in the output
    #[arg(long)]
    pub with_syllabification: bool,
    #[arg(long)]
    pub min_consonant_count: Option<usize>,
    #[arg(long)]
    pub shortest_target_len: Option<usize>,
    /// Weight of constraints missing from the weight file
    #[arg(long)]
    pub default_weight: Option<f64>,
    /// Constraint weight file
    #[arg(long, value_name = "FILE")]
    pub weights: Option<PathBuf>,
    #[arg(long)]
    pub num_best_paths: Option<usize>,
    #[arg(long)]
    pub vocab_group_size: Option<usize>,
    #[arg(long)]
    pub start_line: Option<usize>,
    #[arg(long)]
    pub worker_id: Option<usize>,
    #[arg(long)]
    pub num_workers: Option<usize>,
    #[arg(long)]
    pub accuracy_at_n: Option<usize>,
    #[arg(long)]
    pub max_weight: Option<f64>,
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

impl RunArgs {
    /// The configuration file (or defaults) with command-line overrides applied.
    pub fn load(&self) -> Result<ConfigFile> {
        let mut file = match &self.config {
            Some(path) => ConfigFile::load(path).with_context(|| format!("reading {}", path.display()))?,
            None => ConfigFile::default(),
        };
        self.apply(&mut file.run);
        Ok(file)
    }

    pub fn apply(&self, run: &mut RunConfig) {
        set(&mut run.cache_dir, &self.cache_dir);
        set(&mut run.profile, &self.profile);
        set(&mut run.source_dict, &self.source_dict);
        set(&mut run.target_dict, &self.target_dict);
        set(&mut run.corpus, &self.corpus);
        if let Some(m) = self.mode {
            run.mode = m.into();
        }
        if self.with_syllabification {
            run.with_syllabification = true;
        }
        set(&mut run.min_consonant_count, &self.min_consonant_count);
        set(&mut run.shortest_target_len, &self.shortest_target_len);
        set(&mut run.default_weight, &self.default_weight);
        if self.weights.is_some() {
            run.weights = self.weights.clone();
        }
        set(&mut run.num_best_paths, &self.num_best_paths);
        set(&mut run.vocab_group_size, &self.vocab_group_size);
        set(&mut run.start_line, &self.start_line);
        set(&mut run.worker_id, &self.worker_id);
        set(&mut run.num_workers, &self.num_workers);
        set(&mut run.accuracy_at_n, &self.accuracy_at_n);
        set(&mut run.max_weight, &self.max_weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "[run]\ncorpus = \"a.txt\"\nnum_workers = 2\nmode = \"weighted\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "test",
            "--config",
            path.to_str().unwrap(),
            "--corpus",
            "b.txt",
            "--worker-id",
            "1",
            "--with-syllabification",
        ])
        .unwrap();
        let run = cli.run.load().unwrap().run;
        assert_eq!(run.corpus, PathBuf::from("b.txt"));
        assert_eq!(run.num_workers, 2);
        assert_eq!(run.worker_id, 1);
        assert_eq!(run.mode, Mode::Weighted);
        assert!(run.with_syllabification);
    }

    #[test]
    fn defaults_without_a_file() {
        let cli = Cli::try_parse_from(["test", "--mode", "annotate"]).unwrap();
        let run = cli.run.load().unwrap().run;
        assert_eq!(run, RunConfig::default());
        assert!(Cli::try_parse_from(["test", "--mode", "fast"]).is_err());
    }
}
