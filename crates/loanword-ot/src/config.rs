//! Run and optimizer settings, read from a TOML file.
//!
//! ```toml
//! [run]
//! profile = "arabic-swahili"
//! source_dict = "data/pron-dict.ar"
//! target_dict = "data/pron-dict.sw"
//! corpus = "data/train.sw-en-ar"
//! mode = "annotate"
//!
//! [optimize]
//! max_iterations = 200
//! num_parallel_vertices = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::OtError;
use crate::eval::DEFAULT_MAX_WEIGHT;
use crate::pipeline::PipelineSpec;
use crate::rules::Mode;
use crate::sample::Shard;
use crate::vocab::DEFAULT_GROUP_SIZE;

/// Settings of one run over a corpus shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub cache_dir: PathBuf,
    /// Built-in profile name or path to a profile file.
    pub profile: String,
    pub source_dict: PathBuf,
    pub target_dict: PathBuf,
    pub corpus: PathBuf,
    pub mode: Mode,
    pub with_syllabification: bool,
    pub min_consonant_count: usize,
    /// Target pronunciations shorter than this are not samples.
    pub shortest_target_len: usize,
    /// Weight of every constraint the weight file does not list.
    pub default_weight: f64,
    /// Constraint weight file.
    pub weights: Option<PathBuf>,
    pub num_best_paths: usize,
    pub vocab_group_size: usize,
    pub start_line: usize,
    pub worker_id: usize,
    pub num_workers: usize,
    pub accuracy_at_n: usize,
    pub max_weight: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            profile: "arabic-swahili".to_string(),
            source_dict: PathBuf::new(),
            target_dict: PathBuf::new(),
            corpus: PathBuf::new(),
            mode: Mode::Annotate,
            with_syllabification: false,
            min_consonant_count: 1,
            shortest_target_len: 3,
            default_weight: 0.0,
            weights: None,
            num_best_paths: 1,
            vocab_group_size: DEFAULT_GROUP_SIZE,
            start_line: 0,
            worker_id: 0,
            num_workers: 1,
            accuracy_at_n: 1,
            max_weight: DEFAULT_MAX_WEIGHT,
        }
    }
}

impl RunConfig {
    pub fn shard(&self) -> Shard {
        Shard {
            start_line: self.start_line,
            worker_id: self.worker_id,
            num_workers: self.num_workers,
        }
    }

    pub fn pipeline_spec(&self) -> PipelineSpec {
        PipelineSpec::standard(self.with_syllabification, self.min_consonant_count)
    }
}

/// Settings of a Nelder-Mead weight search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeConfig {
    pub max_iterations: usize,
    pub simplex_radius: f64,
    /// Vertices evaluated at once while building or shrinking the simplex.
    pub num_parallel_vertices: usize,
    /// Scores, weight files and iteration reports go here.
    pub work_dir: PathBuf,
    /// Evaluation command; evaluated in process when unset.
    pub command: Option<String>,
    /// Starting weights; every constraint at the run's default weight when unset.
    pub initial_weights: Option<PathBuf>,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            simplex_radius: 500.0,
            num_parallel_vertices: 1,
            work_dir: PathBuf::from("nm_optimization"),
            command: None,
            initial_weights: None,
        }
    }
}

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub run: RunConfig,
    pub optimize: OptimizeConfig,
}

impl ConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self, OtError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, OtError> {
        let text = std::fs::read_to_string(path).map_err(|e| OtError::io(path, e))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let file = ConfigFile::from_toml_str(
            "[run]\ncorpus = \"train.txt\"\nmode = \"weighted\"\nnum_workers = 4\n\n[optimize]\nnum_parallel_vertices = 8\n",
        )
        .unwrap();
        assert_eq!(file.run.corpus, PathBuf::from("train.txt"));
        assert_eq!(file.run.mode, Mode::Weighted);
        assert_eq!(file.run.min_consonant_count, 1);
        assert_eq!(file.run.shortest_target_len, 3);
        assert_eq!(file.run.vocab_group_size, 5000);
        assert_eq!(file.run.shard().num_workers, 4);
        assert_eq!(file.optimize.num_parallel_vertices, 8);
        assert_eq!(file.optimize.simplex_radius, 500.0);
        assert_eq!(ConfigFile::from_toml_str("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConfigFile::from_toml_str("[run]\ncorpuss = \"x\"\n").is_err());
        assert!(ConfigFile::from_toml_str("[run]\nmode = \"fast\"\n").is_err());
    }
}
