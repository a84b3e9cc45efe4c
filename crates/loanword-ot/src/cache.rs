//! Content-addressed artifact cache.
//!
//! Every artifact lives under a directory chain named by the hashes of what
//! it depends on:
//!
//! ```text
//! root/syms_<alphabet>/
//!   vocab_<dict>_<group size>/group_0000.fst
//!   reach_<pipeline>_<dict>_<corpus>/<sample>.txt
//!   <mode>/[weights_<hash>/]pipeline_<hash>/
//!     source_side.fst  adaptation/00-<stage>.fst  target_side.fst
//!     dict_<dict>/samples_<corpus>/<sample>.all.fst  <sample>.correct.fst
//!     dict_<dict>/results_<corpus>_<weights>/<sample>
//! ```
//!
//! Annotate-mode cascades do not depend on weights, so only weighted
//! cascades get a weights directory. Result lines carry scores in both
//! modes and are always keyed by the weights. Reachability lists depend on
//! neither mode nor weights.
//!
//! Automaton files start with a `sha256:<hex>` line over the payload. Any
//! failure to read one back (missing, truncated, digest mismatch, decode
//! error) is a miss and the caller rebuilds it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use loanword_core::{Alphabet, atomic, hash};
use loanword_fst::{VectorFst, format};

use crate::error::OtError;
use crate::pipeline::PipelineSpec;
use crate::rules::{Mode, Rule};

const DIGEST_PREFIX: &str = "sha256:";

/// Reads an automaton written by [`write_fst`]; `None` on any failure.
pub fn read_fst(path: &Path) -> Option<VectorFst> {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry");
            return None;
        }
    };
    let Some(newline) = data.iter().position(|&b| b == b'\n') else {
        tracing::warn!(path = %path.display(), "cache entry has no digest line");
        return None;
    };
    let (head, payload) = (&data[..newline], &data[newline + 1..]);
    let expected = std::str::from_utf8(head)
        .ok()
        .and_then(|h| h.strip_prefix(DIGEST_PREFIX));
    if expected != Some(hash::digest_hex(payload).as_str()) {
        tracing::warn!(path = %path.display(), "cache entry digest mismatch");
        return None;
    }
    match format::from_bytes(payload) {
        Ok(fst) => Some(fst),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cache entry does not decode");
            None
        }
    }
}

/// Writes an automaton behind its digest line, atomically.
pub fn write_fst(path: &Path, fst: &VectorFst) -> Result<(), OtError> {
    let payload = format::to_bytes(fst)?;
    let mut data = format!("{DIGEST_PREFIX}{}\n", hash::digest_hex(&payload)).into_bytes();
    data.extend_from_slice(&payload);
    atomic::write_file(path, &data)?;
    Ok(())
}

/// The cached automaton at `path`, or the result of `build` written there.
pub fn fst_or_build<F>(path: &Path, build: F) -> Result<VectorFst, OtError>
where
    F: FnOnce() -> Result<VectorFst, OtError>,
{
    if let Some(fst) = read_fst(path) {
        tracing::debug!(path = %path.display(), "cache hit");
        return Ok(fst);
    }
    let fst = build()?;
    write_fst(path, &fst)?;
    tracing::debug!(path = %path.display(), states = fst.num_states(), "cached");
    Ok(fst)
}

/// Reads a text artifact; `None` when it does not exist.
pub fn read_text(path: &Path) -> Result<Option<String>, OtError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(OtError::cache(path, e)),
    }
}

pub fn write_text(path: &Path, text: &str) -> Result<(), OtError> {
    atomic::write_file(path, text.as_bytes())?;
    Ok(())
}

/// Hashes that key the artifacts of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    pub symbols: String,
    pub mode: Mode,
    /// Constraint weights; set only for weighted cascades.
    pub weights: Option<String>,
    /// Constraint weights the result lines are scored with.
    pub scoring: String,
    pub pipeline: String,
    pub source_dict: String,
    pub corpus: String,
}

impl CacheKeys {
    pub fn new(
        alphabet: &Alphabet,
        mode: Mode,
        spec: &PipelineSpec,
        source_dict: String,
        corpus: String,
    ) -> Self {
        let scoring = alphabet.constraint_weights().content_hash();
        let weights = match mode {
            Mode::Weighted => Some(scoring.clone()),
            Mode::Annotate => None,
        };
        Self {
            symbols: alphabet.content_hash(),
            mode,
            weights,
            scoring,
            pipeline: spec.structure_hash(),
            source_dict,
            corpus,
        }
    }
}

/// File names of the artifacts of one run.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
    keys: CacheKeys,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>, keys: CacheKeys) -> Self {
        Self {
            root: root.into(),
            keys,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    fn symbols_dir(&self) -> PathBuf {
        self.root.join(format!("syms_{}", self.keys.symbols))
    }

    /// Directory of the built cascade.
    pub fn pipeline_dir(&self) -> PathBuf {
        let mut dir = self.symbols_dir().join(self.keys.mode.name());
        if let Some(w) = &self.keys.weights {
            dir.push(format!("weights_{w}"));
        }
        dir.join(format!("pipeline_{}", self.keys.pipeline))
    }

    pub fn source_side(&self) -> PathBuf {
        self.pipeline_dir().join("source_side.fst")
    }

    pub fn adaptation_stage(&self, index: usize, rule: &Rule) -> PathBuf {
        self.pipeline_dir()
            .join("adaptation")
            .join(format!("{index:02}-{}.fst", rule.name()))
    }

    pub fn target_side(&self) -> PathBuf {
        self.pipeline_dir().join("target_side.fst")
    }

    /// Minimized acceptor of one vocabulary group.
    pub fn vocab_group(&self, group_size: usize, index: usize) -> PathBuf {
        self.symbols_dir()
            .join(format!("vocab_{}_{group_size}", self.keys.source_dict))
            .join(format!("group_{index:04}.fst"))
    }

    fn dict_dir(&self) -> PathBuf {
        self.pipeline_dir().join(format!("dict_{}", self.keys.source_dict))
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.dict_dir().join(format!("samples_{}", self.keys.corpus))
    }

    pub fn sample_all(&self, id: &str) -> PathBuf {
        self.samples_dir().join(format!("{id}.all.fst"))
    }

    pub fn sample_correct(&self, id: &str) -> PathBuf {
        self.samples_dir().join(format!("{id}.correct.fst"))
    }

    pub fn reachability_dir(&self) -> PathBuf {
        self.symbols_dir().join(format!(
            "reach_{}_{}_{}",
            self.keys.pipeline, self.keys.source_dict, self.keys.corpus
        ))
    }

    pub fn reachability(&self, id: &str) -> PathBuf {
        self.reachability_dir().join(format!("{id}.txt"))
    }

    pub fn results_dir(&self) -> PathBuf {
        self.dict_dir()
            .join(format!("results_{}_{}", self.keys.corpus, self.keys.scoring))
    }

    pub fn result(&self, id: &str) -> PathBuf {
        self.results_dir().join(id)
    }
}
