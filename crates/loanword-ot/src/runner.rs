//! One run over a corpus shard: build every sample, decode it, write its
//! result line, and evaluate the written results.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use loanword_core::corpus::{CorpusLine, PronunciationDict, load_corpus};
use loanword_core::{Alphabet, LanguageProfile, WeightVector, hash};
use loanword_fst::Label;
use serde::Serialize;

use crate::cache::{self, CacheKeys, CacheLayout};
use crate::config::RunConfig;
use crate::decode::{ResultLine, decode};
use crate::error::OtError;
use crate::eval::{self, AccuracyReport, EvalRecord};
use crate::pipeline::{Pipeline, TraceReport};
use crate::sample::{Sample, SampleBuilder, SampleOutcome, collect_samples, load_reachability};
use crate::vocab::SourceVocabulary;

/// Counts of sample outcomes and where their artifacts went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub samples: usize,
    pub unreachable: usize,
    pub not_from_gold: usize,
    pub reachable: usize,
    pub results_dir: PathBuf,
    pub reachability_dir: PathBuf,
    pub samples_dir: PathBuf,
}

impl RunSummary {
    fn new(layout: &CacheLayout) -> Self {
        Self {
            results_dir: layout.results_dir(),
            reachability_dir: layout.reachability_dir(),
            samples_dir: layout.samples_dir(),
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: SampleOutcome) {
        self.samples += 1;
        match outcome {
            SampleOutcome::Unreachable => self.unreachable += 1,
            SampleOutcome::NotFromGold => self.not_from_gold += 1,
            SampleOutcome::Reachable => self.reachable += 1,
        }
    }
}

/// Tab-separated `key<TAB>value` lines.
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "samples\t{}", self.samples)?;
        writeln!(f, "unreachable\t{}", self.unreachable)?;
        writeln!(f, "not_from_gold\t{}", self.not_from_gold)?;
        writeln!(f, "reachable\t{}", self.reachable)?;
        writeln!(f, "results_dir\t{}", self.results_dir.display())?;
        writeln!(f, "reachability_dir\t{}", self.reachability_dir.display())?;
        write!(f, "samples_dir\t{}", self.samples_dir.display())
    }
}

/// One traced source/target pronunciation pair.
#[derive(Debug, Clone)]
pub struct TracedPair {
    pub source: String,
    pub target: String,
    pub report: TraceReport,
}

/// Everything a run needs, loaded and built once.
#[derive(Debug)]
pub struct Run {
    config: RunConfig,
    alphabet: Alphabet,
    source_dict: PronunciationDict,
    target_dict: PronunciationDict,
    corpus: Vec<CorpusLine>,
    layout: CacheLayout,
    pipeline: Pipeline,
}

impl Run {
    /// Loads the weight file named by `config`, if any, and prepares the run.
    pub fn prepare(config: &RunConfig) -> Result<Self, OtError> {
        let weights = match &config.weights {
            Some(path) => WeightVector::load(path)?,
            None => WeightVector::new(),
        };
        Self::prepare_with_weights(config, &weights)
    }

    pub fn prepare_with_weights(config: &RunConfig, weights: &WeightVector) -> Result<Self, OtError> {
        let started = Instant::now();
        let profile = LanguageProfile::load(&config.profile)?;
        let mut alphabet = Alphabet::new(&profile)?;
        alphabet.register_constraint_weights(weights, config.default_weight)?;

        let source_dict = PronunciationDict::load(&config.source_dict, &alphabet)?;
        let target_dict = PronunciationDict::load(&config.target_dict, &alphabet)?;
        let corpus = load_corpus(&config.corpus)?;

        // Samples depend on the target dictionary as much as on the corpus.
        let samples_key = format!(
            "{}\n{}\n{}",
            hash::file_hash(Some(config.corpus.as_path()))?,
            hash::file_hash(Some(config.target_dict.as_path()))?,
            config.shortest_target_len
        );
        let spec = config.pipeline_spec();
        let keys = CacheKeys::new(
            &alphabet,
            config.mode,
            &spec,
            hash::file_hash(Some(config.source_dict.as_path()))?,
            hash::digest_hex(samples_key.as_bytes()),
        );
        let layout = CacheLayout::new(&config.cache_dir, keys);
        let pipeline = Pipeline::build_cached(&spec, &alphabet, config.mode, &layout)?;

        tracing::info!(
            profile = alphabet.name(),
            mode = %config.mode,
            source_words = source_dict.len(),
            target_words = target_dict.len(),
            corpus_lines = corpus.len(),
            pipeline_dir = %layout.pipeline_dir().display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run prepared"
        );
        Ok(Self {
            config: config.clone(),
            alphabet,
            source_dict,
            target_dict,
            corpus,
            layout,
            pipeline,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn source_dict(&self) -> &PronunciationDict {
        &self.source_dict
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The samples of this run's shard.
    pub fn samples(&self) -> Vec<Sample> {
        collect_samples(
            &self.corpus,
            &self.target_dict,
            &self.source_dict,
            &self.config.shard(),
            self.config.shortest_target_len,
        )
    }

    /// Builds and decodes every sample, writing one result line each.
    pub fn execute(&self) -> Result<RunSummary, OtError> {
        let started = Instant::now();
        let samples = self.samples();
        let vocabulary = SourceVocabulary::new(&self.source_dict, self.config.vocab_group_size, &self.layout);
        let mut builder = SampleBuilder::new(&self.alphabet, &self.pipeline, &self.layout, vocabulary);
        let mut summary = RunSummary::new(&self.layout);

        for sample in &samples {
            let automata = builder.build(sample)?;
            let outcome = automata.outcome();
            let paths = match outcome {
                SampleOutcome::Unreachable => Vec::new(),
                _ => {
                    let scored = self.pipeline.score(&automata.all, &self.alphabet)?;
                    decode(&scored, &self.alphabet, self.config.num_best_paths)
                }
            };
            let line = ResultLine::new(&sample.target_word, &paths);
            cache::write_text(&self.layout.result(&sample.id), &format!("{line}\n"))?;
            tracing::debug!(sample = %sample.id, ?outcome, results = paths.len(), "decoded sample");
            summary.record(outcome);
        }

        tracing::info!(
            samples = summary.samples,
            reachable = summary.reachable,
            not_from_gold = summary.not_from_gold,
            unreachable = summary.unreachable,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }

    /// Accuracy of the result lines already written for this shard.
    ///
    /// Samples without a result line or a reachability list are left out.
    pub fn evaluate(&self) -> Result<AccuracyReport, OtError> {
        let mut records = Vec::new();
        for sample in self.samples() {
            let Some(reachable) = load_reachability(&self.layout, &self.alphabet, &sample.id) else {
                tracing::debug!(sample = %sample.id, "no reachability list");
                continue;
            };
            let path = self.layout.result(&sample.id);
            let Some(text) = cache::read_text(&path)? else {
                tracing::debug!(sample = %sample.id, "no result line");
                continue;
            };
            let first = text.lines().next().unwrap_or_default();
            let result = match ResultLine::parse(first, &path.display().to_string()) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("{e}");
                    continue;
                }
            };
            records.push(EvalRecord {
                gold: self.render_all(&sample.gold),
                reachable: self.render_all(&reachable),
                id: sample.id,
                result,
            });
        }
        let report = eval::evaluate(&records, self.config.accuracy_at_n, self.config.max_weight);
        tracing::info!(
            samples = report.samples,
            reachable_correct = report.reachable_correct,
            accuracy = report.accuracy,
            "evaluated"
        );
        Ok(report)
    }

    fn render_all(&self, pronunciations: &[Vec<Label>]) -> BTreeSet<String> {
        pronunciations.iter().map(|p| self.alphabet.render(p)).collect()
    }

    /// Traces every pronunciation pair of `source` and `target`. Each is a
    /// dictionary word, or else a space-separated phone string.
    pub fn trace(&self, source: &str, target: &str) -> Result<Vec<TracedPair>, OtError> {
        let sources = self.lookup(&self.source_dict, source)?;
        let targets = self.lookup(&self.target_dict, target)?;
        let mut pairs = Vec::new();
        for s in &sources {
            for t in &targets {
                let report = self.pipeline.trace(s, t, &self.alphabet, self.config.num_best_paths)?;
                pairs.push(TracedPair {
                    source: self.alphabet.render(s),
                    target: self.alphabet.render(t),
                    report,
                });
            }
        }
        Ok(pairs)
    }

    fn lookup(&self, dict: &PronunciationDict, word: &str) -> Result<Vec<Vec<Label>>, OtError> {
        if dict.contains_word(word) {
            return Ok(dict.pronunciations(word).map(<[Label]>::to_vec).collect());
        }
        let phones: Vec<&str> = word.split_whitespace().collect();
        Ok(vec![self.alphabet.labels(&phones)?])
    }
}
