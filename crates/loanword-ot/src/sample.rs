//! Samples and their cached automatons.
//!
//! A sample is one target word of the corpus. Its `All` automaton relates
//! every source pronunciation that can reach the word to the word; its
//! `Correct` automaton is the part of `All` that starts from an attested
//! source word. The first build of `All` searches the whole vocabulary and
//! records which source pronunciations survived, so later builds (other
//! modes, other weights) only compose those.

use std::collections::BTreeSet;

use loanword_core::Alphabet;
use loanword_core::corpus::{CorpusLine, PronunciationDict};
use loanword_fst::weight::ONE;
use loanword_fst::{Label, VectorFst, accepted_paths, compose};

use crate::cache::{self, CacheLayout};
use crate::error::OtError;
use crate::pipeline::Pipeline;
use crate::vocab::{SourceVocabulary, minimize_acceptor, word_list_acceptor};

/// Upper bound on the number of source pronunciations listed as reachable.
pub const REACHABLE_LIMIT: usize = 1_000_000;

/// One target word with its pronunciations and the gold source
/// pronunciations of its corpus line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// `<line>_<target word>`.
    pub id: String,
    pub line: usize,
    pub target_word: String,
    pub target_pronunciations: Vec<Vec<Label>>,
    pub gold: Vec<Vec<Label>>,
}

/// Static partition of corpus lines across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub start_line: usize,
    pub worker_id: usize,
    pub num_workers: usize,
}

impl Default for Shard {
    fn default() -> Self {
        Self {
            start_line: 0,
            worker_id: 0,
            num_workers: 1,
        }
    }
}

impl Shard {
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line % self.num_workers.max(1) == self.worker_id
    }
}

/// The samples of `shard`.
///
/// Target pronunciations shorter than `shortest_target_len` phones are
/// dropped; a word left without pronunciations is not a sample.
pub fn collect_samples(
    corpus: &[CorpusLine],
    target_dict: &PronunciationDict,
    source_dict: &PronunciationDict,
    shard: &Shard,
    shortest_target_len: usize,
) -> Vec<Sample> {
    let mut seen = BTreeSet::new();
    let mut samples = Vec::new();
    for line in corpus.iter().filter(|l| shard.contains(l.index)) {
        let gold: Vec<Vec<Label>> = line
            .gold
            .iter()
            .flat_map(|w| source_dict.pronunciations(w))
            .map(<[Label]>::to_vec)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for word in &line.targets {
            let id = format!("{}_{word}", line.index);
            if !seen.insert(id.clone()) {
                continue;
            }
            let target_pronunciations: Vec<Vec<Label>> = target_dict
                .pronunciations(word)
                .filter(|p| p.len() >= shortest_target_len)
                .map(<[Label]>::to_vec)
                .collect();
            if target_pronunciations.is_empty() {
                tracing::debug!(sample = %id, "no usable target pronunciation");
                continue;
            }
            samples.push(Sample {
                id,
                line: line.index,
                target_word: word.clone(),
                target_pronunciations,
                gold: gold.clone(),
            });
        }
    }
    samples
}

/// How a sample relates to the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleOutcome {
    /// No source pronunciation reaches the target.
    Unreachable,
    /// Some source pronunciation reaches it, but no gold one.
    NotFromGold,
    Reachable,
}

/// The `All` and `Correct` automatons of a sample.
#[derive(Debug, Clone)]
pub struct SampleAutomata {
    pub all: VectorFst,
    pub correct: VectorFst,
}

impl SampleAutomata {
    pub fn outcome(&self) -> SampleOutcome {
        if self.all.is_empty() {
            SampleOutcome::Unreachable
        } else if self.correct.is_empty() {
            SampleOutcome::NotFromGold
        } else {
            SampleOutcome::Reachable
        }
    }
}

/// Source pronunciations on the input side of `all`, sorted.
pub fn reachable_sources(all: &VectorFst) -> Result<Vec<Vec<Label>>, OtError> {
    if all.is_empty() {
        return Ok(Vec::new());
    }
    let mut inputs = VectorFst::new();
    for s in all.states() {
        inputs.add_state();
        for t in all.transitions(s) {
            inputs.add_arc(s, t.target, t.ilabel, t.ilabel, ONE);
        }
        if all.is_final(s) {
            inputs.set_final(s, ONE);
        }
    }
    let acceptor = minimize_acceptor(&inputs)?;
    let mut sources: Vec<Vec<Label>> = accepted_paths(&acceptor, REACHABLE_LIMIT)?
        .iter()
        .map(|p| p.input_labels())
        .collect();
    sources.sort();
    sources.dedup();
    Ok(sources)
}

fn format_reachability(alphabet: &Alphabet, sources: &[Vec<Label>]) -> String {
    let mut out = String::new();
    for seq in sources {
        let symbols: Vec<&str> = seq.iter().map(|&l| alphabet.symbol(l)).collect();
        out.push_str(&symbols.join(" "));
        out.push('\n');
    }
    out
}

fn parse_reachability(alphabet: &Alphabet, text: &str) -> Result<Vec<Vec<Label>>, OtError> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let symbols: Vec<&str> = l.split_whitespace().collect();
            Ok(alphabet.labels(&symbols)?)
        })
        .collect()
}

/// The reachability list of a sample, if one was recorded.
///
/// A list that cannot be read or names symbols outside the alphabet is a
/// miss, like any other unreadable cache entry.
pub fn load_reachability(layout: &CacheLayout, alphabet: &Alphabet, id: &str) -> Option<Vec<Vec<Label>>> {
    let path = layout.reachability(id);
    let text = match cache::read_text(&path) {
        Ok(text) => text?,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable reachability list");
            return None;
        }
    };
    match parse_reachability(alphabet, &text) {
        Ok(sources) => Some(sources),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "reachability list does not parse");
            None
        }
    }
}

/// Builds and caches the automatons of samples against one cascade.
///
/// The vocabulary groups are only built the first time a sample has no
/// reachability list.
pub struct SampleBuilder<'a> {
    alphabet: &'a Alphabet,
    pipeline: &'a Pipeline,
    layout: &'a CacheLayout,
    vocabulary: SourceVocabulary<'a>,
    groups: Option<Vec<VectorFst>>,
}

impl<'a> SampleBuilder<'a> {
    pub fn new(
        alphabet: &'a Alphabet,
        pipeline: &'a Pipeline,
        layout: &'a CacheLayout,
        vocabulary: SourceVocabulary<'a>,
    ) -> Self {
        Self {
            alphabet,
            pipeline,
            layout,
            vocabulary,
            groups: None,
        }
    }

    fn groups(&mut self) -> Result<&[VectorFst], OtError> {
        if self.groups.is_none() {
            self.groups = Some(self.vocabulary.build(self.pipeline)?);
        }
        Ok(self.groups.as_deref().unwrap_or_default())
    }

    pub fn reachability(&self, id: &str) -> Option<Vec<Vec<Label>>> {
        load_reachability(self.layout, self.alphabet, id)
    }

    pub fn build(&mut self, sample: &Sample) -> Result<SampleAutomata, OtError> {
        let all_path = self.layout.sample_all(&sample.id);
        let correct_path = self.layout.sample_correct(&sample.id);
        if let (Some(all), Some(correct)) = (cache::read_fst(&all_path), cache::read_fst(&correct_path)) {
            tracing::debug!(sample = %sample.id, "sample automatons cached");
            return Ok(SampleAutomata { all, correct });
        }

        let targets = self.pipeline.target_acceptor(&sample.target_pronunciations, self.alphabet);
        let restricted = self.pipeline.restrict_target(&targets);

        let all = match self.reachability(&sample.id) {
            Some(sources) => {
                let vocab = if sources.is_empty() {
                    VectorFst::new()
                } else {
                    word_list_acceptor(sources.iter().map(Vec::as_slice))?
                };
                compose(&self.pipeline.restrict_source(&vocab), &restricted)
            }
            None => {
                let mut all = VectorFst::new();
                if !restricted.is_empty() {
                    for group in self.groups()? {
                        all.union(&compose(group, &restricted));
                    }
                }
                let sources = reachable_sources(&all)?;
                cache::write_text(
                    &self.layout.reachability(&sample.id),
                    &format_reachability(self.alphabet, &sources),
                )?;
                tracing::debug!(sample = %sample.id, reachable = sources.len(), "recorded reachability");
                all
            }
        };

        let gold = VectorFst::from_sequences(sample.gold.iter().map(Vec::as_slice));
        let correct = compose(&gold, &all);
        cache::write_fst(&all_path, &all)?;
        cache::write_fst(&correct_path, &correct)?;
        let automata = SampleAutomata { all, correct };
        tracing::debug!(sample = %sample.id, outcome = ?automata.outcome(), "built sample");
        Ok(automata)
    }
}
