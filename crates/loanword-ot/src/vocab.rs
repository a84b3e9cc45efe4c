//! Source vocabulary acceptors.
//!
//! The whole source dictionary is too large for one automaton, so its
//! pronunciations are split into fixed-size groups. Each group is a
//! minimized acceptor, cached on its own and composed with the source side
//! of the cascade when a sample needs it.

use std::time::Instant;

use loanword_core::corpus::PronunciationDict;
use loanword_fst::{Label, VectorFst, determinize, minimize};

use crate::cache::{self, CacheLayout};
use crate::error::OtError;
use crate::pipeline::Pipeline;

/// Pronunciations per vocabulary group.
pub const DEFAULT_GROUP_SIZE: usize = 5000;

/// State limit for determinizing word-list acceptors.
pub const ACCEPTOR_STATE_LIMIT: usize = 20_000_000;

/// Determinizes and minimizes an acceptor over a finite word list.
pub fn minimize_acceptor(fst: &VectorFst) -> Result<VectorFst, OtError> {
    let det = determinize(fst, ACCEPTOR_STATE_LIMIT)?;
    Ok(minimize(&det))
}

/// Minimized acceptor for a list of pronunciations.
pub fn word_list_acceptor<'a, I>(pronunciations: I) -> Result<VectorFst, OtError>
where
    I: IntoIterator<Item = &'a [Label]>,
{
    minimize_acceptor(&VectorFst::from_sequences(pronunciations))
}

/// The source dictionary split into cached groups.
///
/// Creating one is cheap; [`SourceVocabulary::build`] does the work.
#[derive(Debug, Clone, Copy)]
pub struct SourceVocabulary<'a> {
    dict: &'a PronunciationDict,
    group_size: usize,
    layout: &'a CacheLayout,
}

impl<'a> SourceVocabulary<'a> {
    pub fn new(dict: &'a PronunciationDict, group_size: usize, layout: &'a CacheLayout) -> Self {
        Self {
            dict,
            group_size: group_size.max(1),
            layout,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.dict.all_pronunciations().count().div_ceil(self.group_size)
    }

    /// Every group acceptor composed with the source side of `pipeline`.
    pub fn build(&self, pipeline: &Pipeline) -> Result<Vec<VectorFst>, OtError> {
        let started = Instant::now();
        let pronunciations: Vec<&[Label]> = self.dict.all_pronunciations().collect();
        let groups = pronunciations
            .chunks(self.group_size)
            .enumerate()
            .map(|(i, chunk)| {
                let path = self.layout.vocab_group(self.group_size, i);
                let group = cache::fst_or_build(&path, || word_list_acceptor(chunk.iter().copied()))?;
                Ok(pipeline.restrict_source(&group))
            })
            .collect::<Result<Vec<_>, OtError>>()?;
        tracing::info!(
            words = pronunciations.len(),
            groups = groups.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "source vocabulary ready"
        );
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKeys;
    use crate::pipeline::PipelineSpec;
    use crate::rules::Mode;
    use crate::rules::test_support::{self, labels};
    use loanword_fst::accepted_paths;

    #[test]
    fn word_list_acceptor_is_minimal() {
        let words: Vec<Vec<Label>> = vec![vec![3, 4, 5], vec![3, 4, 6], vec![3, 4, 5]];
        let fst = word_list_acceptor(words.iter().map(Vec::as_slice)).unwrap();
        assert_eq!(fst.num_states(), 4);
        let mut strings: Vec<Vec<Label>> = accepted_paths(&fst, 10)
            .unwrap()
            .iter()
            .map(|p| p.input_labels())
            .collect();
        strings.sort();
        assert_eq!(strings, vec![vec![3, 4, 5], vec![3, 4, 6]]);
    }

    #[test]
    fn groups_cover_the_dictionary() {
        let abc = test_support::alphabet(1.0);
        let text = "kitab ||| k i t a b\nkutub ||| k u t u b\nbarid ||| b a r i d\n";
        let dict = PronunciationDict::parse(text, "test", &abc).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let spec = PipelineSpec::standard(false, 1);
        let keys = CacheKeys::new(&abc, Mode::Weighted, &spec, "d".into(), "c".into());
        let layout = CacheLayout::new(dir.path(), keys);
        let pipeline = Pipeline::build(&spec, &abc, Mode::Weighted).unwrap();

        let vocab = SourceVocabulary::new(&dict, 2, &layout);
        assert_eq!(vocab.num_groups(), 2);
        let groups = vocab.build(&pipeline).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(layout.vocab_group(2, 1).exists());

        // Every word passes the source side unchanged at no cost.
        let accepts = |word: &str| {
            let chain = VectorFst::linear_chain(&labels(&abc, word));
            groups
                .iter()
                .any(|g| !loanword_fst::compose(g, &chain).is_empty())
        };
        assert!(accepts("k i t a b"));
        assert!(accepts("b a r i d"));
        assert!(!accepts("b a r i"));
    }
}
