// Pronunciation dictionary and parallel corpus readers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use loanword_fst::Label;

use crate::alphabet::Alphabet;
use crate::error::CoreError;

/// Field separator of dictionary, corpus and result lines.
pub const FIELD_SEPARATOR: &str = " ||| ";

const LENGTH_MARK: char = 'ː';

/// Rewrites a space-separated pronunciation so that a detached length mark
/// joins the preceding phone and repeated marks collapse.
pub fn normalize_length_marks(pron: &str) -> String {
    let mut out = pron.replace(" ː", "ː");
    while out.contains("ːː") {
        out = out.replace("ːː", "ː");
    }
    out
}

/// Word to pronunciations, with a reverse index from pronunciation to words.
///
/// Every phone is resolved against the alphabet while reading. A long vowel
/// missing from the inventory whose short form exists is read as two short
/// vowels.
#[derive(Debug, Clone, Default)]
pub struct PronunciationDict {
    by_word: BTreeMap<String, BTreeSet<Vec<Label>>>,
    by_pronunciation: BTreeMap<Vec<Label>, BTreeSet<String>>,
}

impl PronunciationDict {
    /// Parses `word ||| phone phone ...` lines.
    ///
    /// Lines without exactly two fields are skipped with a warning; an
    /// unknown phone is an error.
    pub fn parse(text: &str, source_name: &str, alphabet: &Alphabet) -> Result<Self, CoreError> {
        let mut dict = Self::default();
        let mut skipped = 0usize;
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            let [word, pron] = fields.as_slice() else {
                let err = CoreError::MalformedLine {
                    source_name: source_name.to_string(),
                    line: i + 1,
                    content: line.to_string(),
                };
                tracing::warn!("{err}");
                skipped += 1;
                continue;
            };
            let context = format!("{source_name}:{} ({word})", i + 1);
            let labels = resolve_pronunciation(pron, alphabet, &context)?;
            dict.insert(word, labels);
        }
        tracing::debug!(
            source = source_name,
            words = dict.by_word.len(),
            skipped,
            "loaded pronunciation dictionary"
        );
        Ok(dict)
    }

    pub fn load(path: &Path, alphabet: &Alphabet) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::parse(&text, &path.display().to_string(), alphabet)
    }

    pub fn insert(&mut self, word: &str, pronunciation: Vec<Label>) {
        self.by_pronunciation
            .entry(pronunciation.clone())
            .or_default()
            .insert(word.to_string());
        self.by_word.entry(word.to_string()).or_default().insert(pronunciation);
    }

    /// Pronunciations of `word` in label order; empty for unknown words.
    pub fn pronunciations(&self, word: &str) -> impl Iterator<Item = &[Label]> {
        self.by_word
            .get(word)
            .into_iter()
            .flat_map(|set| set.iter().map(Vec::as_slice))
    }

    /// Words spelled with `pronunciation`.
    pub fn words_for(&self, pronunciation: &[Label]) -> impl Iterator<Item = &str> {
        self.by_pronunciation
            .get(pronunciation)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every distinct pronunciation in the dictionary, in label order.
    pub fn all_pronunciations(&self) -> impl Iterator<Item = &[Label]> {
        self.by_pronunciation.keys().map(Vec::as_slice)
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.by_word.contains_key(word)
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.by_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_word.is_empty()
    }
}

fn resolve_pronunciation(
    pron: &str,
    alphabet: &Alphabet,
    context: &str,
) -> Result<Vec<Label>, CoreError> {
    let normalized = normalize_length_marks(pron);
    let mut labels = Vec::new();
    for phone in normalized.split_whitespace() {
        if let Ok(label) = alphabet.label(phone) {
            if alphabet.is_letter(label) {
                labels.push(label);
                continue;
            }
        }
        match phone.strip_suffix(LENGTH_MARK).map(|short| alphabet.label(short)) {
            Some(Ok(short)) if alphabet.is_letter(short) => {
                labels.push(short);
                labels.push(short);
            }
            _ => return Err(CoreError::unknown_symbol(phone, context)),
        }
    }
    Ok(labels)
}

/// One line of a parallel corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLine {
    /// Zero-based line index in the corpus file.
    pub index: usize,
    pub gloss: String,
    /// Target-language words; each is one sample.
    pub targets: Vec<String>,
    /// Attested source-language words.
    pub gold: Vec<String>,
}

/// Parses `gloss ||| target words ||| gold source words` lines.
///
/// A line with a single field is a target word list without gold. Other
/// field counts are skipped with a warning. Indices count every physical
/// line, blank ones included.
pub fn parse_corpus(text: &str, source_name: &str) -> Vec<CorpusLine> {
    let mut out = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let (gloss, targets, gold) = match fields.as_slice() {
            [targets] => ("", *targets, ""),
            [gloss, targets, gold, ..] => (*gloss, *targets, *gold),
            _ => {
                let err = CoreError::MalformedLine {
                    source_name: source_name.to_string(),
                    line: index + 1,
                    content: line.to_string(),
                };
                tracing::warn!("{err}");
                continue;
            }
        };
        out.push(CorpusLine {
            index,
            gloss: gloss.to_string(),
            targets: targets.split_whitespace().map(str::to_string).collect(),
            gold: gold.split_whitespace().map(str::to_string).collect(),
        });
    }
    out
}

pub fn load_corpus(path: &Path) -> Result<Vec<CorpusLine>, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    Ok(parse_corpus(&text, &path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::LanguageProfile;

    fn alphabet() -> Alphabet {
        Alphabet::new(&LanguageProfile::builtin("arabic-swahili").unwrap()).unwrap()
    }

    #[test]
    fn length_marks_attach_and_collapse() {
        assert_eq!(normalize_length_marks("k i t a ː b"), "k i t aː b");
        assert_eq!(normalize_length_marks("i ː ː"), "iː");
        assert_eq!(normalize_length_marks("iːː"), "iː");
    }

    #[test]
    fn long_vowels_expand_when_missing() {
        let abc = alphabet();
        let dict = PronunciationDict::parse("kitab ||| k i t aː b\n", "test", &abc).unwrap();
        let pron: Vec<&[Label]> = dict.pronunciations("kitab").collect();
        assert_eq!(pron.len(), 1);
        assert_eq!(abc.render(pron[0]), "kitaab");
        // iː is in the inventory and stays one phone.
        let dict = PronunciationDict::parse("x ||| b i ː t\n", "test", &abc).unwrap();
        let pron: Vec<&[Label]> = dict.pronunciations("x").collect();
        assert_eq!(pron[0].len(), 3);
    }

    #[test]
    fn reverse_index() {
        let abc = alphabet();
        let text = "kataba ||| k a t a b a\nkatab ||| k a t a b a\nkutub ||| k u t u b\n";
        let dict = PronunciationDict::parse(text, "test", &abc).unwrap();
        assert_eq!(dict.len(), 3);
        let pron = abc.labels(&["k", "a", "t", "a", "b", "a"]).unwrap();
        let words: Vec<&str> = dict.words_for(&pron).collect();
        assert_eq!(words, vec!["katab", "kataba"]);
        assert_eq!(dict.all_pronunciations().count(), 2);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let abc = alphabet();
        let text = "broken line\nkutub ||| k u t u b\na ||| b ||| c\n";
        let dict = PronunciationDict::parse(text, "test", &abc).unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.contains_word("kutub"));
    }

    #[test]
    fn unknown_phone_is_fatal() {
        let abc = alphabet();
        let err = PronunciationDict::parse("x ||| k ʘ\n", "test", &abc).unwrap_err();
        assert!(matches!(err, CoreError::UnknownSymbol { ref symbol, .. } if symbol == "ʘ"));
        // Boundaries are symbols but not phones.
        assert!(PronunciationDict::parse("x ||| k .V.\n", "test", &abc).is_err());
    }

    #[test]
    fn corpus_fields() {
        let text = "book ||| kitabu vitabu ||| kitab\n\nsafari\nbad ||| line\n";
        let lines = parse_corpus(text, "test");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].index, 0);
        assert_eq!(lines[0].targets, vec!["kitabu", "vitabu"]);
        assert_eq!(lines[0].gold, vec!["kitab"]);
        assert_eq!(lines[1].index, 2);
        assert_eq!(lines[1].targets, vec!["safari"]);
        assert!(lines[1].gold.is_empty());
    }
}
