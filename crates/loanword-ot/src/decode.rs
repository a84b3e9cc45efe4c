//! Best-path decoding and the per-sample result line.

use std::fmt;

use loanword_core::Alphabet;
use loanword_core::CoreError;
use loanword_core::corpus::FIELD_SEPARATOR;
use loanword_fst::shortest_path::MAX_POP_COUNT;
use loanword_fst::{EPSILON, Label, VectorFst, n_shortest_paths};

/// How epsilon is written in alignments.
pub const EPSILON_SYMBOL: &str = "ε";

const PATH_SEPARATOR: &str = " $ ";

/// One decoded cascade path.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPath {
    /// Source phones, in order.
    pub source_tokens: Vec<String>,
    /// `source_tokens` concatenated.
    pub source: String,
    /// Output phones concatenated, syllable boundaries written as `.`.
    /// Markers are not part of it: they are listed in `markers` and stay
    /// in `alignment`, so the output compares directly with a target word.
    pub output: String,
    /// Constraint markers in the order they were emitted.
    pub markers: Vec<String>,
    /// `(input, output)` symbol pairs, skipping `ε:ε`.
    pub alignment: Vec<(String, String)>,
    pub weight: f64,
}

fn pair_symbol(alphabet: &Alphabet, label: Label) -> String {
    if label == EPSILON {
        EPSILON_SYMBOL.to_string()
    } else {
        alphabet.symbol(label).to_string()
    }
}

/// The `n` cheapest paths of `fst`, dropping any path whose source, output
/// and markers repeat an earlier one. Paths of equal weight keep the order
/// the search found them in.
pub fn decode(fst: &VectorFst, alphabet: &Alphabet, n: usize) -> Vec<DecodedPath> {
    let mut decoded: Vec<DecodedPath> = Vec::new();
    for path in n_shortest_paths(fst, n, MAX_POP_COUNT) {
        let mut source_tokens = Vec::new();
        let mut output = String::new();
        let mut markers = Vec::new();
        let mut alignment = Vec::new();
        for t in &path.transitions {
            if alphabet.is_letter(t.ilabel) {
                source_tokens.push(alphabet.symbol(t.ilabel).to_string());
            }
            if alphabet.is_letter(t.olabel) {
                output.push_str(alphabet.symbol(t.olabel));
            } else if alphabet.is_boundary(t.olabel) {
                output.push('.');
            } else if alphabet.is_marker(t.olabel) {
                markers.push(alphabet.symbol(t.olabel).to_string());
            }
            if t.ilabel != EPSILON || t.olabel != EPSILON {
                alignment.push((pair_symbol(alphabet, t.ilabel), pair_symbol(alphabet, t.olabel)));
            }
        }
        let duplicate = decoded
            .iter()
            .any(|d| d.source_tokens == source_tokens && d.output == output && d.markers == markers);
        if duplicate {
            continue;
        }
        decoded.push(DecodedPath {
            source: source_tokens.concat(),
            source_tokens,
            output,
            markers,
            alignment,
            weight: path.weight,
        });
    }
    decoded
}

/// One candidate of a result line.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    pub candidate: String,
    pub markers: Vec<String>,
    pub weight: f64,
    pub output: String,
    pub alignment: Vec<(String, String)>,
}

impl From<&DecodedPath> for ResultEntry {
    fn from(path: &DecodedPath) -> Self {
        Self {
            candidate: path.source.clone(),
            markers: path.markers.clone(),
            weight: path.weight,
            output: path.output.clone(),
            alignment: path.alignment.clone(),
        }
    }
}

/// Decoded candidates of one sample:
///
/// ```text
/// word ||| cand cand ||| m#m m ||| w w ||| out out ||| i:o i:o $ i:o
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub target_word: String,
    pub entries: Vec<ResultEntry>,
}

impl ResultLine {
    pub fn new(target_word: &str, paths: &[DecodedPath]) -> Self {
        Self {
            target_word: target_word.to_string(),
            entries: paths.iter().map(ResultEntry::from).collect(),
        }
    }

    /// Parses a line written by the `Display` impl.
    pub fn parse(line: &str, source_name: &str) -> Result<Self, CoreError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let malformed = || CoreError::MalformedLine {
            source_name: source_name.to_string(),
            line: 1,
            content: line.to_string(),
        };
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let [word, candidates, markers, weights, outputs, alignments] = fields.as_slice() else {
            return Err(malformed());
        };

        let candidates: Vec<&str> = split_nonempty(candidates);
        let n = candidates.len();
        let weights: Vec<f64> = split_nonempty(weights)
            .iter()
            .map(|w| w.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| malformed())?;
        let outputs = split_nonempty(outputs);
        let markers: Vec<&str> = if n == 0 { Vec::new() } else { markers.split(' ').collect() };
        let alignments: Vec<&str> = if n == 0 {
            Vec::new()
        } else {
            alignments.split(PATH_SEPARATOR).collect()
        };
        if weights.len() != n || outputs.len() != n || markers.len() != n || alignments.len() != n {
            return Err(malformed());
        }

        let mut entries = Vec::with_capacity(n);
        for i in 0..n {
            let alignment = alignments[i]
                .split_whitespace()
                .map(|pair| {
                    pair.split_once(':')
                        .map(|(a, b)| (a.to_string(), b.to_string()))
                        .ok_or_else(malformed)
                })
                .collect::<Result<Vec<_>, _>>()?;
            entries.push(ResultEntry {
                candidate: candidates[i].to_string(),
                markers: markers[i]
                    .split('#')
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect(),
                weight: weights[i],
                output: outputs[i].to_string(),
                alignment,
            });
        }
        Ok(Self {
            target_word: word.to_string(),
            entries,
        })
    }
}

fn split_nonempty(field: &str) -> Vec<&str> {
    field.split(' ').filter(|s| !s.is_empty()).collect()
}

fn join_entries(entries: &[ResultEntry], sep: &str, part: impl Fn(&ResultEntry) -> String) -> String {
    entries.iter().map(part).collect::<Vec<_>>().join(sep)
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.entries;
        let fields = [
            self.target_word.clone(),
            join_entries(e, " ", |e| e.candidate.clone()),
            join_entries(e, " ", |e| e.markers.join("#")),
            join_entries(e, " ", |e| e.weight.to_string()),
            join_entries(e, " ", |e| e.output.clone()),
            join_entries(e, PATH_SEPARATOR, |e| {
                e.alignment
                    .iter()
                    .map(|(i, o)| format!("{i}:{o}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
        ];
        f.write_str(&fields.join(FIELD_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{self, labels};
    use loanword_core::weights::{MAX_V, RO_MORPH};

    fn sample_paths() -> (Alphabet, VectorFst) {
        let abc = test_support::alphabet(1.0);
        let l = |s: &str| labels(&abc, s)[0];
        let max_v = abc.marker(MAX_V).unwrap();
        let ro = abc.marker(RO_MORPH).unwrap();
        let mut fst = VectorFst::new();
        fst.add_state();
        // k:k a:ε ε:<<MAX-V>> b:b ε:u ε:<<RO_MORPH>>, weight 3
        fst.add_chain(
            0,
            [
                (l("k"), l("k")),
                (l("a"), EPSILON),
                (EPSILON, max_v),
                (l("b"), l("b")),
                (EPSILON, l("u")),
                (EPSILON, ro),
            ],
            3.0,
        );
        // Same relation again, found second.
        fst.add_chain(
            0,
            [
                (l("k"), l("k")),
                (l("a"), EPSILON),
                (EPSILON, max_v),
                (l("b"), l("b")),
                (EPSILON, EPSILON),
                (EPSILON, l("u")),
                (EPSILON, ro),
            ],
            3.0,
        );
        // k:k a:a .V.
        fst.add_chain(0, [(l("k"), l("k")), (l("a"), l("a")), (EPSILON, abc.vowel_boundary())], 5.0);
        (abc, fst)
    }

    #[test]
    fn decode_reconstructs_paths() {
        let (abc, fst) = sample_paths();
        let paths = decode(&fst, &abc, 5);
        assert_eq!(paths.len(), 2);
        let best = &paths[0];
        assert_eq!(best.source_tokens, vec!["k", "a", "b"]);
        assert_eq!(best.source, "kab");
        assert_eq!(best.output, "kbu");
        assert_eq!(best.markers, vec![MAX_V, RO_MORPH]);
        assert_eq!(best.weight, 3.0);
        assert_eq!(best.alignment.len(), 6);
        assert_eq!(best.alignment[1], ("a".to_string(), EPSILON_SYMBOL.to_string()));
        assert_eq!(best.alignment[2], (EPSILON_SYMBOL.to_string(), MAX_V.to_string()));
        assert!(!best.output.contains('<'));
        assert_eq!(paths[1].output, "ka.");
        assert!(paths[1].markers.is_empty());
    }

    #[test]
    fn decode_is_deterministic() {
        let (abc, fst) = sample_paths();
        assert_eq!(decode(&fst, &abc, 5), decode(&fst, &abc, 5));
        assert!(decode(&VectorFst::new(), &abc, 5).is_empty());
    }

    #[test]
    fn result_line_round_trip() {
        let (abc, fst) = sample_paths();
        let line = ResultLine::new("kbu", &decode(&fst, &abc, 5));
        let text = line.to_string();
        assert_eq!(
            text,
            "kbu ||| kab ka ||| <<MAX-V>>#<<RO_MORPH>>  ||| 3 5 ||| kbu ka. ||| \
             k:k a:ε ε:<<MAX-V>> b:b ε:u ε:<<RO_MORPH>> $ k:k a:a ε:.V."
        );
        assert_eq!(ResultLine::parse(&format!("{text}\n"), "test").unwrap(), line);
    }

    #[test]
    fn empty_result_line() {
        let line = ResultLine::new("kitabu", &[]);
        let text = line.to_string();
        assert_eq!(text, "kitabu |||  |||  |||  |||  ||| ");
        assert_eq!(ResultLine::parse(&text, "test").unwrap(), line);
    }

    #[test]
    fn malformed_result_lines() {
        assert!(ResultLine::parse("kitabu ||| kitab", "test").is_err());
        assert!(ResultLine::parse("w ||| a b ||| # ||| 1 ||| x y ||| a:a $ b:b", "test").is_err());
        assert!(ResultLine::parse("w ||| a |||  ||| heavy ||| x ||| a:a", "test").is_err());
    }
}
