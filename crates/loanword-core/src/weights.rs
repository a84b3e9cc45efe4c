// Constraint weights: the catalog of constraint names and the weight file.

use std::collections::BTreeMap;
use std::path::Path;

use crate::atomic;
use crate::error::CoreError;
use crate::hash;

pub const MAX_IO: &str = "<<MAX-IO>>";
pub const MAX_V: &str = "<<MAX-V>>";
pub const DEP_IO: &str = "<<DEP-IO>>";
pub const IDENT_MANNER: &str = "<<IDENT-IO-manner>>";
pub const IDENT_PLACE: &str = "<<IDENT-IO-place>>";
pub const IDENT_SONORITY: &str = "<<IDENT-IO-sonority>>";
pub const IDENT_VOICED: &str = "<<IDENT-IO-voiced>>";
pub const IDENT_VOWEL: &str = "<<IDENT-IO-v>>";
pub const IDENT_CONSONANT: &str = "<<IDENT-IO-c>>";
pub const IDENT_PHARYNGEAL: &str = "<<IDENT-IO-PHARYNGEAL>>";
pub const IDENT_PHARYNGEALIZED: &str = "<<IDENT-IO-PHARYNGEALIZED>>";
pub const IDENT_GLOTTAL: &str = "<<IDENT-IO-GLOTTAL>>";
pub const RO_MORPH: &str = "<<RO_MORPH>>";
pub const NOCODA: &str = "<<NOCODA>>";
pub const COMPLEX: &str = "<<*COMPLEX>>";
pub const COMPLEX_MARGIN: &str = "<<*COMPLEX-margin>>";
pub const COMPLEX_VOWEL: &str = "<<*COMPLEX_VOW>>";
pub const ONSET: &str = "<<ONSET>>";
pub const PEAK: &str = "<<PEAK>>";
pub const SSP: &str = "<<SSP>>";
pub const LEN: &str = "<<LEN>>";
pub const SOURCE_MORPH: &str = "<<IT_MORPH>>";
pub const TARGET_MORPH: &str = "<<MT_MORPH>>";
pub const BIAS: &str = "<<BIAS>>";

/// Every constraint a cascade can mark.
pub const CONSTRAINT_NAMES: [&str; 24] = [
    MAX_IO,
    MAX_V,
    DEP_IO,
    IDENT_MANNER,
    IDENT_PLACE,
    IDENT_SONORITY,
    IDENT_VOICED,
    IDENT_VOWEL,
    IDENT_CONSONANT,
    IDENT_PHARYNGEAL,
    IDENT_PHARYNGEALIZED,
    IDENT_GLOTTAL,
    RO_MORPH,
    NOCODA,
    COMPLEX,
    COMPLEX_MARGIN,
    COMPLEX_VOWEL,
    ONSET,
    PEAK,
    SSP,
    LEN,
    SOURCE_MORPH,
    TARGET_MORPH,
    BIAS,
];

/// True for strings shaped like a constraint marker, `<<NAME>>`.
pub fn is_marker_name(name: &str) -> bool {
    name.len() > 4 && name.starts_with("<<") && name.ends_with(">>")
}

/// Constraint name to non-negative weight, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from `(name, weight)` pairs; negative weights clamp to 0.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut v = Self::new();
        for (name, w) in pairs {
            v.set(name, w);
        }
        v
    }

    /// Rebuilds a vector from a point of the optimizer's search space.
    pub fn from_point(names: &[String], point: &[f64]) -> Self {
        Self::from_pairs(names.iter().cloned().zip(point.iter().copied()))
    }

    pub fn set(&mut self, name: impl Into<String>, weight: f64) {
        self.weights.insert(name.into(), weight.max(0.0));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Weights in name order.
    pub fn to_point(&self) -> Vec<f64> {
        self.weights.values().copied().collect()
    }

    /// Copy with `default` filled in for every name in `names` that is missing.
    pub fn with_defaults<'a, I>(&self, names: I, default: f64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = self.clone();
        for name in names {
            if !out.contains(name) {
                out.set(name, default);
            }
        }
        out
    }

    /// Parses a weight file: one `name<TAB>weight` per line, `#` comments
    /// and blank lines ignored.
    ///
    /// Lines without a tab are skipped with a warning. A weight that does
    /// not parse, or a name listed twice, is an error.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, CoreError> {
        let mut v = Self::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once('\t') else {
                tracing::warn!(source = source_name, line = i + 1, content = line, "skipping malformed weight line");
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            let weight: f64 = value.parse().map_err(|_| CoreError::InvalidWeight {
                name: name.to_string(),
                value: value.to_string(),
            })?;
            if !weight.is_finite() {
                return Err(CoreError::InvalidWeight {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
            if v.contains(name) {
                return Err(CoreError::DuplicateWeight(name.to_string()));
            }
            v.set(name, weight);
        }
        Ok(v)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (name, w) in &self.weights {
            out.push_str(name);
            out.push('\t');
            out.push_str(&w.to_string());
            out.push('\n');
        }
        out
    }

    /// Writes the weight file through a temporary file in the same directory.
    pub fn write(&self, path: &Path) -> Result<(), CoreError> {
        atomic::write_file(path, self.to_text().as_bytes())
    }

    /// Hash of the name-ordered contents.
    pub fn content_hash(&self) -> String {
        hash::digest_hex(self.to_text().as_bytes())
    }
}
