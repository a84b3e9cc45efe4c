// Closed symbol set of a language pair and the feature lookups over it.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use loanword_fst::{Label, SymbolTable};

use crate::error::CoreError;
use crate::features::{CategoryTable, Dimension};
use crate::hash;
use crate::profile::{LanguageProfile, phones};
use crate::weights::{self, WeightVector};

/// Boundary inserted after a consonant-final syllable.
pub const CONSONANT_BOUNDARY: &str = ".C.";
/// Boundary inserted after a vowel-final syllable.
pub const VOWEL_BOUNDARY: &str = ".V.";

/// A source/target alternation: two label sequences, either may be empty.
pub type Alternation = (Vec<Label>, Vec<Label>);

/// Affix sequences resolved to labels.
#[derive(Debug, Clone, Default)]
pub struct Affixes {
    pub source_prefixes: Vec<Vec<Label>>,
    pub source_suffixes: Vec<Vec<Label>>,
    pub target_prefixes: Vec<Vec<Label>>,
    pub target_suffixes: Vec<Vec<Label>>,
}

/// The closed symbol set: epsilon, the two syllable boundaries, the phones
/// of a language pair and, once registered, the constraint markers.
///
/// Construction is two-phase. [`Alphabet::new`] declares phones and
/// boundaries; [`Alphabet::register_constraint_weights`] appends the
/// constraint markers and freezes the set. Labels are stable: epsilon is 0,
/// `.C.` is 1, `.V.` is 2, then phones in sorted order, then markers in
/// sorted order.
#[derive(Debug, Clone)]
pub struct Alphabet {
    name: String,
    symbols: SymbolTable,
    consonant_boundary: Label,
    vowel_boundary: Label,
    letters: Vec<Label>,
    vowels: HashSet<Label>,
    consonants: HashSet<Label>,
    semivowels: HashSet<Label>,
    sonority_classes: Vec<Vec<Label>>,
    categories: [CategoryTable; 4],
    pharyngeal: HashSet<Label>,
    pharyngealized: HashSet<Label>,
    glottal: HashSet<Label>,
    similar_phones: Vec<Alternation>,
    final_vowels: Vec<Alternation>,
    affixes: Affixes,
    /// Marker name to (label, weight); `None` until registration.
    markers: Option<BTreeMap<String, (Label, f64)>>,
}

impl Alphabet {
    /// Declares the phones of `profile` and resolves its tables.
    ///
    /// Every phone named by a feature class, an alternation table or an
    /// affix must be in the inventory.
    pub fn new(profile: &LanguageProfile) -> Result<Self, CoreError> {
        let semivowel_list = phones(&profile.semivowels);
        let vowel_list = phones(&profile.vowels);
        let consonant_list = phones(&profile.consonants);

        let mut letter_strings: Vec<&str> = semivowel_list
            .iter()
            .chain(&vowel_list)
            .chain(&consonant_list)
            .map(String::as_str)
            .collect();
        letter_strings.sort_unstable();
        letter_strings.dedup();

        let mut symbols = SymbolTable::new();
        let consonant_boundary = symbols.add_symbol(CONSONANT_BOUNDARY);
        let vowel_boundary = symbols.add_symbol(VOWEL_BOUNDARY);
        let letters: Vec<Label> = letter_strings.iter().map(|s| symbols.add_symbol(s)).collect();

        let lookup = |phone: &str, context: &str| -> Result<Label, CoreError> {
            match symbols.find(phone) {
                Some(l) if l > vowel_boundary => Ok(l),
                _ => Err(CoreError::unknown_symbol(phone, context)),
            }
        };
        let resolve = |list: &str, context: &str| -> Result<Vec<Label>, CoreError> {
            phones(list).iter().map(|p| lookup(p, context)).collect()
        };
        let resolve_classes = |classes: &[String], context: &str| -> Result<Vec<Vec<Label>>, CoreError> {
            classes.iter().map(|c| resolve(c, context)).collect()
        };
        let resolve_alternations =
            |table: &[[String; 2]], context: &str| -> Result<Vec<Alternation>, CoreError> {
                table
                    .iter()
                    .map(|[s, t]| Ok((resolve(s, context)?, resolve(t, context)?)))
                    .collect()
            };

        let semivowels: HashSet<Label> = resolve(&profile.semivowels, "semivowels")?.into_iter().collect();
        let mut vowels: HashSet<Label> = resolve(&profile.vowels, "vowels")?.into_iter().collect();
        let mut consonants: HashSet<Label> =
            resolve(&profile.consonants, "consonants")?.into_iter().collect();
        vowels.extend(&semivowels);
        consonants.extend(&semivowels);

        let sonority_classes = resolve_classes(&profile.sonority, "sonority classes")?;
        let categories = [
            CategoryTable::new(&sonority_classes),
            CategoryTable::new(&resolve_classes(&profile.manner, "manner classes")?),
            CategoryTable::new(&resolve_classes(&profile.place, "place classes")?),
            CategoryTable::new(&resolve_classes(&profile.voicing, "voicing classes")?),
        ];

        let m = &profile.morphology;
        let affix = |list: &[String], context: &str| -> Result<Vec<Vec<Label>>, CoreError> {
            list.iter().map(|a| resolve(a, context)).collect()
        };
        let affixes = Affixes {
            source_prefixes: affix(&m.source_prefixes, "source prefixes")?,
            source_suffixes: affix(&m.source_suffixes, "source suffixes")?,
            target_prefixes: affix(&m.target_prefixes, "target prefixes")?,
            target_suffixes: affix(&m.target_suffixes, "target suffixes")?,
        };

        let pharyngeal = resolve(&profile.pharyngeal, "pharyngeal class")?.into_iter().collect();
        let pharyngealized = resolve(&profile.pharyngealized, "pharyngealized class")?
            .into_iter()
            .collect();
        let glottal = resolve(&profile.glottal, "glottal class")?.into_iter().collect();
        let similar_phones = resolve_alternations(&profile.similar_phones, "similar phones")?;
        let final_vowels = resolve_alternations(&profile.final_vowels, "final vowels")?;

        Ok(Self {
            name: profile.name.clone(),
            symbols,
            consonant_boundary,
            vowel_boundary,
            letters,
            vowels,
            consonants,
            semivowels,
            sonority_classes,
            categories,
            pharyngeal,
            pharyngealized,
            glottal,
            similar_phones,
            final_vowels,
            affixes,
            markers: None,
        })
    }

    /// Appends a marker for every weighted constraint (the catalog plus any
    /// extra names in `weights`) and freezes the symbol set.
    ///
    /// Names missing from `weights` get `default_weight`.
    pub fn register_constraint_weights(
        &mut self,
        weights: &WeightVector,
        default_weight: f64,
    ) -> Result<(), CoreError> {
        if self.markers.is_some() {
            return Err(CoreError::AlreadyFrozen);
        }
        let complete = weights.with_defaults(weights::CONSTRAINT_NAMES, default_weight);
        let mut markers = BTreeMap::new();
        for (name, w) in complete.iter() {
            if !weights::is_marker_name(name) {
                return Err(CoreError::unknown_symbol(name, "constraint weights"));
            }
            let label = self.symbols.add_symbol(name);
            markers.insert(name.to_string(), (label, w));
        }
        tracing::debug!(alphabet = %self.name, markers = markers.len(), "registered constraint weights");
        self.markers = Some(markers);
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.markers.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Label of a phone or boundary (or a registered marker).
    pub fn label(&self, symbol: &str) -> Result<Label, CoreError> {
        self.symbols
            .find(symbol)
            .filter(|&l| l != loanword_fst::EPSILON)
            .ok_or_else(|| CoreError::unknown_symbol(symbol, format!("alphabet {}", self.name)))
    }

    pub fn labels<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<Label>, CoreError> {
        symbols.iter().map(|s| self.label(s.as_ref())).collect()
    }

    /// String of a label; epsilon is the empty string.
    pub fn symbol(&self, label: Label) -> &str {
        self.symbols.symbol(label).unwrap_or("")
    }

    /// Label of a constraint marker. Fails before registration.
    pub fn marker(&self, name: &str) -> Result<Label, CoreError> {
        self.markers
            .as_ref()
            .and_then(|m| m.get(name))
            .map(|&(label, _)| label)
            .ok_or_else(|| CoreError::unknown_symbol(name, "constraint markers"))
    }

    /// Registered weight of a constraint. Fails before registration.
    pub fn constraint_weight(&self, name: &str) -> Result<f64, CoreError> {
        self.markers
            .as_ref()
            .and_then(|m| m.get(name))
            .map(|&(_, w)| w)
            .ok_or_else(|| CoreError::unknown_symbol(name, "constraint markers"))
    }

    /// `(label, weight)` of every registered marker, in label order.
    pub fn markers(&self) -> Vec<(Label, f64)> {
        let mut all: Vec<(Label, f64)> = self
            .markers
            .iter()
            .flat_map(|m| m.values().copied())
            .collect();
        all.sort_by_key(|&(l, _)| l);
        all
    }

    /// Registered constraint weights as a vector.
    pub fn constraint_weights(&self) -> WeightVector {
        WeightVector::from_pairs(
            self.markers
                .iter()
                .flat_map(|m| m.iter().map(|(n, &(_, w))| (n.clone(), w))),
        )
    }

    #[inline]
    pub fn consonant_boundary(&self) -> Label {
        self.consonant_boundary
    }

    #[inline]
    pub fn vowel_boundary(&self) -> Label {
        self.vowel_boundary
    }

    pub fn boundaries(&self) -> [Label; 2] {
        [self.consonant_boundary, self.vowel_boundary]
    }

    /// All phones, in label order.
    pub fn letters(&self) -> &[Label] {
        &self.letters
    }

    /// Vowels including semivowels, in label order.
    pub fn vowels(&self) -> Vec<Label> {
        self.letters.iter().copied().filter(|l| self.vowels.contains(l)).collect()
    }

    /// Consonants including semivowels, in label order.
    pub fn consonants(&self) -> Vec<Label> {
        self.letters.iter().copied().filter(|l| self.consonants.contains(l)).collect()
    }

    /// Vowels that are not semivowels: the possible syllable peaks.
    pub fn pure_vowels(&self) -> Vec<Label> {
        self.letters.iter().copied().filter(|&l| self.is_pure_vowel(l)).collect()
    }

    /// Phones that are not vowels of any kind.
    pub fn pure_consonants(&self) -> Vec<Label> {
        self.letters.iter().copied().filter(|l| !self.vowels.contains(l)).collect()
    }

    #[inline]
    pub fn is_letter(&self, label: Label) -> bool {
        label > self.vowel_boundary && self.letters.binary_search(&label).is_ok()
    }

    #[inline]
    pub fn is_vowel(&self, label: Label) -> bool {
        self.vowels.contains(&label)
    }

    #[inline]
    pub fn is_consonant(&self, label: Label) -> bool {
        self.consonants.contains(&label)
    }

    #[inline]
    pub fn is_semivowel(&self, label: Label) -> bool {
        self.semivowels.contains(&label)
    }

    #[inline]
    pub fn is_pure_vowel(&self, label: Label) -> bool {
        self.vowels.contains(&label) && !self.semivowels.contains(&label)
    }

    #[inline]
    pub fn is_boundary(&self, label: Label) -> bool {
        label == self.consonant_boundary || label == self.vowel_boundary
    }

    pub fn is_marker(&self, label: Label) -> bool {
        self.markers
            .as_ref()
            .is_some_and(|m| m.values().any(|&(l, _)| l == label))
    }

    /// Category index of `label` along `dimension`. Total over all labels.
    pub fn categorize(&self, label: Label, dimension: Dimension) -> usize {
        let table = match dimension {
            Dimension::Sonority => &self.categories[0],
            Dimension::Manner => &self.categories[1],
            Dimension::Place => &self.categories[2],
            Dimension::Voicing => &self.categories[3],
        };
        table.category(label)
    }

    /// Sonority classes from least to most sonorous.
    pub fn sonority_classes(&self) -> &[Vec<Label>] {
        &self.sonority_classes
    }

    pub fn is_pharyngeal(&self, label: Label) -> bool {
        self.pharyngeal.contains(&label)
    }

    pub fn is_pharyngealized(&self, label: Label) -> bool {
        self.pharyngealized.contains(&label)
    }

    pub fn is_glottal(&self, label: Label) -> bool {
        self.glottal.contains(&label)
    }

    pub fn similar_phones(&self) -> &[Alternation] {
        &self.similar_phones
    }

    pub fn final_vowels(&self) -> &[Alternation] {
        &self.final_vowels
    }

    pub fn affixes(&self) -> &Affixes {
        &self.affixes
    }

    /// Hash of the closed symbol set.
    pub fn content_hash(&self) -> String {
        hash::set_hash(self.symbols.iter().map(|(_, s)| s))
    }

    /// Joins the phone strings of `labels`, skipping epsilon.
    pub fn render(&self, labels: &[Label]) -> String {
        labels.iter().map(|&l| self.symbol(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arabic_swahili() -> Alphabet {
        Alphabet::new(&LanguageProfile::builtin("arabic-swahili").unwrap()).unwrap()
    }

    #[test]
    fn label_layout() {
        let abc = arabic_swahili();
        assert_eq!(abc.consonant_boundary(), 1);
        assert_eq!(abc.vowel_boundary(), 2);
        assert_eq!(abc.letters()[0], 3);
        let sorted: Vec<&str> = abc.letters().iter().map(|&l| abc.symbol(l)).collect();
        let mut check = sorted.clone();
        check.sort_unstable();
        assert_eq!(sorted, check);
    }

    #[test]
    fn semivowels_are_both_classes() {
        let abc = arabic_swahili();
        let w = abc.label("w").unwrap();
        assert!(abc.is_vowel(w) && abc.is_consonant(w) && abc.is_semivowel(w));
        assert!(!abc.is_pure_vowel(w));
        let a = abc.label("a").unwrap();
        assert!(abc.is_pure_vowel(a) && !abc.is_consonant(a));
        assert!(abc.pure_consonants().iter().all(|&l| !abc.is_vowel(l)));
    }

    #[test]
    fn categorize_is_total() {
        let abc = arabic_swahili();
        let p = abc.label("p").unwrap();
        let b = abc.label("b").unwrap();
        let a = abc.label("a").unwrap();
        assert_eq!(abc.categorize(p, Dimension::Sonority), 0);
        assert_eq!(abc.categorize(b, Dimension::Sonority), 1);
        // ʔ is a voiceless stop and a semivowel; the later class wins.
        let glottal_stop = abc.label("ʔ").unwrap();
        assert_eq!(abc.categorize(glottal_stop, Dimension::Sonority), 7);
        // Vowels have no voicing class: they share the "other" bucket.
        assert_eq!(abc.categorize(a, Dimension::Voicing), 2);
        assert_eq!(abc.categorize(abc.vowel_boundary(), Dimension::Voicing), 2);
        // ŋ is listed as dental and velar; velar is listed later.
        let eng = abc.label("ŋ").unwrap();
        assert_eq!(abc.categorize(eng, Dimension::Place), 5);
    }

    #[test]
    fn markers_require_registration() {
        let mut abc = arabic_swahili();
        let err = abc.marker(weights::MAX_V).unwrap_err();
        assert!(matches!(err, CoreError::UnknownSymbol { .. }));

        let w = WeightVector::from_pairs([(weights::MAX_V, 2.0)]);
        abc.register_constraint_weights(&w, 0.25).unwrap();
        assert!(abc.is_frozen());
        let max_v = abc.marker(weights::MAX_V).unwrap();
        assert!(abc.is_marker(max_v));
        assert!(!abc.is_letter(max_v));
        assert_eq!(abc.constraint_weight(weights::MAX_V).unwrap(), 2.0);
        assert_eq!(abc.constraint_weight(weights::LEN).unwrap(), 0.25);
        assert_eq!(abc.markers().len(), weights::CONSTRAINT_NAMES.len());
    }

    #[test]
    fn registration_freezes() {
        let mut abc = arabic_swahili();
        abc.register_constraint_weights(&WeightVector::new(), 0.0).unwrap();
        let before = abc.symbols().len();
        let err = abc
            .register_constraint_weights(&WeightVector::new(), 0.0)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyFrozen));
        assert_eq!(abc.symbols().len(), before);
    }

    #[test]
    fn bad_weight_names_are_unknown_symbols() {
        let mut abc = arabic_swahili();
        let w = WeightVector::from_pairs([("NOT-A-MARKER", 1.0)]);
        let err = abc.register_constraint_weights(&w, 0.0).unwrap_err();
        assert!(matches!(err, CoreError::UnknownSymbol { .. }));
    }

    #[test]
    fn unknown_phones_are_rejected() {
        let abc = arabic_swahili();
        assert!(matches!(abc.label("ʘ"), Err(CoreError::UnknownSymbol { .. })));
        assert!(abc.label("").is_err());

        let mut profile = LanguageProfile::builtin("arabic-swahili").unwrap();
        profile.similar_phones.push(["ʘ".to_string(), "a".to_string()]);
        let err = Alphabet::new(&profile).unwrap_err();
        assert!(matches!(err, CoreError::UnknownSymbol { ref context, .. } if context == "similar phones"));
    }

    #[test]
    fn tables_resolve() {
        let abc = arabic_swahili();
        let (src, tgt) = abc
            .final_vowels()
            .iter()
            .find(|(s, _)| s.is_empty())
            .unwrap();
        assert!(src.is_empty());
        assert_eq!(abc.render(tgt), "u");
        assert_eq!(abc.affixes().target_suffixes.len(), 7);
    }

    #[test]
    fn hash_tracks_closed_set() {
        let mut abc = arabic_swahili();
        let before = abc.content_hash();
        assert_eq!(before, arabic_swahili().content_hash());
        abc.register_constraint_weights(&WeightVector::new(), 0.0).unwrap();
        assert_ne!(before, abc.content_hash());
    }

    #[test]
    fn maltese_profile_builds() {
        let abc = Alphabet::new(&LanguageProfile::builtin("italian-maltese").unwrap()).unwrap();
        assert!(abc.label("ħ").is_ok());
        assert!(abc.affixes().source_prefixes.is_empty());
        assert_eq!(abc.sonority_classes().len(), 9);
    }

    #[test]
    fn romanian_profile_builds() {
        let abc = Alphabet::new(&LanguageProfile::builtin("french-romanian").unwrap()).unwrap();
        let nasal = abc.label("ɑ̃").unwrap();
        assert!(abc.is_vowel(nasal));
        let y = abc.label("y").unwrap();
        assert!(abc.is_vowel(y) && abc.is_consonant(y));
        assert!(abc.label("ħ").is_err());
        assert!(
            abc.final_vowels()
                .iter()
                .any(|(s, t)| abc.render(s) == "ɑ̃" && abc.render(t) == "ent")
        );
        assert_eq!(abc.sonority_classes().len(), 9);
    }
}
