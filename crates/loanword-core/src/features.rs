// Categorical phone features: sonority, manner, place, voicing.

use hashbrown::HashMap;
use loanword_fst::Label;

/// A feature dimension along which two phones can disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Sonority,
    Manner,
    Place,
    Voicing,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Sonority,
        Dimension::Manner,
        Dimension::Place,
        Dimension::Voicing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Sonority => "sonority",
            Dimension::Manner => "manner",
            Dimension::Place => "place",
            Dimension::Voicing => "voicing",
        }
    }
}

/// Maps every label to a category index of one dimension.
///
/// Categories are numbered by their position in the ordered class list. A
/// label listed in several classes belongs to the last of them; a label in
/// none belongs to the implicit "other" category, numbered after the last
/// class.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    index: HashMap<Label, usize>,
    other: usize,
}

impl CategoryTable {
    pub fn new(classes: &[Vec<Label>]) -> Self {
        let mut index = HashMap::new();
        for (i, class) in classes.iter().enumerate() {
            for &label in class {
                index.insert(label, i);
            }
        }
        Self {
            index,
            other: classes.len(),
        }
    }

    #[inline]
    pub fn category(&self, label: Label) -> usize {
        self.index.get(&label).copied().unwrap_or(self.other)
    }

    /// Number of categories including "other".
    pub fn num_categories(&self) -> usize {
        self.other + 1
    }
}
