// Symbol table: string-to-label and label-to-string mapping.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{EPSILON, Label};

/// Bidirectional mapping between symbol strings and arc labels.
///
/// Label 0 is always epsilon and is stored as the empty string. Labels are
/// handed out densely in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    /// Maps label to its string representation.
    pub symbol_strings: Vec<String>,
    #[serde(skip)]
    symbol_to_label: HashMap<String, Label>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut symbol_to_label = HashMap::new();
        symbol_to_label.insert(String::new(), EPSILON);
        Self {
            symbol_strings: vec![String::new()],
            symbol_to_label,
        }
    }

    /// Adds `symbol` if missing and returns its label.
    pub fn add_symbol(&mut self, symbol: &str) -> Label {
        if let Some(&label) = self.symbol_to_label.get(symbol) {
            return label;
        }
        let label = self.symbol_strings.len() as Label;
        self.symbol_strings.push(symbol.to_string());
        self.symbol_to_label.insert(symbol.to_string(), label);
        label
    }

    pub fn find(&self, symbol: &str) -> Option<Label> {
        self.symbol_to_label.get(symbol).copied()
    }

    pub fn symbol(&self, label: Label) -> Option<&str> {
        self.symbol_strings.get(label as usize).map(String::as_str)
    }

    /// Number of labels including epsilon.
    pub fn len(&self) -> usize {
        self.symbol_strings.len()
    }

    /// A table always holds epsilon, so it is empty when nothing else was added.
    pub fn is_empty(&self) -> bool {
        self.symbol_strings.len() <= 1
    }

    /// Non-epsilon `(label, symbol)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> {
        self.symbol_strings
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, s)| (i as Label, s.as_str()))
    }

    /// Rebuilds the reverse index after deserialization.
    pub fn reindex(&mut self) {
        self.symbol_to_label = self
            .symbol_strings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as Label))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_is_label_zero() {
        let table = SymbolTable::new();
        assert_eq!(table.find(""), Some(EPSILON));
        assert_eq!(table.symbol(EPSILON), Some(""));
        assert!(table.is_empty());
    }

    #[test]
    fn add_symbol_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.add_symbol("a");
        let b = table.add_symbol("dʒ");
        assert_eq!(table.add_symbol("a"), a);
        assert_eq!((a, b), (1, 2));
        assert_eq!(table.symbol(b), Some("dʒ"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn iter_skips_epsilon() {
        let mut table = SymbolTable::new();
        table.add_symbol("x");
        table.add_symbol(".C.");
        let all: Vec<_> = table.iter().collect();
        assert_eq!(all, vec![(1, "x"), (2, ".C.")]);
    }

    #[test]
    fn reindex_restores_lookup() {
        let mut table = SymbolTable::new();
        table.add_symbol("q");
        let mut copy = SymbolTable {
            symbol_strings: table.symbol_strings.clone(),
            symbol_to_label: HashMap::new(),
        };
        assert_eq!(copy.find("q"), None);
        copy.reindex();
        assert_eq!(copy.find("q"), Some(1));
    }
}
