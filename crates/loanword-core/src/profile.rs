// Language-pair data: inventories, feature classes, alternation tables, affixes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const ARABIC_SWAHILI: &str = include_str!("../profiles/arabic-swahili.toml");
const ITALIAN_MALTESE: &str = include_str!("../profiles/italian-maltese.toml");
const FRENCH_ROMANIAN: &str = include_str!("../profiles/french-romanian.toml");

/// Names of the profiles compiled into the crate.
pub const BUILTIN_PROFILES: [&str; 3] = ["arabic-swahili", "italian-maltese", "french-romanian"];

/// Affix lists used by the morphology stages. Each entry is a
/// space-separated phone sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffixLists {
    #[serde(default)]
    pub source_prefixes: Vec<String>,
    #[serde(default)]
    pub source_suffixes: Vec<String>,
    #[serde(default)]
    pub target_prefixes: Vec<String>,
    #[serde(default)]
    pub target_suffixes: Vec<String>,
}

/// Everything language specific about a source/target pair.
///
/// Phone lists are space-separated strings. Feature dimensions are ordered
/// class lists. Alternation tables hold `[source, target]` phone sequences,
/// either of which may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub name: String,
    pub semivowels: String,
    pub vowels: String,
    pub consonants: String,
    pub sonority: Vec<String>,
    pub manner: Vec<String>,
    pub place: Vec<String>,
    pub voicing: Vec<String>,
    #[serde(default)]
    pub pharyngeal: String,
    #[serde(default)]
    pub pharyngealized: String,
    #[serde(default)]
    pub glottal: String,
    #[serde(default)]
    pub similar_phones: Vec<[String; 2]>,
    #[serde(default)]
    pub final_vowels: Vec<[String; 2]>,
    #[serde(default)]
    pub morphology: AffixLists,
}

impl LanguageProfile {
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(text)?)
    }

    pub fn builtin(name: &str) -> Result<Self, CoreError> {
        match name {
            "arabic-swahili" => Self::from_toml_str(ARABIC_SWAHILI),
            "italian-maltese" => Self::from_toml_str(ITALIAN_MALTESE),
            "french-romanian" => Self::from_toml_str(FRENCH_ROMANIAN),
            other => Err(CoreError::UnknownProfile(other.to_string())),
        }
    }

    /// Resolves a built-in profile name, or reads a TOML profile file.
    pub fn load(name_or_path: &str) -> Result<Self, CoreError> {
        if BUILTIN_PROFILES.contains(&name_or_path) {
            return Self::builtin(name_or_path);
        }
        let path = Path::new(name_or_path);
        if !path.is_file() {
            return Err(CoreError::UnknownProfile(name_or_path.to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::from_toml_str(&text)
    }
}

/// Splits a space-separated phone list.
pub fn phones(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse() {
        for name in BUILTIN_PROFILES {
            let profile = LanguageProfile::builtin(name).unwrap();
            assert_eq!(profile.name, name);
            assert_eq!(profile.sonority.len(), 9);
            assert!(!profile.similar_phones.is_empty());
        }
    }

    #[test]
    fn arabic_swahili_tables() {
        let p = LanguageProfile::builtin("arabic-swahili").unwrap();
        assert!(p.final_vowels.contains(&["".to_string(), "u".to_string()]));
        assert!(p.similar_phones.contains(&["n ɣ".to_string(), "ŋ".to_string()]));
        assert_eq!(p.morphology.target_suffixes.len(), 7);
        assert_eq!(phones(&p.semivowels), vec!["ʔ", "w", "j"]);
    }

    #[test]
    fn french_romanian_tables() {
        let p = LanguageProfile::builtin("french-romanian").unwrap();
        assert!(p.similar_phones.contains(&["ɑ̃".to_string(), "a n".to_string()]));
        assert!(p.final_vowels.contains(&["a ʁ".to_string(), "a".to_string()]));
        assert!(p.pharyngeal.is_empty());
        assert!(p.morphology.target_suffixes.is_empty());
    }

    #[test]
    fn unknown_builtin() {
        let err = LanguageProfile::load("klingon-latin").unwrap_err();
        assert!(matches!(err, CoreError::UnknownProfile(_)));
    }

    #[test]
    fn custom_profile_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.toml");
        std::fs::write(
            &path,
            r#"
name = "tiny"
semivowels = ""
vowels = "a"
consonants = "t"
sonority = ["t", "a"]
manner = ["t"]
place = ["t"]
voicing = ["t"]
"#,
        )
        .unwrap();
        let profile = LanguageProfile::load(path.to_str().unwrap()).unwrap();
        assert_eq!(profile.name, "tiny");
        assert!(profile.morphology.source_prefixes.is_empty());
    }

    #[test]
    fn malformed_profile() {
        let err = LanguageProfile::from_toml_str("name = 3").unwrap_err();
        assert!(matches!(err, CoreError::Profile(_)));
    }
}
