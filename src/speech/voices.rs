//! Voice catalog and voice selection
//!
//! Platform voice lists carry little reliable metadata, so selection combines
//! declared gender, name hints and a fixed fallback order. The name hints are
//! heuristics only. What matters is that the same catalog and preference
//! always produce the same voice.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

impl VoiceGender {
    pub fn opposite(self) -> Self {
        match self {
            VoiceGender::Female => VoiceGender::Male,
            VoiceGender::Male => VoiceGender::Female,
        }
    }

    fn name_hints(self) -> &'static [&'static str] {
        match self {
            VoiceGender::Female => &["female", "woman", "zira", "eva", "susan", "samantha"],
            VoiceGender::Male => &["male", "man", "david", "mark", "daniel", "alex"],
        }
    }
}

impl fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceGender::Female => write!(f, "Female"),
            VoiceGender::Male => write!(f, "Male"),
        }
    }
}

impl std::str::FromStr for VoiceGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" | "f" => Ok(VoiceGender::Female),
            "male" | "m" => Ok(VoiceGender::Male),
            other => Err(format!("Unknown voice gender: {}", other)),
        }
    }
}

/// One entry of the platform voice catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Identifier handed back to the synthesizer
    pub id: String,
    pub name: String,
    /// BCP 47 style language tag, e.g. `en-US`
    pub language: String,
    pub gender: Option<VoiceGender>,
    pub is_default: bool,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
            gender: None,
            is_default: false,
        }
    }

    pub fn with_gender(mut self, gender: VoiceGender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Regional English, e.g. `en-GB` or `en_us`
    pub fn is_english(&self) -> bool {
        let lang = self.language.to_ascii_lowercase();
        lang.starts_with("en-") || lang.starts_with("en_")
    }

    fn is_us_english(&self) -> bool {
        let lang = self.language.to_ascii_lowercase().replace('_', "-");
        lang == "en-us"
    }

    /// Whether metadata or the name suggest `gender`
    pub fn suggests(&self, gender: VoiceGender) -> bool {
        match self.gender {
            Some(declared) => declared == gender,
            None => name_hints(&self.name, gender),
        }
    }
}

// whole-word match so "female" never counts as "male"
fn name_hints(name: &str, gender: VoiceGender) -> bool {
    let name = name.to_lowercase();
    name.split(|c: char| !c.is_alphanumeric())
        .any(|word| gender.name_hints().contains(&word))
}

fn english_voices(catalog: &[Voice]) -> Vec<&Voice> {
    catalog.iter().filter(|voice| voice.is_english()).collect()
}

/// Pick the voice for `gender` from the catalog
pub fn select_voice(catalog: &[Voice], gender: VoiceGender) -> Option<Voice> {
    let english = english_voices(catalog);

    if english.is_empty() {
        return catalog
            .iter()
            .find(|voice| voice.language.to_ascii_lowercase().starts_with("en"))
            .or_else(|| catalog.iter().find(|voice| voice.is_default))
            .or_else(|| catalog.first())
            .cloned();
    }

    english
        .iter()
        .find(|voice| voice.gender == Some(gender))
        .or_else(|| {
            english
                .iter()
                .find(|voice| voice.gender.is_none() && name_hints(&voice.name, gender))
        })
        .or_else(|| english.iter().find(|voice| !voice.suggests(gender.opposite())))
        .or_else(|| english.iter().find(|voice| voice.is_default))
        .or_else(|| english.iter().find(|voice| voice.is_us_english()))
        .or_else(|| english.first())
        .map(|voice| (*voice).clone())
}

/// Whether the catalog offers a real choice between a female and a male voice
pub fn has_voice_options(catalog: &[Voice]) -> bool {
    let english = english_voices(catalog);
    english.iter().any(|voice| voice.suggests(VoiceGender::Female))
        && english.iter().any(|voice| voice.suggests(VoiceGender::Male))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Voice> {
        vec![
            Voice::new("fr", "Amelie", "fr-FR"),
            Voice::new("david", "Microsoft David", "en-US"),
            Voice::new("zira", "Microsoft Zira", "en-US"),
            Voice::new("gb", "Google UK English", "en-GB").as_default(),
        ]
    }

    #[test]
    fn test_selects_by_name_hint() {
        let voices = catalog();
        assert_eq!(select_voice(&voices, VoiceGender::Female).unwrap().id, "zira");
        assert_eq!(select_voice(&voices, VoiceGender::Male).unwrap().id, "david");
    }

    #[test]
    fn test_female_is_not_male() {
        let voices = vec![
            Voice::new("f", "English Female", "en-US"),
            Voice::new("m", "English Male", "en-US"),
        ];
        assert_eq!(select_voice(&voices, VoiceGender::Male).unwrap().id, "m");
        assert!(has_voice_options(&voices));
    }

    #[test]
    fn test_declared_gender_wins() {
        let voices = vec![
            Voice::new("a", "Zira", "en-US").with_gender(VoiceGender::Male),
            Voice::new("b", "Anon", "en-GB").with_gender(VoiceGender::Female),
        ];
        assert_eq!(select_voice(&voices, VoiceGender::Female).unwrap().id, "b");
        assert_eq!(select_voice(&voices, VoiceGender::Male).unwrap().id, "a");
    }

    #[test]
    fn test_fallback_avoids_opposite_gender() {
        let voices = vec![
            Voice::new("m", "David", "en-US"),
            Voice::new("n", "Neutral", "en-AU"),
        ];
        assert_eq!(select_voice(&voices, VoiceGender::Female).unwrap().id, "n");
    }

    #[test]
    fn test_non_english_catalog() {
        let voices = vec![
            Voice::new("de", "Anna", "de-DE"),
            Voice::new("es", "Jorge", "es-ES").as_default(),
        ];
        assert_eq!(select_voice(&voices, VoiceGender::Female).unwrap().id, "es");

        let with_bare_en = vec![Voice::new("de", "Anna", "de-DE"), Voice::new("en", "Plain", "en")];
        assert_eq!(select_voice(&with_bare_en, VoiceGender::Male).unwrap().id, "en");

        assert!(select_voice(&[], VoiceGender::Male).is_none());
    }

    #[test]
    fn test_voice_options_need_both_genders() {
        assert!(has_voice_options(&catalog()));
        let only_male = vec![Voice::new("m", "Mark", "en-US"), Voice::new("x", "Robot", "en-US")];
        assert!(!has_voice_options(&only_male));
    }

    #[test]
    fn test_parse_gender() {
        assert_eq!("Male".parse::<VoiceGender>().unwrap(), VoiceGender::Male);
        assert_eq!("f".parse::<VoiceGender>().unwrap(), VoiceGender::Female);
        assert!("robot".parse::<VoiceGender>().is_err());
    }
}
