//! Languages, levels and units a learner can pick from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default voice locale for identifiers that do not name a known language.
pub const FALLBACK_LOCALE: &str = "tr-TR";

/// Lowest selectable unit of the course book.
pub const MIN_UNIT: u8 = 1;
/// Highest selectable unit of the course book.
pub const MAX_UNIT: u8 = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown language: '{0}'")]
    UnknownLanguage(String),
    #[error("unknown level: '{0}'")]
    UnknownLevel(String),
    #[error("unit must be a number between 1 and 12, got '{0}'")]
    InvalidUnit(String),
}

/// A target language the quiz can translate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Russian,
    German,
    French,
    Spanish,
    Turkish,
    Arabic,
    Korean,
    Japanese,
    Chinese,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::English,
        Language::Russian,
        Language::German,
        Language::French,
        Language::Spanish,
        Language::Turkish,
        Language::Arabic,
        Language::Korean,
        Language::Japanese,
        Language::Chinese,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Russian",
            Language::German => "German",
            Language::French => "French",
            Language::Spanish => "Spanish",
            Language::Turkish => "Turkish",
            Language::Arabic => "Arabic",
            Language::Korean => "Korean",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
        }
    }

    /// The BCP 47 locale used to pick a speech voice for this language.
    pub fn locale(self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Russian => "ru-RU",
            Language::German => "de-DE",
            Language::French => "fr-FR",
            Language::Spanish => "es-ES",
            Language::Turkish => "tr-TR",
            Language::Arabic => "ar-SA",
            Language::Korean => "ko-KR",
            Language::Japanese => "ja-JP",
            Language::Chinese => "zh-CN",
        }
    }
}

/// Resolves any language identifier (as free text, e.g. an option's language
/// tag returned by the model) to a voice locale.
pub fn locale_for(identifier: &str) -> &'static str {
    identifier
        .parse::<Language>()
        .map(Language::locale)
        .unwrap_or(FALLBACK_LOCALE)
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseError::UnknownLanguage(s.to_string()))
    }
}

/// CEFR proficiency level, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::A1, Level::A2, Level::B1, Level::B2];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
        };
        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(Level::A1),
            "A2" => Ok(Level::A2),
            "B1" => Ok(Level::B1),
            "B2" => Ok(Level::B2),
            _ => Err(ParseError::UnknownLevel(s.to_string())),
        }
    }
}

/// A course book unit, always within `MIN_UNIT..=MAX_UNIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Unit(u8);

impl Unit {
    pub fn new(number: u8) -> Option<Self> {
        (MIN_UNIT..=MAX_UNIT).contains(&number).then_some(Unit(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Unit> {
        (MIN_UNIT..=MAX_UNIT).map(Unit)
    }
}

impl TryFrom<u8> for Unit {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Unit::new(value).ok_or_else(|| ParseError::InvalidUnit(value.to_string()))
    }
}

impl From<Unit> for u8 {
    fn from(unit: Unit) -> Self {
        unit.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Unit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Unit::new)
            .ok_or_else(|| ParseError::InvalidUnit(s.to_string()))
    }
}
