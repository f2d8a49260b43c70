use crate::language::{Language, Level, Unit};
use serde::{Deserialize, Serialize};

/// A complete learner selection: what a quiz is generated for.
///
/// `languages` is never empty and keeps the order in which the learner picked
/// them. The first one is the primary language used for pronunciation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub languages: Vec<Language>,
    pub level: Level,
    pub unit: Unit,
}

impl Selection {
    /// Builds a selection, refusing an empty language list.
    pub fn new(languages: Vec<Language>, level: Level, unit: Unit) -> Option<Self> {
        if languages.is_empty() {
            return None;
        }
        Some(Self {
            languages,
            level,
            unit,
        })
    }

    pub fn primary_language(&self) -> Language {
        // Non-empty by construction; a deserialized empty list falls back to
        // the course language.
        self.languages.first().copied().unwrap_or(Language::Turkish)
    }
}

/// The selection as it is being filled in across the select steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDraft {
    languages: Vec<Language>,
    level: Option<Level>,
    unit: Option<Unit>,
}

impl SelectionDraft {
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn contains(&self, language: Language) -> bool {
        self.languages.contains(&language)
    }

    /// Adds the language at the end, or removes it if it was already picked.
    pub fn toggle_language(&mut self, language: Language) {
        if let Some(pos) = self.languages.iter().position(|l| *l == language) {
            self.languages.remove(pos);
        } else {
            self.languages.push(language);
        }
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = Some(level);
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = Some(unit);
    }

    pub fn has_languages(&self) -> bool {
        !self.languages.is_empty()
    }

    /// Returns the finished selection once languages, level and unit are all set.
    pub fn to_selection(&self) -> Option<Selection> {
        Selection::new(self.languages.clone(), self.level?, self.unit?)
    }
}
