use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of answer options every question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("the prompt word is empty")]
    EmptyWord,
    #[error("expected 4 options, got {0}")]
    WrongOptionCount(usize),
    #[error("option {0} has no text")]
    EmptyOption(usize),
    #[error("correct index {0} is out of range")]
    CorrectIndexOutOfRange(i64),
}

/// One answer choice: the translation(s) shown to the learner and the
/// language they are written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuizOption {
    #[schemars(length(min = 1))]
    pub text: String,
    pub language: String,
}

impl QuizOption {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }
}

/// A single multiple-choice vocabulary question.
///
/// Instances are only built through [`Question::new`], which guarantees a
/// non-empty word, exactly four options with non-empty text, and a correct
/// index pointing at one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    word: String,
    source_language: Option<String>,
    target_language: Option<String>,
    options: [QuizOption; OPTIONS_PER_QUESTION],
    correct_index: usize,
    explanation: String,
}

impl Question {
    pub fn new(
        word: impl Into<String>,
        options: Vec<QuizOption>,
        correct_index: i64,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let word = word.into();
        if word.trim().is_empty() {
            return Err(QuestionError::EmptyWord);
        }
        if let Some(idx) = options.iter().position(|o| o.text.trim().is_empty()) {
            return Err(QuestionError::EmptyOption(idx));
        }
        let count = options.len();
        let options: [QuizOption; OPTIONS_PER_QUESTION] = options
            .try_into()
            .map_err(|_| QuestionError::WrongOptionCount(count))?;
        let correct_index = usize::try_from(correct_index)
            .ok()
            .filter(|idx| *idx < OPTIONS_PER_QUESTION)
            .ok_or(QuestionError::CorrectIndexOutOfRange(correct_index))?;

        Ok(Self {
            word,
            source_language: None,
            target_language: None,
            options,
            correct_index,
            explanation: explanation.into(),
        })
    }

    /// Attaches the optional language tags the model may return.
    pub fn with_languages(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_language = source;
        self.target_language = target;
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn source_language(&self) -> Option<&str> {
        self.source_language.as_deref()
    }

    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    pub fn option(&self, index: usize) -> Option<&QuizOption> {
        self.options.get(index)
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_option(&self) -> &QuizOption {
        &self.options[self.correct_index]
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(texts: &[&str]) -> Vec<QuizOption> {
        texts.iter().map(|t| QuizOption::new(*t, "English")).collect()
    }

    #[test]
    fn test_valid_question() {
        let q = Question::new("Kitob", options(&["Book", "Pen", "Door", "Cat"]), 0, "Kitob = Book")
            .unwrap();
        assert_eq!(q.word(), "Kitob");
        assert_eq!(q.correct_option().text, "Book");
        assert!(q.is_correct(0));
        assert!(!q.is_correct(3));
        assert!(q.option(4).is_none());
    }

    #[test]
    fn test_rejects_wrong_option_count() {
        let err = Question::new("Kitob", options(&["Book", "Pen", "Door"]), 0, "").unwrap_err();
        assert_eq!(err, QuestionError::WrongOptionCount(3));
        let err = Question::new("Kitob", options(&["a", "b", "c", "d", "e"]), 0, "").unwrap_err();
        assert_eq!(err, QuestionError::WrongOptionCount(5));
    }

    #[test]
    fn test_rejects_empty_option_text() {
        let err = Question::new("Kitob", options(&["Book", " ", "Door", "Cat"]), 0, "").unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption(1));
    }

    #[test]
    fn test_rejects_correct_index_out_of_range() {
        let opts = options(&["Book", "Pen", "Door", "Cat"]);
        assert_eq!(
            Question::new("Kitob", opts.clone(), 4, "").unwrap_err(),
            QuestionError::CorrectIndexOutOfRange(4)
        );
        assert_eq!(
            Question::new("Kitob", opts, -1, "").unwrap_err(),
            QuestionError::CorrectIndexOutOfRange(-1)
        );
    }

    #[test]
    fn test_rejects_empty_word() {
        let err = Question::new("", options(&["Book", "Pen", "Door", "Cat"]), 0, "").unwrap_err();
        assert_eq!(err, QuestionError::EmptyWord);
    }
}
