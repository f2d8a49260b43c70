//! Question Generation Service
//!
//! This module asks a language model for a set of multiple-choice vocabulary
//! questions and turns its structured JSON answer into validated
//! [`Question`]s. The model is asked to follow a JSON schema, but nothing
//! enforces that on its side, so every response is re-checked here before it
//! reaches the quiz.

use crate::language::Language;
use crate::question::{Question, QuestionError, QuizOption};
use crate::selection::Selection;
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use schemars::{JsonSchema, generate::SchemaSettings};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, info};

/// Number of questions in one quiz.
pub const QUESTIONS_PER_QUIZ: usize = 30;

/// Key of the prompt template in the prompts map.
pub const PROMPT_KEY: &str = "generate_questions";

/// Built-in prompt template, used when no `generate_questions` prompt is
/// supplied. Placeholders: `{languages}`, `{level}`, `{unit}`, `{count}`.
pub const DEFAULT_PROMPT: &str = r#"You are an expert on the "Yeni Istanbul" Turkish course books.
Task: give a word in Uzbek (for example "Kitob") and build a quiz that asks for its translations into {languages}.
Book level: {level}, unit: {unit}. Use vocabulary that appears in this unit.

These rules must not be broken:
1. Generate exactly {count} questions.
2. Every question has EXACTLY 4 options and exactly one of them is correct.
3. The "text" field of an option is NEVER empty.
4. The text of every option lists the word's translations into the selected languages ({languages}) on one line, for example "Book / Kniga / Kitap".
5. The "word" field contains ONLY the Uzbek word.
6. "correctIndex" is the 0-based position of the correct option.
7. "explanation" is one short sentence about the word, written in the first selected language.
8. Answer in JSON only."#;

const SYSTEM_PROMPT: &str =
    "You write vocabulary quizzes for language learners and always answer with JSON only.";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("the model returned no content")]
    EmptyResponse,
    #[error("the model returned malformed quiz data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("the model returned no questions")]
    NoQuestions,
    #[error("expected {expected} questions, the model returned {actual}")]
    WrongQuestionCount { expected: usize, actual: usize },
    #[error("question {index} is invalid: {reason}")]
    InvalidQuestion {
        index: usize,
        reason: QuestionError,
    },
    #[error("request to the model failed: {0}")]
    Request(#[from] OpenAIError),
}

/// Defines the contract for any service that can produce a question set.
///
/// Implementations either return a complete, validated set or fail; there is
/// no partial result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_questions(
        &self,
        selection: Selection,
    ) -> Result<Vec<Question>, GenerationError>;
}

// --- Wire format ---

/// One question exactly as the model is asked to emit it.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    word: String,
    #[serde(default)]
    source_language: Option<String>,
    #[serde(default)]
    target_language: Option<String>,
    #[schemars(length(min = 4, max = 4))]
    options: Vec<QuizOption>,
    correct_index: i64,
    #[serde(default)]
    explanation: String,
}

impl GeneratedQuestion {
    fn into_question(self) -> Result<Question, QuestionError> {
        Ok(
            Question::new(self.word, self.options, self.correct_index, self.explanation)?
                .with_languages(self.source_language, self.target_language),
        )
    }
}

/// Root object of the response schema.
#[derive(Debug, Deserialize, JsonSchema)]
struct GeneratedQuiz {
    questions: Vec<GeneratedQuestion>,
}

/// Models sometimes drop the wrapper object and answer with the bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratedPayload {
    Bare(Vec<GeneratedQuestion>),
    Wrapped(GeneratedQuiz),
}

impl GeneratedPayload {
    fn into_questions(self) -> Vec<GeneratedQuestion> {
        match self {
            GeneratedPayload::Bare(questions) => questions,
            GeneratedPayload::Wrapped(quiz) => quiz.questions,
        }
    }
}

/// Returns the JSON schema the model's answer must follow, asking for
/// exactly `count` questions.
pub fn response_schema(count: usize) -> Value {
    let schema = SchemaSettings::draft2020_12()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<GeneratedQuiz>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({}));
    if let Some(root) = value.as_object_mut() {
        root.remove("$schema");
    }
    if let Some(questions) = value
        .pointer_mut("/properties/questions")
        .and_then(Value::as_object_mut)
    {
        questions.insert("minItems".into(), json!(count));
        questions.insert("maxItems".into(), json!(count));
    }
    value
}

/// Removes a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parses and validates the model's text answer.
///
/// Fails unless the text holds exactly `expected` questions that all satisfy
/// the [`Question`] invariants.
pub fn parse_questions(text: &str, expected: usize) -> Result<Vec<Question>, GenerationError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let raw = serde_json::from_str::<GeneratedPayload>(body)?.into_questions();
    if raw.is_empty() {
        return Err(GenerationError::NoQuestions);
    }
    if raw.len() != expected {
        return Err(GenerationError::WrongQuestionCount {
            expected,
            actual: raw.len(),
        });
    }

    raw.into_iter()
        .enumerate()
        .map(|(index, q)| {
            q.into_question()
                .map_err(|reason| GenerationError::InvalidQuestion { index, reason })
        })
        .collect()
}

/// Fills the prompt template placeholders for a selection.
pub fn render_prompt(template: &str, selection: &Selection, count: usize) -> String {
    let languages = selection
        .languages
        .iter()
        .map(|l| l.name())
        .collect::<Vec<_>>()
        .join(", ");
    template
        .replace("{languages}", &languages)
        .replace("{level}", &selection.level.to_string())
        .replace("{unit}", &selection.unit.to_string())
        .replace("{count}", &count.to_string())
}

/// An implementation of `QuestionGenerator` for any OpenAI-compatible
/// chat-completions API (OpenAI itself, or Gemini's compatibility endpoint).
pub struct LLMQuestionGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: HashMap<String, String>,
    question_count: usize,
}

impl LLMQuestionGenerator {
    /// Creates a new LLM-backed generator.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the OpenAI-compatible service.
    /// * `model` - Model identifier used for the completion.
    /// * `prompts` - Prompt templates; a `"generate_questions"` entry
    ///   overrides [`DEFAULT_PROMPT`].
    pub fn new(config: OpenAIConfig, model: String, prompts: HashMap<String, String>) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            prompts,
            question_count: QUESTIONS_PER_QUIZ,
        }
    }

    fn template(&self) -> &str {
        self.prompts
            .get(PROMPT_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROMPT)
    }
}

#[async_trait]
impl QuestionGenerator for LLMQuestionGenerator {
    async fn generate_questions(
        &self,
        selection: Selection,
    ) -> Result<Vec<Question>, GenerationError> {
        let prompt = render_prompt(self.template(), &selection, self.question_count);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("A list of multiple-choice vocabulary questions".into()),
                    name: "quiz_questions".into(),
                    schema: Some(response_schema(self.question_count)),
                    strict: None,
                },
            })
            .build()?;

        info!(
            languages = ?selection.languages,
            level = %selection.level,
            unit = %selection.unit,
            model = %self.model,
            "Requesting quiz questions"
        );
        let response = self.client.chat().create(request).await?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or(GenerationError::EmptyResponse)?;
        debug!(bytes = text.len(), "Received quiz payload");

        let questions = parse_questions(text, self.question_count)?;
        info!(count = questions.len(), "Quiz questions generated");
        Ok(questions)
    }
}

/// Offline vocabulary used by [`OfflineQuestionGenerator`]:
/// Uzbek word, then English, Russian, Turkish and German translations.
const MOCK_WORDS: [(&str, [&str; 4]); 8] = [
    ("Kitob", ["Book", "Kniga", "Kitap", "Buch"]),
    ("Qalam", ["Pen", "Ruchka", "Kalem", "Stift"]),
    ("Eshik", ["Door", "Dver", "Kapı", "Tür"]),
    ("Mushuk", ["Cat", "Koshka", "Kedi", "Katze"]),
    ("Suv", ["Water", "Voda", "Su", "Wasser"]),
    ("Non", ["Bread", "Khleb", "Ekmek", "Brot"]),
    ("Uy", ["House", "Dom", "Ev", "Haus"]),
    ("Maktab", ["School", "Shkola", "Okul", "Schule"]),
];

/// A deterministic `QuestionGenerator` for development and testing.
///
/// It needs no network access and always returns the same questions for the
/// same selection, with the correct option cycling through all four slots.
pub struct OfflineQuestionGenerator {
    question_count: usize,
}

impl OfflineQuestionGenerator {
    pub fn new(question_count: usize) -> Self {
        Self { question_count }
    }

    fn translation(word: usize, language: Language) -> String {
        let (_, translations) = MOCK_WORDS[word % MOCK_WORDS.len()];
        match language {
            Language::English => translations[0].to_string(),
            Language::Russian => translations[1].to_string(),
            Language::Turkish => translations[2].to_string(),
            Language::German => translations[3].to_string(),
            other => format!("{} ({})", translations[0], other),
        }
    }

    fn option_text(word: usize, selection: &Selection) -> String {
        selection
            .languages
            .iter()
            .map(|l| Self::translation(word, *l))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl Default for OfflineQuestionGenerator {
    fn default() -> Self {
        Self::new(QUESTIONS_PER_QUIZ)
    }
}

#[async_trait]
impl QuestionGenerator for OfflineQuestionGenerator {
    async fn generate_questions(
        &self,
        selection: Selection,
    ) -> Result<Vec<Question>, GenerationError> {
        let primary = selection.primary_language().to_string();
        (0..self.question_count)
            .map(|i| {
                let word = i % MOCK_WORDS.len();
                let correct = i % 4;
                let options = (0..4)
                    .map(|slot| {
                        // Distractors are the following words in the table.
                        let shown = if slot == correct {
                            word
                        } else {
                            word + (slot + 4 - correct) % 4
                        };
                        QuizOption::new(Self::option_text(shown, &selection), primary.clone())
                    })
                    .collect();
                let explanation = format!(
                    "\"{}\" translates as \"{}\".",
                    MOCK_WORDS[word].0,
                    Self::option_text(word, &selection)
                );
                Question::new(MOCK_WORDS[word].0, options, correct as i64, explanation)
                    .map(|q| q.with_languages(Some("Uzbek".into()), Some(primary.clone())))
                    .map_err(|reason| GenerationError::InvalidQuestion { index: i, reason })
            })
            .collect()
    }
}
