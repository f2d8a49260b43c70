//! Quiz Session State Machine
//!
//! The whole quiz flow is a pure reducer: [`reduce`] takes the current
//! [`QuizState`] and one [`Event`] and returns the next state together with
//! the [`Command`]s the runtime should execute. Events that are not valid in
//! the current step leave the state untouched and produce no commands.

use crate::Command;
use crate::generator::GenerationError;
use crate::language::{Language, Level, Unit};
use crate::question::Question;
use crate::selection::{Selection, SelectionDraft};
use crate::speech::{HapticPattern, Utterance};
use tracing::{debug, error, info};

/// Shown to the learner when no question set could be generated.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Could not get questions from the AI. Please try again.";

/// The screen the learner is on. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Start,
    LanguageSelect,
    LevelSelect,
    UnitSelect,
    Loading,
    Quiz,
    Results,
}

/// Identifies one generation request so late answers to an abandoned request
/// can be told apart from the one currently awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// A user intent or a system notification fed into the reducer.
#[derive(Debug)]
pub enum Event {
    Begin,
    Back,
    ToggleLanguage(Language),
    ConfirmLanguages,
    SelectLevel(Level),
    SelectUnit(Unit),
    StartQuiz,
    QuestionsLoaded {
        token: RequestToken,
        result: Result<Vec<Question>, GenerationError>,
    },
    Answer(usize),
    /// Pronounce an option without answering.
    Pronounce(usize),
    Advance,
    Home,
    RequestClearHistory,
    ConfirmClearHistory,
    CancelClearHistory,
}

/// Final numbers of a completed quiz, handed to the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub selection: Selection,
    pub score: u32,
    pub total: u32,
}

/// One run through a fixed list of questions.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    selection: Selection,
    questions: Vec<Question>,
    current_index: usize,
    score: u32,
    selected_answer: Option<usize>,
}

impl QuizSession {
    fn new(selection: Selection, questions: Vec<Question>) -> Self {
        Self {
            selection,
            questions,
            current_index: 0,
            score: 0,
            selected_answer: None,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// The answer given to the current question, if any. Once set, the
    /// explanation is visible and the learner may advance.
    pub fn selected_answer(&self) -> Option<usize> {
        self.selected_answer
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    fn outcome(&self) -> QuizOutcome {
        QuizOutcome {
            selection: self.selection.clone(),
            score: self.score,
            total: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
        }
    }
}

/// Everything the quiz flow knows at one point in time.
#[derive(Debug, Clone, Default)]
pub struct QuizState {
    step: Step,
    selection: SelectionDraft,
    session: Option<QuizSession>,
    error: Option<String>,
    pending: Option<RequestToken>,
    next_token: u64,
    confirming_clear: bool,
}

impl QuizState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn selection(&self) -> &SelectionDraft {
        &self.selection
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// User-visible error from the last failed generation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pending_request(&self) -> Option<RequestToken> {
        self.pending
    }

    /// Whether the learner has asked to clear the history and must confirm.
    pub fn is_confirming_clear(&self) -> bool {
        self.confirming_clear
    }
}

/// The result of one reducer step.
#[derive(Debug)]
pub struct Transition {
    pub state: QuizState,
    pub commands: Vec<Command>,
}

impl Transition {
    fn stay(state: QuizState) -> Self {
        Self {
            state,
            commands: Vec::new(),
        }
    }

    fn with(state: QuizState, commands: Vec<Command>) -> Self {
        Self { state, commands }
    }
}

/// Applies `event` to `state`.
pub fn reduce(mut state: QuizState, event: Event) -> Transition {
    // Leaving the start screen in any way disarms a pending clear request.
    if !matches!(
        event,
        Event::ConfirmClearHistory | Event::CancelClearHistory | Event::RequestClearHistory
    ) {
        state.confirming_clear = false;
    }

    match (state.step, event) {
        (Step::Start, Event::Begin) => {
            state.step = Step::LanguageSelect;
            Transition::stay(state)
        }
        (Step::Start, Event::RequestClearHistory) => {
            state.confirming_clear = true;
            Transition::stay(state)
        }
        (Step::Start, Event::ConfirmClearHistory) if state.confirming_clear => {
            state.confirming_clear = false;
            info!("History clear confirmed");
            Transition::with(state, vec![Command::ClearHistory])
        }
        (Step::Start, Event::CancelClearHistory) => {
            state.confirming_clear = false;
            Transition::stay(state)
        }

        (Step::LanguageSelect, Event::Back) => {
            state.step = Step::Start;
            Transition::stay(state)
        }
        (Step::LanguageSelect, Event::ToggleLanguage(language)) => {
            state.selection.toggle_language(language);
            Transition::stay(state)
        }
        (Step::LanguageSelect, Event::ConfirmLanguages) if state.selection.has_languages() => {
            state.step = Step::LevelSelect;
            Transition::stay(state)
        }

        (Step::LevelSelect, Event::Back) => {
            state.step = Step::LanguageSelect;
            Transition::stay(state)
        }
        (Step::LevelSelect, Event::SelectLevel(level)) => {
            state.selection.set_level(level);
            state.step = Step::UnitSelect;
            Transition::stay(state)
        }

        (Step::UnitSelect, Event::Back) => {
            state.step = Step::LevelSelect;
            Transition::stay(state)
        }
        (Step::UnitSelect, Event::SelectUnit(unit)) => {
            state.selection.set_unit(unit);
            Transition::stay(state)
        }
        (Step::UnitSelect, Event::StartQuiz) => match state.selection.to_selection() {
            Some(selection) => start_loading(state, selection),
            None => Transition::stay(state),
        },

        (Step::Loading, Event::QuestionsLoaded { token, result }) => {
            finish_loading(state, token, result)
        }

        (Step::Quiz, Event::Answer(index)) => answer(state, index),
        (Step::Quiz, Event::Pronounce(index)) => pronounce(state, index),
        (Step::Quiz, Event::Advance) => advance(state),

        (step, Event::Home) if step != Step::Start => {
            if let Some(token) = state.pending.take() {
                info!(?token, "Abandoning in-flight question request");
            }
            state.step = Step::Start;
            state.session = None;
            state.error = None;
            Transition::stay(state)
        }

        (step, event) => {
            debug!(?step, ?event, "Ignoring event not valid in the current step");
            Transition::stay(state)
        }
    }
}

fn start_loading(mut state: QuizState, selection: Selection) -> Transition {
    let token = RequestToken(state.next_token);
    state.next_token += 1;
    state.pending = Some(token);
    state.error = None;
    state.session = None;
    state.step = Step::Loading;
    info!(?token, level = %selection.level, unit = %selection.unit, "Starting quiz");
    Transition::with(state, vec![Command::GenerateQuestions { token, selection }])
}

fn finish_loading(
    mut state: QuizState,
    token: RequestToken,
    result: Result<Vec<Question>, GenerationError>,
) -> Transition {
    if state.pending != Some(token) {
        debug!(?token, "Discarding response to a superseded request");
        return Transition::stay(state);
    }
    state.pending = None;

    let questions = match result {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => {
            error!("Question generation returned an empty set");
            return fail_loading(state);
        }
        Err(e) => {
            error!(error = %e, "Question generation failed");
            return fail_loading(state);
        }
    };

    // A complete draft is what allowed the request in the first place.
    let Some(selection) = state.selection.to_selection() else {
        return fail_loading(state);
    };
    info!(count = questions.len(), "Quiz loaded");
    state.session = Some(QuizSession::new(selection, questions));
    state.step = Step::Quiz;
    Transition::stay(state)
}

fn fail_loading(mut state: QuizState) -> Transition {
    state.error = Some(GENERATION_FAILED_MESSAGE.to_string());
    state.step = Step::UnitSelect;
    Transition::stay(state)
}

fn answer(mut state: QuizState, index: usize) -> Transition {
    let Some(session) = state.session.as_mut() else {
        return Transition::stay(state);
    };
    if session.selected_answer.is_some() {
        debug!(index, "Question already answered, ignoring");
        return Transition::stay(state);
    }
    let Some(question) = session.questions.get(session.current_index) else {
        return Transition::stay(state);
    };
    if question.option(index).is_none() {
        debug!(index, "Answer index out of range, ignoring");
        return Transition::stay(state);
    }

    let correct = question.is_correct(index);
    let primary = session.selection.primary_language();
    let speak = Command::Speak(Utterance::new(
        question.correct_option().text.clone(),
        primary.name(),
    ));

    session.selected_answer = Some(index);
    let pattern = if correct {
        session.score += 1;
        HapticPattern::Correct
    } else {
        HapticPattern::Incorrect
    };
    debug!(
        question = session.current_index,
        index,
        correct,
        score = session.score,
        "Answer recorded"
    );

    Transition::with(state, vec![speak, Command::Haptic(pattern)])
}

fn pronounce(state: QuizState, index: usize) -> Transition {
    let command = state.session.as_ref().and_then(|session| {
        let option = session.current_question()?.option(index)?;
        Some(Command::Speak(Utterance::new(
            option.text.clone(),
            session.selection.primary_language().name(),
        )))
    });
    match command {
        Some(command) => Transition::with(state, vec![command]),
        None => Transition::stay(state),
    }
}

fn advance(mut state: QuizState) -> Transition {
    let Some(session) = state.session.as_mut() else {
        return Transition::stay(state);
    };
    if session.selected_answer.is_none() {
        debug!("Cannot advance before answering");
        return Transition::stay(state);
    }

    session.selected_answer = None;
    if !session.is_last_question() {
        session.current_index += 1;
        return Transition::stay(state);
    }

    let outcome = session.outcome();
    info!(score = outcome.score, total = outcome.total, "Quiz completed");
    state.step = Step::Results;
    Transition::with(state, vec![Command::RecordResult(outcome)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::QuizOption;

    fn question(correct: i64) -> Question {
        let options = ["Book / Kniga", "Pen / Ruchka", "Door / Dver", "Cat / Koshka"]
            .iter()
            .map(|t| QuizOption::new(*t, "English"))
            .collect();
        Question::new("Kitob", options, correct, "Kitob = Book").unwrap()
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n).map(|i| question((i % 4) as i64)).collect()
    }

    /// Feeds events through the reducer, collecting every command emitted.
    fn run(state: QuizState, events: impl IntoIterator<Item = Event>) -> (QuizState, Vec<Command>) {
        let mut state = state;
        let mut commands = Vec::new();
        for event in events {
            let t = reduce(state, event);
            state = t.state;
            commands.extend(t.commands);
        }
        (state, commands)
    }

    fn at_unit_select() -> QuizState {
        let (state, _) = run(
            QuizState::new(),
            [
                Event::Begin,
                Event::ToggleLanguage(Language::English),
                Event::ToggleLanguage(Language::Russian),
                Event::ConfirmLanguages,
                Event::SelectLevel(Level::A1),
                Event::SelectUnit(Unit::new(3).unwrap()),
            ],
        );
        assert_eq!(state.step(), Step::UnitSelect);
        state
    }

    fn loading() -> (QuizState, RequestToken) {
        let t = reduce(at_unit_select(), Event::StartQuiz);
        assert_eq!(t.state.step(), Step::Loading);
        let token = match t.commands.as_slice() {
            [Command::GenerateQuestions { token, selection }] => {
                assert_eq!(selection.languages, vec![Language::English, Language::Russian]);
                *token
            }
            other => panic!("expected a generation request, got {other:?}"),
        };
        (t.state, token)
    }

    fn in_quiz(n: usize) -> QuizState {
        let (state, token) = loading();
        let t = reduce(
            state,
            Event::QuestionsLoaded {
                token,
                result: Ok(questions(n)),
            },
        );
        assert_eq!(t.state.step(), Step::Quiz);
        t.state
    }

    fn session(state: &QuizState) -> &QuizSession {
        state.session().expect("session should be active")
    }

    #[test]
    fn test_begin_and_back() {
        let (state, _) = run(QuizState::new(), [Event::Begin]);
        assert_eq!(state.step(), Step::LanguageSelect);
        let (state, _) = run(state, [Event::Back]);
        assert_eq!(state.step(), Step::Start);
    }

    #[test]
    fn test_confirm_languages_requires_a_language() {
        let (state, _) = run(QuizState::new(), [Event::Begin, Event::ConfirmLanguages]);
        assert_eq!(state.step(), Step::LanguageSelect);

        let (state, _) = run(
            state,
            [
                Event::ToggleLanguage(Language::German),
                Event::ToggleLanguage(Language::German),
                Event::ConfirmLanguages,
            ],
        );
        assert_eq!(state.step(), Step::LanguageSelect);

        let (state, _) = run(
            state,
            [Event::ToggleLanguage(Language::German), Event::ConfirmLanguages],
        );
        assert_eq!(state.step(), Step::LevelSelect);
    }

    #[test]
    fn test_start_quiz_requires_unit() {
        let (state, commands) = run(
            QuizState::new(),
            [
                Event::Begin,
                Event::ToggleLanguage(Language::Turkish),
                Event::ConfirmLanguages,
                Event::SelectLevel(Level::B1),
                Event::StartQuiz,
            ],
        );
        assert_eq!(state.step(), Step::UnitSelect);
        assert!(commands.is_empty());
        assert_eq!(state.selection().level(), Some(Level::B1));
    }

    #[test]
    fn test_reselecting_unit_stays_in_unit_select() {
        let (state, _) = run(
            at_unit_select(),
            [
                Event::SelectUnit(Unit::new(5).unwrap()),
                Event::SelectUnit(Unit::new(7).unwrap()),
            ],
        );
        assert_eq!(state.step(), Step::UnitSelect);
        assert_eq!(state.selection().unit(), Unit::new(7));
    }

    #[test]
    fn test_loaded_questions_start_the_quiz() {
        let state = in_quiz(5);
        let s = session(&state);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.score(), 0);
        assert_eq!(s.selected_answer(), None);
        assert_eq!(s.total(), 5);
        assert_eq!(state.pending_request(), None);
    }

    #[test]
    fn test_empty_generation_returns_to_unit_select() {
        let (state, token) = loading();
        let before = state.selection().clone();
        let t = reduce(
            state,
            Event::QuestionsLoaded {
                token,
                result: Ok(vec![]),
            },
        );
        assert_eq!(t.state.step(), Step::UnitSelect);
        assert_eq!(t.state.error(), Some(GENERATION_FAILED_MESSAGE));
        assert_eq!(t.state.selection(), &before);
        assert!(t.state.session().is_none());
        assert!(t.commands.is_empty());
    }

    #[test]
    fn test_generation_error_allows_retry() {
        let (state, token) = loading();
        let t = reduce(
            state,
            Event::QuestionsLoaded {
                token,
                result: Err(GenerationError::EmptyResponse),
            },
        );
        assert_eq!(t.state.step(), Step::UnitSelect);
        assert!(t.state.error().is_some());

        // Retrying clears the error and issues a fresh request.
        let t = reduce(t.state, Event::StartQuiz);
        assert_eq!(t.state.step(), Step::Loading);
        assert!(t.state.error().is_none());
        match t.commands.as_slice() {
            [Command::GenerateQuestions { token: retry, .. }] => assert_ne!(*retry, token),
            other => panic!("expected a generation request, got {other:?}"),
        }
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let (state, stale) = loading();
        let (state, _) = run(state, [Event::Home]);
        assert_eq!(state.step(), Step::Start);
        assert_eq!(state.pending_request(), None);

        // The abandoned request resolves late: nothing changes.
        let (state, _) = run(
            state,
            [Event::QuestionsLoaded {
                token: stale,
                result: Ok(questions(3)),
            }],
        );
        assert_eq!(state.step(), Step::Start);
        assert!(state.session().is_none());

        // Even after starting over, the old token stays stale.
        let (state, _) = run(
            state,
            [Event::Begin, Event::ConfirmLanguages, Event::SelectLevel(Level::A1)],
        );
        let t = reduce(state, Event::StartQuiz);
        let (state, _) = run(
            t.state,
            [Event::QuestionsLoaded {
                token: stale,
                result: Ok(questions(3)),
            }],
        );
        assert_eq!(state.step(), Step::Loading);
    }

    #[test]
    fn test_loading_ignores_user_events_other_than_home() {
        let (state, _) = loading();
        let (state, commands) = run(
            state,
            [Event::Back, Event::Answer(0), Event::Advance, Event::StartQuiz],
        );
        assert_eq!(state.step(), Step::Loading);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_correct_answer_scores_speaks_and_pulses() {
        let t = reduce(in_quiz(3), Event::Answer(0));
        let s = session(&t.state);
        assert_eq!(s.score(), 1);
        assert_eq!(s.selected_answer(), Some(0));
        assert_eq!(
            t.commands,
            vec![
                Command::Speak(Utterance::new("Book / Kniga", "English")),
                Command::Haptic(HapticPattern::Correct),
            ]
        );
    }

    #[test]
    fn test_wrong_answer_still_speaks_correct_option() {
        let t = reduce(in_quiz(3), Event::Answer(2));
        assert_eq!(session(&t.state).score(), 0);
        assert_eq!(
            t.commands,
            vec![
                Command::Speak(Utterance::new("Book / Kniga", "English")),
                Command::Haptic(HapticPattern::Incorrect),
            ]
        );
    }

    #[test]
    fn test_first_answer_is_final() {
        let (state, commands) = run(in_quiz(3), [Event::Answer(1), Event::Answer(0)]);
        let s = session(&state);
        assert_eq!(s.score(), 0);
        assert_eq!(s.selected_answer(), Some(1));
        assert_eq!(s.current_index(), 0);
        // Only the first answer produced side effects.
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_out_of_range_answer_is_ignored() {
        let t = reduce(in_quiz(3), Event::Answer(4));
        assert_eq!(session(&t.state).selected_answer(), None);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn test_advance_requires_answer() {
        let (state, commands) = run(in_quiz(3), [Event::Advance]);
        assert_eq!(session(&state).current_index(), 0);
        assert!(commands.is_empty());

        let (state, _) = run(state, [Event::Answer(0), Event::Advance]);
        let s = session(&state);
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.selected_answer(), None);
    }

    #[test]
    fn test_pronounce_option_does_not_answer() {
        let t = reduce(in_quiz(2), Event::Pronounce(3));
        assert_eq!(
            t.commands,
            vec![Command::Speak(Utterance::new("Cat / Koshka", "English"))]
        );
        assert_eq!(session(&t.state).selected_answer(), None);
        assert!(reduce(t.state, Event::Pronounce(9)).commands.is_empty());
    }

    #[test]
    fn test_score_matches_correct_answers() {
        let mut state = in_quiz(8);
        let mut expected = 0;
        for i in 0..8 {
            // Alternate right and wrong answers.
            let pick = if i % 2 == 0 { i % 4 } else { (i + 1) % 4 };
            if pick == i % 4 {
                expected += 1;
            }
            state = reduce(state, Event::Answer(pick)).state;
            let s = session(&state);
            assert_eq!(s.score(), expected);
            assert!(s.score() as usize <= s.current_index() + 1);
            state = reduce(state, Event::Advance).state;
        }
        assert_eq!(state.step(), Step::Results);
        assert_eq!(session(&state).score(), 4);
    }

    #[test]
    fn test_all_correct_records_full_score() {
        let mut state = in_quiz(30);
        let mut recorded = Vec::new();
        for i in 0..30 {
            state = reduce(state, Event::Answer(i % 4)).state;
            let t = reduce(state, Event::Advance);
            state = t.state;
            recorded.extend(t.commands);
        }

        assert_eq!(state.step(), Step::Results);
        match recorded.as_slice() {
            [Command::RecordResult(outcome)] => {
                assert_eq!(outcome.selection.level, Level::A1);
                assert_eq!(outcome.selection.unit.number(), 3);
                assert_eq!(
                    outcome.selection.languages,
                    vec![Language::English, Language::Russian]
                );
                assert_eq!(outcome.score, 30);
                assert_eq!(outcome.total, 30);
            }
            other => panic!("expected exactly one result record, got {other:?}"),
        }
    }

    #[test]
    fn test_home_discards_session_but_keeps_selection() {
        let (state, _) = run(in_quiz(3), [Event::Answer(0), Event::Home]);
        assert_eq!(state.step(), Step::Start);
        assert!(state.session().is_none());
        assert_eq!(
            state.selection().languages(),
            &[Language::English, Language::Russian]
        );
        assert_eq!(state.selection().unit(), Unit::new(3));
    }

    #[test]
    fn test_home_is_ignored_on_start() {
        let t = reduce(QuizState::new(), Event::Home);
        assert_eq!(t.state.step(), Step::Start);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn test_results_ignore_quiz_events() {
        let (state, _) = run(in_quiz(1), [Event::Answer(0), Event::Advance]);
        assert_eq!(state.step(), Step::Results);
        let (state, commands) = run(state, [Event::Answer(1), Event::Advance]);
        assert_eq!(state.step(), Step::Results);
        assert!(commands.is_empty());
        let (state, _) = run(state, [Event::Home]);
        assert_eq!(state.step(), Step::Start);
    }

    #[test]
    fn test_clear_history_needs_confirmation() {
        let (state, commands) = run(QuizState::new(), [Event::ConfirmClearHistory]);
        assert!(commands.is_empty());

        let (state, commands) = run(state, [Event::RequestClearHistory]);
        assert!(state.is_confirming_clear());
        assert!(commands.is_empty());

        let (state, commands) = run(state, [Event::CancelClearHistory, Event::ConfirmClearHistory]);
        assert!(!state.is_confirming_clear());
        assert!(commands.is_empty());

        let (state, commands) = run(
            state,
            [Event::RequestClearHistory, Event::ConfirmClearHistory],
        );
        assert!(!state.is_confirming_clear());
        assert_eq!(commands, vec![Command::ClearHistory]);
    }

    #[test]
    fn test_leaving_start_disarms_clear_request() {
        let (state, _) = run(
            QuizState::new(),
            [Event::RequestClearHistory, Event::Begin, Event::Back],
        );
        assert!(!state.is_confirming_clear());
        let (_, commands) = run(state, [Event::ConfirmClearHistory]);
        assert!(commands.is_empty());
    }
}
