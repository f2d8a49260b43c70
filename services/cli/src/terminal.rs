//! Line-oriented terminal front end.
//!
//! [`render`] turns the current [`QuizState`] into a screen of text and
//! [`parse_input`] turns one line typed by the learner into an [`Event`]. Both
//! are pure so the whole interaction can be tested without a terminal.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use poliglot_core::history::HistoryEntry;
use poliglot_core::language::{Language, Level, Unit};
use poliglot_core::question::Question;
use poliglot_core::quiz::{Event, QuizSession, QuizState, Step};
use std::fmt::Write;

const RULE: &str = "----------------------------------------";

/// Whether the line asks to leave the program.
pub fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "quit" | "exit" | "q")
}

/// Resolves a typed language name, tolerating typos and abbreviations.
pub fn match_language(input: &str) -> Option<Language> {
    let wanted = input.trim();
    if wanted.is_empty() {
        return None;
    }
    if let Ok(language) = wanted.parse::<Language>() {
        return Some(language);
    }

    let matcher = SkimMatcherV2::default();
    Language::ALL
        .into_iter()
        .filter_map(|l| matcher.fuzzy_match(l.name(), wanted).map(|score| (l, score)))
        .max_by_key(|(_, score)| *score)
        .map(|(language, _)| language)
}

/// Parses a 1-based menu choice into a 0-based index below `len`.
fn menu_index(input: &str, len: usize) -> Option<usize> {
    let n = input.parse::<usize>().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Interprets one input line for the current step.
///
/// Returns `None` when the line means nothing on this screen.
pub fn parse_input(state: &QuizState, line: &str) -> Option<Event> {
    let input = line.trim().to_lowercase();
    let step = state.step();

    if step != Step::Start && matches!(input.as_str(), "home" | "h") {
        return Some(Event::Home);
    }

    match step {
        Step::Start if state.is_confirming_clear() => match input.as_str() {
            "yes" | "y" => Some(Event::ConfirmClearHistory),
            "no" | "n" => Some(Event::CancelClearHistory),
            _ => None,
        },
        Step::Start => match input.as_str() {
            "" | "begin" | "start" => Some(Event::Begin),
            "clear" => Some(Event::RequestClearHistory),
            _ => None,
        },
        Step::LanguageSelect => match input.as_str() {
            "" => None,
            "back" | "b" => Some(Event::Back),
            "ok" | "done" | "next" => Some(Event::ConfirmLanguages),
            other => menu_index(other, Language::ALL.len())
                .map(|i| Language::ALL[i])
                .or_else(|| match_language(other))
                .map(Event::ToggleLanguage),
        },
        Step::LevelSelect => match input.as_str() {
            "back" | "b" => Some(Event::Back),
            other => menu_index(other, Level::ALL.len())
                .map(|i| Level::ALL[i])
                .or_else(|| other.parse::<Level>().ok())
                .map(Event::SelectLevel),
        },
        Step::UnitSelect => match input.as_str() {
            "back" | "b" => Some(Event::Back),
            "start" | "go" => Some(Event::StartQuiz),
            other => other.parse::<Unit>().ok().map(Event::SelectUnit),
        },
        Step::Loading => None,
        Step::Quiz => {
            if matches!(input.as_str(), "next" | "n" | "") {
                return Some(Event::Advance);
            }
            if let Some(rest) = input
                .strip_prefix("say ")
                .or_else(|| input.strip_prefix("s "))
            {
                return menu_index(rest.trim(), poliglot_core::question::OPTIONS_PER_QUESTION)
                    .map(Event::Pronounce);
            }
            menu_index(&input, poliglot_core::question::OPTIONS_PER_QUESTION).map(Event::Answer)
        }
        Step::Results => None,
    }
}

/// Renders the screen for the current step.
pub fn render(state: &QuizState, history: &[HistoryEntry]) -> String {
    let mut out = String::new();
    let _ = match state.step() {
        Step::Start => render_start(&mut out, state, history),
        Step::LanguageSelect => render_languages(&mut out, state),
        Step::LevelSelect => render_levels(&mut out, state),
        Step::UnitSelect => render_units(&mut out, state),
        Step::Loading => writeln!(
            out,
            "Generating questions, this can take a moment...\n('home' to cancel)"
        ),
        Step::Quiz => match state.session() {
            Some(session) => render_question(&mut out, session),
            None => Ok(()),
        },
        Step::Results => match state.session() {
            Some(session) => render_results(&mut out, session),
            None => Ok(()),
        },
    };
    out
}

/// Renders the stored history as a table, newest first.
pub fn render_history(history: &[HistoryEntry]) -> String {
    let mut out = String::new();
    let _ = write_history(&mut out, history);
    out
}

fn write_history(out: &mut String, history: &[HistoryEntry]) -> std::fmt::Result {
    if history.is_empty() {
        return writeln!(out, "No quizzes taken yet.");
    }
    for entry in history {
        let languages = entry
            .selection
            .languages
            .iter()
            .map(|l| l.name())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "{}  {} unit {:<2}  {:>2}/{:<2}  {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.selection.level,
            entry.selection.unit,
            entry.score,
            entry.total,
            languages
        )?;
    }
    Ok(())
}

fn render_start(out: &mut String, state: &QuizState, history: &[HistoryEntry]) -> std::fmt::Result {
    writeln!(out, "POLIGLOT")?;
    writeln!(out, "Uzbek vocabulary quizzes for your course book")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "History")?;
    write_history(out, history)?;
    writeln!(out, "{RULE}")?;
    if state.is_confirming_clear() {
        writeln!(out, "Delete all quiz history? (yes/no)")
    } else {
        writeln!(out, "'begin' to start, 'clear' to delete history, 'quit' to exit")
    }
}

fn render_languages(out: &mut String, state: &QuizState) -> std::fmt::Result {
    let draft = state.selection();
    writeln!(out, "Which languages should the answers use?")?;
    for (i, language) in Language::ALL.into_iter().enumerate() {
        let mark = if draft.contains(language) { 'x' } else { ' ' };
        writeln!(out, "  {:>2}. [{mark}] {}", i + 1, language.name())?;
    }
    if draft.has_languages() {
        writeln!(out, "Toggle by number or name, 'ok' to continue, 'back' to return")
    } else {
        writeln!(out, "Pick at least one language by number or name, 'back' to return")
    }
}

fn render_levels(out: &mut String, state: &QuizState) -> std::fmt::Result {
    writeln!(out, "Choose your level")?;
    for (i, level) in Level::ALL.into_iter().enumerate() {
        let mark = if state.selection().level() == Some(level) { '>' } else { ' ' };
        writeln!(out, " {mark}{}. {level}", i + 1)?;
    }
    writeln!(out, "Type a number or level name, 'back' to return")
}

fn render_units(out: &mut String, state: &QuizState) -> std::fmt::Result {
    let draft = state.selection();
    if let Some(level) = draft.level() {
        writeln!(out, "Level {level}: choose a unit")?;
    }
    let units = Unit::all()
        .map(|unit| {
            if draft.unit() == Some(unit) {
                format!("[{unit}]")
            } else {
                format!(" {unit} ")
            }
        })
        .collect::<String>();
    writeln!(out, "{units}")?;
    if let Some(error) = state.error() {
        writeln!(out, "! {error}")?;
    }
    match draft.unit() {
        Some(unit) => writeln!(out, "Unit {unit} selected: 'start' to begin, 'back' to return"),
        None => writeln!(out, "Type a unit number, 'back' to return"),
    }
}

fn language_pair(question: &Question) -> Option<String> {
    match (question.source_language(), question.target_language()) {
        (Some(source), Some(target)) => Some(format!("{source} -> {target}")),
        (Some(source), None) => Some(source.to_string()),
        _ => None,
    }
}

fn render_question(out: &mut String, session: &QuizSession) -> std::fmt::Result {
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    writeln!(
        out,
        "Question {}/{}    Score: {}",
        session.current_index() + 1,
        session.total(),
        session.score()
    )?;
    writeln!(out, "{RULE}")?;
    match language_pair(question) {
        Some(pair) => writeln!(out, "{}    ({pair})", question.word())?,
        None => writeln!(out, "{}", question.word())?,
    }
    writeln!(out)?;

    let selected = session.selected_answer();
    for (i, option) in question.options().iter().enumerate() {
        let mark = match selected {
            Some(_) if question.is_correct(i) => "+",
            Some(answer) if answer == i => "x",
            _ => " ",
        };
        writeln!(out, " {mark} {}. {}", i + 1, option.text)?;
    }
    writeln!(out)?;

    match selected {
        None => writeln!(out, "Answer with 1-4, 'say N' to hear an option, 'home' to quit"),
        Some(answer) => {
            let verdict = if question.is_correct(answer) {
                "Correct!"
            } else {
                "Not quite."
            };
            writeln!(out, "{verdict} {}", question.explanation())?;
            if session.is_last_question() {
                writeln!(out, "'next' to see your results")
            } else {
                writeln!(out, "'next' for the next question")
            }
        }
    }
}

fn render_results(out: &mut String, session: &QuizSession) -> std::fmt::Result {
    let total = session.total();
    let percent = if total == 0 {
        0
    } else {
        session.score() as usize * 100 / total
    };
    writeln!(out, "Quiz complete!")?;
    writeln!(out, "Score: {}/{} ({percent}%)", session.score(), total)?;
    writeln!(out, "'home' to return to the start screen")
}
