//! Quiz Runtime
//!
//! Owns the current [`QuizState`] and carries out the [`Command`]s the reducer
//! emits against the injected ports. The question request is the only
//! asynchronous step; it is handed back to the caller as a
//! [`PendingGeneration`] so a front end can keep accepting input (such as
//! "home") while it runs.

use crate::Command;
use crate::generator::QuestionGenerator;
use crate::history::{HistoryEntry, HistoryStore};
use crate::quiz::{Event, QuizState, RequestToken, reduce};
use crate::selection::Selection;
use crate::speech::{Haptics, Pronouncer};
use std::sync::Arc;
use tracing::{info, warn};

/// A question request waiting to be run.
///
/// The future returned by [`PendingGeneration::run`] owns everything it needs,
/// so it can be awaited inline, raced against user input or spawned.
pub struct PendingGeneration {
    token: RequestToken,
    selection: Selection,
    generator: Arc<dyn QuestionGenerator>,
}

impl PendingGeneration {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Runs the request and returns the event to dispatch with its result.
    pub async fn run(self) -> Event {
        let result = self.generator.generate_questions(self.selection).await;
        Event::QuestionsLoaded {
            token: self.token,
            result,
        }
    }
}

pub struct QuizRuntime {
    state: QuizState,
    generator: Arc<dyn QuestionGenerator>,
    pronouncer: Arc<dyn Pronouncer>,
    haptics: Arc<dyn Haptics>,
    history: Arc<dyn HistoryStore>,
}

impl QuizRuntime {
    pub fn new(
        generator: Arc<dyn QuestionGenerator>,
        pronouncer: Arc<dyn Pronouncer>,
        haptics: Arc<dyn Haptics>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            state: QuizState::new(),
            generator,
            pronouncer,
            haptics,
            history,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    /// The stored history, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.load()
    }

    /// Applies one event and executes the resulting side effects.
    ///
    /// Returns the question request to run when the event started loading.
    pub fn dispatch(&mut self, event: Event) -> Option<PendingGeneration> {
        let transition = reduce(std::mem::take(&mut self.state), event);
        self.state = transition.state;

        let mut pending = None;
        for command in transition.commands {
            match command {
                Command::GenerateQuestions { token, selection } => {
                    pending = Some(PendingGeneration {
                        token,
                        selection,
                        generator: self.generator.clone(),
                    });
                }
                Command::Speak(utterance) => self.pronouncer.speak(&utterance),
                Command::Haptic(pattern) => self.haptics.vibrate(pattern),
                Command::RecordResult(outcome) => {
                    let entry = HistoryEntry::from_outcome(outcome);
                    info!(id = %entry.id, score = entry.score, total = entry.total, "Recording quiz result");
                    if let Err(e) = self.history.append(entry) {
                        warn!(error = %e, "Failed to save quiz result");
                    }
                }
                Command::ClearHistory => {
                    if let Err(e) = self.history.clear() {
                        warn!(error = %e, "Failed to clear history");
                    }
                }
            }
        }
        pending
    }

    /// Like [`dispatch`](Self::dispatch), but awaits a started question
    /// request and dispatches its result before returning.
    pub async fn dispatch_and_wait(&mut self, event: Event) {
        if let Some(pending) = self.dispatch(event) {
            let loaded = pending.run().await;
            self.dispatch(loaded);
        }
    }
}
