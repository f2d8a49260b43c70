pub mod generator;
pub mod history;
pub mod language;
pub mod question;
pub mod quiz;
pub mod runtime;
pub mod selection;
pub mod speech;

use quiz::{QuizOutcome, RequestToken};
use selection::Selection;
use speech::{HapticPattern, Utterance};

/// Represents commands that the quiz reducer issues to an external runtime.
///
/// The reducer never touches a device or the network itself. Every side
/// effect it wants performed is described here and carried out by
/// [`runtime::QuizRuntime`] (or by a test that inspects the list).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the question generator for a fresh question set.
    GenerateQuestions {
        token: RequestToken,
        selection: Selection,
    },
    /// Pronounce the given utterance, replacing whatever is playing.
    Speak(Utterance),
    /// Emit a best-effort haptic pulse.
    Haptic(HapticPattern),
    /// Persist the outcome of a finished quiz to the history.
    RecordResult(QuizOutcome),
    /// Erase the stored history. Only emitted after explicit confirmation.
    ClearHistory,
}
