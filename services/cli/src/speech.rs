//! Terminal adapters for the pronunciation and haptics ports.

use poliglot_core::speech::{HapticPattern, Haptics, Pronouncer, Utterance};
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// espeak's default speaking rate in words per minute.
const DEFAULT_WORDS_PER_MINUTE: f32 = 175.0;

/// Maps a BCP 47 locale to an espeak-ng voice name.
pub fn espeak_voice(locale: &str) -> String {
    let lower = locale.to_ascii_lowercase();
    let language = lower.split('-').next().unwrap_or_default();
    match language {
        // espeak-ng distinguishes the English variants; the rest use the
        // bare language code.
        "en" => lower,
        "zh" => "cmn".to_string(),
        other => other.to_string(),
    }
}

/// Speaks through an external espeak-compatible program (`espeak-ng` by
/// default), one child process per utterance.
///
/// Starting a new utterance kills the previous process, so only the latest
/// request is ever audible. Any failure to start the program is logged and
/// otherwise ignored.
pub struct CommandPronouncer {
    program: String,
    current: Mutex<Option<Child>>,
}

impl CommandPronouncer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            current: Mutex::new(None),
        }
    }

    fn args(utterance: &Utterance) -> Vec<String> {
        let words_per_minute = (DEFAULT_WORDS_PER_MINUTE * utterance.rate).round() as u32;
        vec![
            "-v".to_string(),
            espeak_voice(utterance.locale),
            "-s".to_string(),
            words_per_minute.to_string(),
            utterance.text.clone(),
        ]
    }

    fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Pronouncer for CommandPronouncer {
    fn speak(&self, utterance: &Utterance) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut previous) = current.take() {
            // Fails harmlessly if it already finished.
            let _ = previous.kill();
            let _ = previous.wait();
        }

        match Command::new(&self.program)
            .args(Self::args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => *current = Some(child),
            Err(e) => {
                debug!(program = %self.program, error = %e, "Speech unavailable, skipping utterance");
            }
        }
    }
}

/// Stands in for vibration by ringing the terminal bell once per pulse.
pub struct TerminalHaptics;

impl Haptics for TerminalHaptics {
    fn vibrate(&self, pattern: HapticPattern) {
        let bells = "\x07".repeat(pattern.pulses());
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr
            .write_all(bells.as_bytes())
            .and_then(|_| stderr.flush())
        {
            debug!(error = %e, "Terminal bell unavailable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_espeak_voice_names() {
        assert_eq!(espeak_voice("en-US"), "en-us");
        assert_eq!(espeak_voice("tr-TR"), "tr");
        assert_eq!(espeak_voice("ru-RU"), "ru");
        assert_eq!(espeak_voice("zh-CN"), "cmn");
        assert_eq!(espeak_voice("ja-JP"), "ja");
    }

    #[test]
    fn test_args_use_slower_rate() {
        let args = CommandPronouncer::args(&Utterance::new("Kitap", "Turkish"));
        assert_eq!(args, vec!["-v", "tr", "-s", "149", "Kitap"]);
    }

    #[test]
    fn test_missing_program_is_ignored() {
        let pronouncer = CommandPronouncer::new("definitely-not-a-speech-program-xyz");
        pronouncer.speak(&Utterance::new("Book", "English"));
        assert!(!pronouncer.is_speaking());
    }

    #[cfg(unix)]
    #[test]
    fn test_new_utterance_replaces_previous() {
        // `sleep` rejects espeak's flags and exits, which is enough to check
        // that each call reaps the previous child and tracks the new one.
        let pronouncer = CommandPronouncer::new("sleep");
        pronouncer.speak(&Utterance::new("one", "English"));
        assert!(pronouncer.is_speaking());
        pronouncer.speak(&Utterance::new("two", "English"));
        assert!(pronouncer.is_speaking());
    }

    #[test]
    fn test_terminal_haptics_never_panics() {
        TerminalHaptics.vibrate(HapticPattern::Correct);
        TerminalHaptics.vibrate(HapticPattern::Incorrect);
    }
}
