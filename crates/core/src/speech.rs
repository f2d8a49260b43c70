//! Pronunciation and haptic feedback ports.
//!
//! Both are fire-and-forget: implementations must swallow their own failures
//! so a device without speech or vibration support never disturbs the quiz.

use crate::language::locale_for;

/// Playback rate relative to the voice's natural speed. Slightly slower than
/// normal so learners can follow.
pub const SPEECH_RATE: f32 = 0.85;

/// A single request to say something out loud.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// BCP 47 locale of the voice, e.g. `tr-TR`.
    pub locale: &'static str,
    pub rate: f32,
}

impl Utterance {
    /// Builds an utterance for `text`, resolving `language` to a voice locale.
    /// Unknown language identifiers use the fallback locale.
    pub fn new(text: impl Into<String>, language: &str) -> Self {
        Self {
            text: text.into(),
            locale: locale_for(language),
            rate: SPEECH_RATE,
        }
    }
}

/// Text-to-speech capability.
///
/// At most one utterance is audible at a time: a new call cancels whatever
/// is still queued or playing.
#[cfg_attr(test, mockall::automock)]
pub trait Pronouncer: Send + Sync {
    fn speak(&self, utterance: &Utterance);
}

/// A `Pronouncer` for environments without audio.
pub struct SilentPronouncer;

impl Pronouncer for SilentPronouncer {
    fn speak(&self, utterance: &Utterance) {
        tracing::trace!(text = %utterance.text, "Speech disabled, skipping utterance");
    }
}

/// Feedback pattern played after an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPattern {
    /// One short pulse.
    Correct,
    /// Two pulses separated by a pause.
    Incorrect,
}

impl HapticPattern {
    /// Alternating on/off durations in milliseconds, starting with "on".
    pub fn durations_ms(self) -> &'static [u64] {
        match self {
            HapticPattern::Correct => &[50],
            HapticPattern::Incorrect => &[100, 50, 100],
        }
    }

    pub fn pulses(self) -> usize {
        self.durations_ms().len().div_ceil(2)
    }
}

/// Vibration (or equivalent) capability.
#[cfg_attr(test, mockall::automock)]
pub trait Haptics: Send + Sync {
    fn vibrate(&self, pattern: HapticPattern);
}

/// A `Haptics` implementation that does nothing.
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&self, _pattern: HapticPattern) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_resolves_locale_and_rate() {
        let u = Utterance::new("Kitap", "Turkish");
        assert_eq!(u.locale, "tr-TR");
        assert_eq!(u.rate, SPEECH_RATE);

        let u = Utterance::new("Book", "english");
        assert_eq!(u.locale, "en-US");

        let u = Utterance::new("Kitob", "Uzbek");
        assert_eq!(u.locale, crate::language::FALLBACK_LOCALE);
    }

    #[test]
    fn test_haptic_patterns() {
        assert_eq!(HapticPattern::Correct.durations_ms(), &[50]);
        assert_eq!(HapticPattern::Correct.pulses(), 1);
        assert_eq!(HapticPattern::Incorrect.durations_ms(), &[100, 50, 100]);
        assert_eq!(HapticPattern::Incorrect.pulses(), 2);
    }
}
