//! The narration contract the rehearsal engine drives.
//!
//! A narrator speaks counterpart lines. It never calls back into the engine
//! directly: completion is reported by whoever owns both, by handing a
//! [`NarrationEvent`] to [`Rehearsal::on_narration`](super::Rehearsal::on_narration).
//! Every utterance carries an [`UtteranceId`] so the engine can tell a current
//! event from one that belongs to an utterance it already stopped.

use crate::Result;
use crate::models::UiSettings;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::mpsc::Sender;

/// Token identifying one `speak` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance-{}", self.0)
    }
}

/// How an utterance ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationOutcome {
    Finished,
    /// Interrupted by the narrator itself, not by the engine
    Cancelled,
    Failed(String),
}

/// Completion report for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationEvent {
    pub utterance: UtteranceId,
    pub outcome: NarrationOutcome,
}

impl NarrationEvent {
    pub fn finished(utterance: UtteranceId) -> Self {
        Self {
            utterance,
            outcome: NarrationOutcome::Finished,
        }
    }

    pub fn cancelled(utterance: UtteranceId) -> Self {
        Self {
            utterance,
            outcome: NarrationOutcome::Cancelled,
        }
    }

    pub fn failed(utterance: UtteranceId, reason: impl Into<String>) -> Self {
        Self {
            utterance,
            outcome: NarrationOutcome::Failed(reason.into()),
        }
    }
}

/// Voice parameters taken from the user's settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Voice {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            rate: 0.5,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl From<&UiSettings> for Voice {
    fn from(settings: &UiSettings) -> Self {
        Self {
            rate: settings.narration_rate,
            pitch: settings.narration_pitch,
            volume: settings.narration_volume,
        }
    }
}

/// Speech output for counterpart lines.
pub trait Narrator {
    /// Apply voice parameters to subsequent utterances.
    fn configure(&mut self, _voice: Voice) {}

    /// Begin speaking `text`. Completion arrives later as a [`NarrationEvent`].
    fn speak(&mut self, utterance: UtteranceId, text: &str) -> Result<()>;

    /// Pause mid-utterance. Returns `false` if this narrator cannot resume
    /// where it left off.
    fn pause(&mut self) -> bool;

    fn resume(&mut self);

    /// Stop an utterance. Any event it still produces is ignored by the engine.
    fn stop(&mut self, utterance: UtteranceId);
}

/// Text narrator for terminals.
///
/// "Speaking" is printing the line, which completes immediately, so the
/// finished event is queued on `events` as soon as the line is written.
pub struct ConsoleNarrator<W: Write> {
    out: W,
    events: Sender<NarrationEvent>,
    voice: Voice,
}

impl<W: Write> ConsoleNarrator<W> {
    pub fn new(out: W, events: Sender<NarrationEvent>) -> Self {
        Self {
            out,
            events,
            voice: Voice::default(),
        }
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Narrator for ConsoleNarrator<W> {
    fn configure(&mut self, voice: Voice) {
        self.voice = voice;
    }

    fn speak(&mut self, utterance: UtteranceId, text: &str) -> Result<()> {
        let written = writeln!(self.out, "  ♪ {}", text).and_then(|_| self.out.flush());
        let event = match written {
            Ok(()) => NarrationEvent::finished(utterance),
            Err(e) => NarrationEvent::failed(utterance, e.to_string()),
        };
        // A dropped receiver means nobody is listening for completion anymore
        let _ = self.events.send(event);
        Ok(())
    }

    fn pause(&mut self) -> bool {
        false
    }

    fn resume(&mut self) {}

    fn stop(&mut self, utterance: UtteranceId) {
        tracing::trace!(%utterance, "stop requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_console_narrator_prints_and_reports() {
        let (tx, rx) = mpsc::channel();
        let mut narrator = ConsoleNarrator::new(Vec::new(), tx);

        narrator.speak(UtteranceId(7), "Thanks for coming!").unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event, NarrationEvent::finished(UtteranceId(7)));
        let printed = String::from_utf8(narrator.out.clone()).unwrap();
        assert!(printed.contains("Thanks for coming!"));
        assert!(!narrator.pause());
    }

    #[test]
    fn test_voice_from_settings() {
        let mut narrator = ConsoleNarrator::new(Vec::new(), mpsc::channel::<NarrationEvent>().0);
        narrator.configure(Voice {
            rate: 0.8,
            pitch: 1.5,
            volume: 0.3,
        });
        assert_eq!(narrator.voice().pitch, 1.5);
    }
}
