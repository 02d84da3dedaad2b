//! # Practice Session Module
//!
//! The controller that ties live pitch samples to tuning feedback and,
//! when a score is loaded, to note-by-note navigation. The session holds
//! the latest detected state as plain values and hands out immutable
//! snapshots; subscribers receive a fresh snapshot after every change.

use crossbeam_channel::Sender;

use crate::navigation::Navigator;
use crate::pitch::PitchSample;
use crate::tuning::{self, TuningReading};

/// Frames with clarity at or below this are treated as noise or silence
/// and discarded without touching session state.
pub const CLARITY_THRESHOLD: f32 = 0.9;

/// Target note used until the caller picks one.
pub const DEFAULT_TARGET: &str = "A4";

/// Immutable view of the session state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub listening: bool,
    /// Last accepted frequency in Hz; 0.0 while stopped.
    pub frequency: f32,
    /// Clarity of the last accepted frame; 0.0 while stopped.
    pub clarity: f32,
    /// Name of the detected note; `None` while nothing usable was heard.
    pub note: Option<String>,
    pub target: String,
    pub cents: f32,
    pub in_tune: bool,
}

/// Live practice session state machine.
pub struct PracticeSession {
    listening: bool,
    frequency: f32,
    clarity: f32,
    note: Option<String>,
    target: String,
    reading: TuningReading,
    navigator: Option<Navigator>,
    subscribers: Vec<Sender<SessionSnapshot>>,
}

impl Default for PracticeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeSession {
    pub fn new() -> Self {
        Self {
            listening: false,
            frequency: 0.0,
            clarity: 0.0,
            note: None,
            target: DEFAULT_TARGET.to_string(),
            reading: TuningReading {
                cents: 0.0,
                in_tune: false,
            },
            navigator: None,
            subscribers: Vec::new(),
        }
    }

    /// Attaches a navigator; detected notes will drive its cursor.
    pub fn attach_navigator(&mut self, navigator: Navigator) {
        self.navigator = Some(navigator);
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        self.navigator.as_ref()
    }

    pub fn navigator_mut(&mut self) -> Option<&mut Navigator> {
        self.navigator.as_mut()
    }

    /// Registers a channel that receives a snapshot after every change.
    ///
    /// Disconnected subscribers are dropped on the next publish.
    pub fn subscribe(&mut self, sender: Sender<SessionSnapshot>) {
        self.subscribers.push(sender);
    }

    /// Begins listening. Calling while already listening changes nothing.
    ///
    /// Returns whether the session transitioned; callers acquire the
    /// audio stream before flipping this switch.
    pub fn start(&mut self) -> bool {
        if self.listening {
            return false;
        }
        self.listening = true;
        self.publish();
        true
    }

    /// Stops listening and clears the detected state. Safe to call when
    /// already stopped.
    pub fn stop(&mut self) {
        if !self.listening {
            return;
        }
        self.listening = false;
        self.frequency = 0.0;
        self.clarity = 0.0;
        self.note = None;
        self.reading = TuningReading {
            cents: 0.0,
            in_tune: false,
        };
        self.publish();
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Feeds one pitch observation into the session.
    ///
    /// Frames below the clarity threshold are discarded with no state
    /// change. Accepted frames update the detected note, re-evaluate
    /// tuning against the target (an unknown target keeps the previous
    /// reading) and forward the note name to the navigator.
    pub fn process_frame(&mut self, sample: PitchSample) {
        if !self.listening || sample.clarity <= CLARITY_THRESHOLD {
            return;
        }
        self.frequency = sample.frequency;
        self.clarity = sample.clarity;
        self.note = tuning::name_frequency(sample.frequency);
        if let Some(reading) = tuning::evaluate_tuning(sample.frequency, &self.target) {
            self.reading = reading;
        }
        if let (Some(note), Some(navigator)) = (self.note.clone(), self.navigator.as_mut()) {
            navigator.check_note(&note);
        }
        self.publish();
    }

    /// Switches the target note.
    ///
    /// When a frequency is currently held the tuning is re-evaluated
    /// immediately instead of waiting for the next frame.
    pub fn set_target_note(&mut self, target: &str) {
        self.target = target.to_string();
        if self.frequency > 0.0 {
            if let Some(reading) = tuning::evaluate_tuning(self.frequency, &self.target) {
                self.reading = reading;
            }
        }
        self.publish();
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Builds an immutable snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            listening: self.listening,
            frequency: self.frequency,
            clarity: self.clarity,
            note: self.note.clone(),
            target: self.target.clone(),
            cents: self.reading.cents,
            in_tune: self.reading.in_tune,
        }
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.try_send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Navigator;
    use crate::notation::parse_notation;
    use crate::storage::MemoryBookmarkStore;

    fn sample(frequency: f32, clarity: f32) -> PitchSample {
        PitchSample { frequency, clarity }
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut session = PracticeSession::new();
        assert!(session.start());
        assert!(!session.start());
        session.stop();
        session.stop();
        assert!(!session.is_listening());
        assert!(session.start());
    }

    #[test]
    fn low_clarity_frames_are_discarded() {
        let mut session = PracticeSession::new();
        session.start();
        // the threshold itself is not enough
        session.process_frame(sample(440.0, 0.9));
        assert_eq!(session.snapshot().note, None);
        session.process_frame(sample(440.0, 0.95));
        assert_eq!(session.snapshot().note.as_deref(), Some("A4"));
    }

    #[test]
    fn frames_are_ignored_while_stopped() {
        let mut session = PracticeSession::new();
        session.process_frame(sample(440.0, 1.0));
        assert_eq!(session.snapshot().note, None);
        assert_eq!(session.snapshot().frequency, 0.0);
    }

    #[test]
    fn stop_resets_detected_state() {
        let mut session = PracticeSession::new();
        session.start();
        session.process_frame(sample(440.0, 1.0));
        assert!(session.snapshot().in_tune);
        session.stop();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.note, None);
        assert_eq!(snapshot.frequency, 0.0);
        assert_eq!(snapshot.clarity, 0.0);
        assert!(!snapshot.in_tune);
    }

    #[test]
    fn tuning_follows_the_target() {
        let mut session = PracticeSession::new();
        session.start();
        session.process_frame(sample(440.0, 1.0));
        assert!(session.snapshot().in_tune);
        // switching targets re-evaluates without another frame
        session.set_target_note("C4");
        let snapshot = session.snapshot();
        assert!(!snapshot.in_tune);
        assert!(snapshot.cents > 100.0);
    }

    #[test]
    fn unknown_target_keeps_previous_reading() {
        let mut session = PracticeSession::new();
        session.start();
        session.process_frame(sample(440.0, 1.0));
        let before = session.snapshot();
        session.set_target_note("X0");
        let after = session.snapshot();
        assert_eq!(after.cents, before.cents);
        assert_eq!(after.in_tune, before.in_tune);
        assert_eq!(after.target, "X0");
    }

    #[test]
    fn detected_notes_drive_the_navigator() {
        let mut session = PracticeSession::new();
        let notes = parse_notation("A a |").all_notes;
        let navigator = Navigator::new(notes, Box::new(MemoryBookmarkStore::new()));
        session.attach_navigator(navigator);
        session.start();
        // A4 matches the first note
        session.process_frame(sample(440.0, 1.0));
        assert_eq!(session.navigator().unwrap().cursor(), 1);
        // A4 does not match A5
        session.process_frame(sample(440.0, 1.0));
        assert_eq!(session.navigator().unwrap().cursor(), 1);
        // A5 matches the last note; the cursor clamps there
        session.process_frame(sample(880.0, 1.0));
        assert_eq!(session.navigator().unwrap().cursor(), 1);
    }

    #[test]
    fn subscribers_receive_snapshots() {
        let mut session = PracticeSession::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        session.subscribe(tx);
        session.start();
        session.process_frame(sample(440.0, 1.0));
        let snapshots: Vec<SessionSnapshot> = rx.try_iter().collect();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[1].in_tune);
        assert_eq!(snapshots[1].note.as_deref(), Some("A4"));
    }
}
