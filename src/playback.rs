//! Playback controller: at most one active session, stop-before-start.
//!
//! ```text
//!            play()                    poll(): voice finished
//!   Idle ─────────────▶ Playing ─────────────────────────────▶ Idle
//!    ▲                  │  ▲  │                                  (PlaybackEnded)
//!    │      stop()      │  │  │ play(): old session torn down,
//!    └──────────────────┘  └──┘ new one started
//! ```
//!
//! The controller is device-agnostic: it drives an [`AudioOutput`], which the
//! `playback` feature implements with rodio ([`crate::output::RodioOutput`])
//! and tests implement with a fake. State changes are published on a
//! `tokio::sync::watch` channel so UI code can observe them.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::codec::SampleBuffer;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio output device unavailable: {0}")]
    Device(String),
    #[error("cannot play an empty sample buffer")]
    EmptyBuffer,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend seam
// ─────────────────────────────────────────────────────────────────────────────

/// One in-flight rendering on the device.
pub trait ActiveVoice {
    /// Stop delivering samples immediately. Must tolerate repeated calls.
    fn halt(&mut self);

    /// True once every frame has been delivered (or after [`halt`](Self::halt)).
    fn is_finished(&self) -> bool;
}

/// An audio device that can render a [`SampleBuffer`].
pub trait AudioOutput {
    type Voice: ActiveVoice;

    /// Begin rendering `buffer` at `rate` × normal speed.
    fn start(&mut self, buffer: Arc<SampleBuffer>, rate: f32) -> Result<Self::Voice, PlaybackError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Observable state
// ─────────────────────────────────────────────────────────────────────────────

/// Monotonic id of a playback session within one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    Idle,
    Playing { session: SessionId, rate: f32 },
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }
}

/// Natural end of a session: every frame was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackEnded {
    pub session: SessionId,
}

/// What [`PlaybackController::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Stopped,
    Started(SessionId),
    /// Idle with nothing to replay: the caller should request new audio.
    NeedsGeneration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

struct Session<V> {
    id: SessionId,
    rate: f32,
    // Held so the buffer outlives the device voice reading it.
    _buffer: Arc<SampleBuffer>,
    voice: V,
}

/// Owns the single playback session of a studio.
pub struct PlaybackController<O: AudioOutput> {
    output: O,
    current: Option<Session<O::Voice>>,
    next_id: u64,
    state: watch::Sender<PlaybackState>,
}

/// Rates outside `(0, ∞)` fall back to normal speed.
fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        1.0
    }
}

impl<O: AudioOutput> PlaybackController<O> {
    pub fn new(output: O) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self { output, current: None, next_id: 0, state }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// The current session, unless its voice has already run dry.
    fn live(&self) -> Option<&Session<O::Voice>> {
        self.current.as_ref().filter(|s| !s.voice.is_finished())
    }

    /// Current state. A session whose voice has finished reads as `Idle`
    /// even before [`poll`](Self::poll) reaps it.
    pub fn state(&self) -> PlaybackState {
        match self.live() {
            Some(s) => PlaybackState::Playing { session: s.id, rate: s.rate },
            None => PlaybackState::Idle,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.live().is_some()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    fn publish(&self) {
        self.state.send_replace(self.state());
    }

    /// Start playing `buffer`, tearing down any current session first.
    pub fn play(&mut self, buffer: Arc<SampleBuffer>, rate: f32) -> Result<SessionId, PlaybackError> {
        self.poll();
        self.stop();
        if buffer.is_empty() {
            return Err(PlaybackError::EmptyBuffer);
        }

        let rate = sanitize_rate(rate);
        let voice = self.output.start(Arc::clone(&buffer), rate)?;
        self.next_id += 1;
        let id = SessionId(self.next_id);
        self.current = Some(Session { id, rate, _buffer: buffer, voice });
        info!(session = id.0, rate, "playback started");
        self.publish();
        Ok(id)
    }

    /// Halt the current session. A no-op when idle.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.current.take() {
            session.voice.halt();
            debug!(session = session.id.0, "playback stopped");
            self.publish();
        }
    }

    /// Check for natural completion of the current session.
    ///
    /// Returns the ended session exactly once; stopped or replaced sessions
    /// never report completion.
    pub fn poll(&mut self) -> Option<PlaybackEnded> {
        if !self.current.as_ref()?.voice.is_finished() {
            return None;
        }
        let session = self.current.take()?;
        info!(session = session.id.0, "playback finished");
        self.publish();
        Some(PlaybackEnded { session: session.id })
    }

    /// Play/stop button semantics.
    pub fn toggle(&mut self, buffer: Option<Arc<SampleBuffer>>, rate: f32) -> Result<Toggle, PlaybackError> {
        self.poll();
        if self.is_playing() {
            self.stop();
            return Ok(Toggle::Stopped);
        }
        match buffer {
            Some(buffer) => self.play(buffer, rate).map(Toggle::Started),
            None => Ok(Toggle::NeedsGeneration),
        }
    }
}

impl<O: AudioOutput> Drop for PlaybackController<O> {
    fn drop(&mut self) {
        if let Some(session) = self.current.as_mut() {
            session.voice.halt();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test output
// ─────────────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::fake::FakeOutput;
    use super::*;
    use crate::codec::{decode_pcm16, PcmFormat};

    fn buffer(frames: usize) -> Arc<SampleBuffer> {
        Arc::new(decode_pcm16(&vec![0x10; frames * 2], PcmFormat::default()))
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut c = PlaybackController::new(FakeOutput::default());
        c.stop();
        c.stop();
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_eq!(c.output().log.borrow().halted, 0);
    }

    #[test]
    fn test_play_then_natural_end() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        let id = c.play(buffer(10), 1.25).unwrap();
        assert_eq!(c.state(), PlaybackState::Playing { session: id, rate: 1.25 });
        assert_eq!(c.poll(), None);

        out.log.borrow_mut().finish_current = true;
        assert_eq!(c.poll(), Some(PlaybackEnded { session: id }));
        assert_eq!(c.state(), PlaybackState::Idle);
        // Completion is reported once.
        assert_eq!(c.poll(), None);
    }

    #[test]
    fn test_play_while_playing_tears_down_first() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        let first = c.play(buffer(4), 1.0).unwrap();
        let second = c.play(buffer(8), 1.5).unwrap();
        assert_ne!(first, second);
        {
            let log = out.log.borrow();
            assert_eq!(log.halted, 1);
            assert_eq!(log.started, vec![(4, 1.0), (8, 1.5)]);
        }

        out.log.borrow_mut().finish_current = true;
        // Only the live session can complete.
        assert_eq!(c.poll(), Some(PlaybackEnded { session: second }));
        assert_eq!(c.poll(), None);
    }

    #[test]
    fn test_stopped_session_never_completes() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        c.play(buffer(4), 1.0).unwrap();
        c.stop();
        out.log.borrow_mut().finish_current = true;
        assert_eq!(c.poll(), None);
        assert_eq!(out.log.borrow().halted, 1);
    }

    #[test]
    fn test_toggle() {
        let mut c = PlaybackController::new(FakeOutput::default());
        assert_eq!(c.toggle(None, 1.0).unwrap(), Toggle::NeedsGeneration);

        let started = c.toggle(Some(buffer(3)), 1.0).unwrap();
        assert!(matches!(started, Toggle::Started(_)));
        assert_eq!(c.toggle(Some(buffer(3)), 1.0).unwrap(), Toggle::Stopped);
        assert!(!c.is_playing());
    }

    #[test]
    fn test_finished_session_reads_idle_and_toggle_replays() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        let first = c.play(buffer(3), 1.0).unwrap();
        out.log.borrow_mut().finish_current = true;

        // No poll() in between: the ended voice must not count as playing.
        assert!(!c.is_playing());
        assert_eq!(c.state(), PlaybackState::Idle);

        let outcome = c.toggle(Some(buffer(3)), 1.0).unwrap();
        let Toggle::Started(second) = outcome else {
            panic!("expected a replay, got {:?}", outcome);
        };
        assert_ne!(first, second);
        assert!(c.is_playing());
        // The finished voice was reaped, not halted.
        assert_eq!(out.log.borrow().halted, 0);
        assert_eq!(out.log.borrow().started.len(), 2);
    }

    #[test]
    fn test_play_after_natural_end_without_poll() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        c.play(buffer(2), 1.0).unwrap();
        out.log.borrow_mut().finish_current = true;
        let id = c.play(buffer(2), 1.5).unwrap();
        assert_eq!(c.state(), PlaybackState::Playing { session: id, rate: 1.5 });
        assert_eq!(out.log.borrow().halted, 0);
    }

    #[test]
    fn test_watch_notifications() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        let rx = c.subscribe();
        assert_eq!(*rx.borrow(), PlaybackState::Idle);

        let id = c.play(buffer(2), 0.5).unwrap();
        assert_eq!(*rx.borrow(), PlaybackState::Playing { session: id, rate: 0.5 });

        out.log.borrow_mut().finish_current = true;
        c.poll();
        assert!(!rx.borrow().is_playing());
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        c.play(buffer(2), 0.0).unwrap();
        c.play(buffer(2), f32::NAN).unwrap();
        let log = out.log.borrow();
        assert_eq!(log.started[0].1, 1.0);
        assert_eq!(log.started[1].1, 1.0);
    }

    #[test]
    fn test_empty_buffer_and_device_errors() {
        let out = FakeOutput::default();
        let mut c = PlaybackController::new(out.clone());
        assert!(matches!(c.play(buffer(0), 1.0), Err(PlaybackError::EmptyBuffer)));

        c.play(buffer(2), 1.0).unwrap();
        out.log.borrow_mut().fail_next = true;
        assert!(matches!(c.play(buffer(2), 1.0), Err(PlaybackError::Device(_))));
        // The previous session was still torn down.
        assert!(!c.is_playing());
        assert_eq!(out.log.borrow().halted, 1);
    }

    #[test]
    fn test_drop_halts_voice() {
        let out = FakeOutput::default();
        {
            let mut c = PlaybackController::new(out.clone());
            c.play(buffer(2), 1.0).unwrap();
        }
        assert_eq!(out.log.borrow().halted, 1);
    }
}
