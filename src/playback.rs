//! Click-to-toggle playback over an external audio transport.

/// Playback state as seen by the visualizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// An audio transport that can be started and paused
pub trait Transport {
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
}

impl PlaybackState {
    /// Current state of a transport
    pub fn of<T: Transport + ?Sized>(transport: &T) -> Self {
        if transport.is_playing() {
            Self::Playing
        } else {
            Self::Paused
        }
    }

    /// Pause if playing, play otherwise; returns the requested state
    pub fn toggle<T: Transport + ?Sized>(transport: &mut T) -> Self {
        if transport.is_playing() {
            transport.pause();
            Self::Paused
        } else {
            transport.play();
            Self::Playing
        }
    }
}
